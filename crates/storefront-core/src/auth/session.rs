use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{CredentialStore, LoadingGuard};
use crate::api::{ApiClient, ApiError, Notification};
use crate::models::{RegisterData, UserProfile};

/// Outcome of loading the profile for an already-established session
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileLoad {
    /// No session to load a profile for
    Anonymous,
    /// Profile was already cached in the credential store
    Cached(UserProfile),
    /// Profile fetched from the backend and cached
    Loaded(UserProfile),
    /// The profile could not be fetched; the session was cleared
    SessionExpired,
}

impl ProfileLoad {
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            ProfileLoad::Cached(profile) | ProfileLoad::Loaded(profile) => Some(profile),
            ProfileLoad::Anonymous | ProfileLoad::SessionExpired => None,
        }
    }

    /// What to tell the user; only an expired session needs a message
    pub fn notification(&self) -> Option<Notification> {
        match self {
            ProfileLoad::SessionExpired => Some(Notification::new(
                "Session expired",
                "Your session could not be restored. Please log in again.",
            )),
            _ => None,
        }
    }
}

/// Session operations built on the API client and the credential store.
#[derive(Clone)]
pub struct Session {
    api: ApiClient,
    credentials: Arc<CredentialStore>,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        let credentials = Arc::clone(api.credentials());
        Self { api, credentials }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Log in and load the profile.
    ///
    /// The profile fetch doubles as a check of the new tokens: if it fails
    /// the whole login fails. Whatever goes wrong, no tokens are left behind.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let _loading = LoadingGuard::new(&self.credentials);

        let result = self.login_and_fetch_profile(email, password).await;
        match result {
            Ok(ref profile) => info!(username = %profile.username, "Logged in"),
            Err(ref e) => {
                warn!(error = %e, "Login failed, clearing credentials");
                self.credentials.clear_auth();
            }
        }
        result
    }

    async fn login_and_fetch_profile(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ApiError> {
        let pair = self.api.login(email, password).await?;
        self.credentials.set_tokens(pair.access_token, pair.refresh_token);

        let profile = self
            .api
            .fetch_profile()
            .await?
            .ok_or(ApiError::ProfileUnavailable)?;
        self.credentials.set_user(profile.clone());
        Ok(profile)
    }

    /// Validate and submit a registration. Success does not log the user in.
    pub async fn register(&self, mut data: RegisterData) -> Result<(), ApiError> {
        data.validate().map_err(ApiError::Validation)?;

        let _loading = LoadingGuard::new(&self.credentials);
        self.api.register(&data).await?;
        info!(username = %data.username, "Registered new account");
        Ok(())
    }

    /// Fetch the profile without touching the credential store.
    /// `None` means the backend would not hand it out.
    pub async fn fetch_user_profile(&self) -> Result<Option<UserProfile>, ApiError> {
        self.api.fetch_profile().await
    }

    /// Make sure an authenticated session has its profile.
    ///
    /// Sessions restored from storage start without a profile. If it cannot
    /// be fetched the session is rolled back to anonymous.
    pub async fn load_profile(&self) -> ProfileLoad {
        if !self.credentials.is_authenticated() {
            return ProfileLoad::Anonymous;
        }
        if let Some(profile) = self.credentials.user() {
            return ProfileLoad::Cached(profile);
        }

        let _loading = LoadingGuard::new(&self.credentials);
        match self.fetch_user_profile().await {
            Ok(Some(profile)) => {
                debug!(username = %profile.username, "Profile loaded");
                self.credentials.set_user(profile.clone());
                ProfileLoad::Loaded(profile)
            }
            Ok(None) => {
                warn!("Profile unavailable, clearing session");
                self.credentials.clear_auth();
                ProfileLoad::SessionExpired
            }
            Err(e) => {
                warn!(error = %e, "Failed to load profile, clearing session");
                self.credentials.clear_auth();
                ProfileLoad::SessionExpired
            }
        }
    }

    /// Log out locally, notifying the backend on a best-effort basis.
    /// Returns whether the backend acknowledged the logout.
    pub async fn logout(&self) -> bool {
        let _loading = LoadingGuard::new(&self.credentials);

        let acknowledged = match self.credentials.access_token() {
            Some(token) => match self.api.notify_logout(&token).await {
                Ok(acknowledged) => acknowledged,
                Err(e) => {
                    warn!(error = %e, "Logout notification failed");
                    false
                }
            },
            None => false,
        };

        self.credentials.clear_auth();
        info!(acknowledged, "Logged out");
        acknowledged
    }
}
