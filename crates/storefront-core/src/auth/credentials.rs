use std::fmt;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, warn};

use super::storage::{AuthStorage, PersistedAuth};
use crate::models::UserProfile;

/// Snapshot of the client's authentication state.
#[derive(Clone, Default, PartialEq)]
pub struct AuthState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl AuthState {
    /// Rebuild state from a durable record.
    /// A record that claims authentication without both tokens is treated as anonymous.
    fn from_persisted(record: PersistedAuth) -> Option<Self> {
        let access_token = record.access_token.filter(|t| !t.is_empty());
        let refresh_token = record.refresh_token.filter(|t| !t.is_empty());

        match (access_token, refresh_token) {
            (Some(access_token), Some(refresh_token)) if record.is_authenticated => Some(Self {
                access_token: Some(access_token),
                refresh_token: Some(refresh_token),
                is_authenticated: true,
                ..Self::default()
            }),
            _ => None,
        }
    }

    fn to_persisted(&self) -> PersistedAuth {
        PersistedAuth {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            is_authenticated: self.is_authenticated,
        }
    }

    fn is_cleared(&self) -> bool {
        self.access_token.is_none()
            && self.refresh_token.is_none()
            && self.user.is_none()
            && !self.is_authenticated
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("user", &self.user.as_ref().map(|u| u.username.as_str()))
            .field("is_authenticated", &self.is_authenticated)
            .field("is_loading", &self.is_loading)
            .finish()
    }
}

/// Owner of the token pair, cached profile and auth flags.
///
/// Shared through `Arc` by the API client and session operations. Every
/// mutation replaces whole fields inside a single watch-channel update, so
/// readers always see a consistent snapshot. Durable mutations are
/// serialized with their write to storage so the saved record never lags
/// behind a later mutation.
pub struct CredentialStore {
    state: watch::Sender<AuthState>,
    storage: Option<Box<dyn AuthStorage>>,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    /// Store with no durable backend
    pub fn in_memory() -> Self {
        Self::from_state(AuthState::default(), None)
    }

    /// Store hydrated from (and persisting to) the given backend
    pub fn with_storage(storage: Box<dyn AuthStorage>) -> Self {
        let initial = match storage.load() {
            Ok(Some(record)) => match AuthState::from_persisted(record) {
                Some(state) => {
                    debug!("Restored authenticated session from storage");
                    state
                }
                None => {
                    debug!("Stored auth record is incomplete, starting anonymous");
                    if let Err(e) = storage.clear() {
                        warn!(error = %e, "Failed to clear incomplete auth record");
                    }
                    AuthState::default()
                }
            },
            Ok(None) => AuthState::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load auth record, starting anonymous");
                AuthState::default()
            }
        };
        Self::from_state(initial, Some(storage))
    }

    fn from_state(initial: AuthState, storage: Option<Box<dyn AuthStorage>>) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            storage,
            write_lock: Mutex::new(()),
        }
    }

    // ===== Readers =====

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.borrow().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Watch for state changes (e.g. the session dropping to anonymous)
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    // ===== Mutators =====

    /// Store a new token pair and mark the session authenticated
    pub fn set_tokens(&self, access_token: String, refresh_token: String) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.state.send_modify(|state| {
            state.access_token = Some(access_token);
            state.refresh_token = Some(refresh_token);
            state.is_authenticated = true;
        });
        self.persist();
    }

    pub fn set_user(&self, user: UserProfile) {
        self.state.send_modify(|state| state.user = Some(user));
    }

    /// Drop tokens and profile. Calling it again is a no-op.
    pub fn clear_auth(&self) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = self.state.send_if_modified(|state| {
            if state.is_cleared() {
                return false;
            }
            state.access_token = None;
            state.refresh_token = None;
            state.user = None;
            state.is_authenticated = false;
            true
        });
        if changed {
            debug!("Authentication cleared");
            self.persist();
        }
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.is_loading != is_loading;
            state.is_loading = is_loading;
            changed
        });
    }

    /// Write the durable subset. Callers hold `write_lock`.
    fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        let record = self.state.borrow().to_persisted();
        let result = if record.is_authenticated {
            storage.save(&record)
        } else {
            storage.clear()
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist auth state");
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("state", &*self.state.borrow())
            .field("persistent", &self.storage.is_some())
            .finish()
    }
}

/// Holds the loading flag for the lifetime of an operation.
pub(crate) struct LoadingGuard<'a> {
    store: &'a CredentialStore,
}

impl<'a> LoadingGuard<'a> {
    pub(crate) fn new(store: &'a CredentialStore) -> Self {
        store.set_loading(true);
        Self { store }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}
