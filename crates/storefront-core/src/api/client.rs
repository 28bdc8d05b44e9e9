//! API client for communicating with the storefront REST backend.
//!
//! This module provides the `ApiClient` struct, which attaches bearer
//! tokens from the shared [`CredentialStore`] and transparently refreshes
//! the token pair once when a request comes back `401 Unauthorized`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::CredentialStore;
use crate::models::{LoginRequest, Product, RefreshRequest, RegisterData, TokenPair, UserProfile};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Long enough for a slow backend while still failing fast for an interactive user.
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const LOGIN_PATH: &str = "/users/login";
pub const REGISTER_PATH: &str = "/users/register";
pub const REFRESH_PATH: &str = "/users/refresh";
pub const PROFILE_PATH: &str = "/users/profile";
pub const LOGOUT_PATH: &str = "/users/logout";
pub const PRODUCTS_PATH: &str = "/products";

/// Fallback message when registration fails without a server message
const REGISTER_FAILED_MESSAGE: &str = "Failed to register user";

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: Option<String>,
}

// ============================================================================
// Requests
// ============================================================================

/// A request that can be sent again unchanged after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("body for {}: {}", self.path, e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Add an extra header. `Authorization` is managed by the client and ignored here.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        if name != header::AUTHORIZATION {
            self.headers.insert(name, value);
        }
        self
    }
}

/// Steps of one authenticated call. `RetryOnce` always ends in `Done`,
/// so a logical request is sent at most twice.
enum AuthStep {
    Attempt,
    RefreshIfUnauthorized {
        unauthorized: Response,
        stale_token: String,
    },
    RetryOnce,
    Done(Response),
}

// ============================================================================
// Refresh serialization
// ============================================================================

type SharedRefresh = Shared<BoxFuture<'static, bool>>;

#[derive(Default)]
struct RefreshSlot {
    next_id: u64,
    in_flight: Option<(u64, SharedRefresh)>,
}

enum RefreshJoin {
    /// The rejected token was already replaced by a refresh that finished
    AlreadyRefreshed,
    Flight(u64, SharedRefresh),
}

// ============================================================================
// Client
// ============================================================================

/// API client for the storefront backend.
/// Clone is cheap - reqwest::Client and the shared state are reference counted.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    credentials: Arc<CredentialStore>,
    refresh: Arc<Mutex<RefreshSlot>>,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `http://localhost:8090/api`)
    pub fn new(base_url: &str, credentials: Arc<CredentialStore>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            credentials,
            refresh: Arc::new(Mutex::new(RefreshSlot::default())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    fn url(base_url: &str, path: &str) -> String {
        format!("{}{}", base_url, path)
    }

    /// Send one request, with a bearer token when given
    async fn send(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let url = Self::url(&self.base_url, &request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .headers(request.headers.clone());
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        debug!(
            method = %request.method,
            path = %request.path,
            status = %response.status(),
            authenticated = token.is_some(),
            "API response"
        );
        Ok(response)
    }

    /// Perform one logical request with bearer auth and a single refresh-and-retry.
    ///
    /// Without a stored access token the request goes out anonymously and a
    /// 401 is returned as-is. With a token, a 401 triggers the refresh
    /// protocol; if it succeeds the request is re-sent once and that response
    /// is returned whatever its status, otherwise the original 401 comes back.
    /// Transport errors are returned without any retry.
    pub async fn request_with_auth(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let mut step = AuthStep::Attempt;
        loop {
            step = match step {
                AuthStep::Attempt => {
                    let token = self.credentials.access_token();
                    let response = self.send(request, token.as_deref()).await?;
                    match token {
                        Some(stale_token) if response.status() == StatusCode::UNAUTHORIZED => {
                            AuthStep::RefreshIfUnauthorized {
                                unauthorized: response,
                                stale_token,
                            }
                        }
                        _ => AuthStep::Done(response),
                    }
                }
                AuthStep::RefreshIfUnauthorized {
                    unauthorized,
                    stale_token,
                } => {
                    if self.refresh_serialized(Some(&stale_token)).await {
                        AuthStep::RetryOnce
                    } else {
                        debug!(path = %request.path, "Refresh failed, returning original 401");
                        AuthStep::Done(unauthorized)
                    }
                }
                AuthStep::RetryOnce => {
                    let token = self.credentials.access_token();
                    AuthStep::Done(self.send(request, token.as_deref()).await?)
                }
                AuthStep::Done(response) => return Ok(response),
            };
        }
    }

    // ===== Refresh protocol =====

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// Returns false without contacting the backend when no refresh token is
    /// stored. Any rejection, transport error or malformed body clears the
    /// credential store. Concurrent callers share one in-flight refresh.
    pub async fn refresh_token(&self) -> bool {
        self.refresh_serialized(None).await
    }

    async fn refresh_serialized(&self, stale_token: Option<&str>) -> bool {
        match self.join_refresh(stale_token) {
            RefreshJoin::AlreadyRefreshed => {
                debug!("Access token already refreshed by another request");
                true
            }
            RefreshJoin::Flight(id, flight) => {
                let refreshed = flight.await;
                let mut slot = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.in_flight.as_ref().is_some_and(|(current, _)| *current == id) {
                    slot.in_flight = None;
                }
                refreshed
            }
        }
    }

    fn join_refresh(&self, stale_token: Option<&str>) -> RefreshJoin {
        let mut slot = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((id, flight)) = &slot.in_flight {
            debug!("Joining in-flight token refresh");
            return RefreshJoin::Flight(*id, flight.clone());
        }

        if let Some(stale) = stale_token {
            if self
                .credentials
                .access_token()
                .is_some_and(|current| current != stale)
            {
                return RefreshJoin::AlreadyRefreshed;
            }
        }

        slot.next_id += 1;
        let id = slot.next_id;
        let flight = Self::run_refresh(
            self.client.clone(),
            Arc::clone(&self.base_url),
            Arc::clone(&self.credentials),
        )
        .boxed()
        .shared();
        slot.in_flight = Some((id, flight.clone()));
        RefreshJoin::Flight(id, flight)
    }

    async fn run_refresh(
        client: Client,
        base_url: Arc<str>,
        credentials: Arc<CredentialStore>,
    ) -> bool {
        let Some(refresh_token) = credentials.refresh_token() else {
            debug!("No refresh token stored, skipping refresh");
            return false;
        };

        let url = Self::url(&base_url, REFRESH_PATH);
        match Self::request_token_pair(&client, &url, &refresh_token).await {
            Ok(pair) => {
                credentials.set_tokens(pair.access_token, pair.refresh_token);
                info!("Access token refreshed");
                true
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                credentials.clear_auth();
                false
            }
        }
    }

    async fn request_token_pair(
        client: &Client,
        url: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, ApiError> {
        let response = client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        Self::parse_token_pair(REFRESH_PATH, &body)
    }

    // ===== Response parsing =====

    fn parse_body<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(|e| ApiError::malformed(endpoint, e))
    }

    fn parse_token_pair(endpoint: &str, body: &str) -> Result<TokenPair, ApiError> {
        Self::parse_body::<TokenPair>(endpoint, body)?
            .validate()
            .map_err(|reason| ApiError::malformed(endpoint, reason))
    }

    // ===== Backend endpoints =====

    /// Exchange credentials for a token pair. Does not touch the credential store.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { email, password })?;
        let response = self.send(&request, None).await?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = %status, "Login rejected");
            return Err(ApiError::InvalidCredentials);
        }

        let body = response.text().await?;
        Self::parse_token_pair(LOGIN_PATH, &body)
    }

    /// Create an account. No session is returned; the caller logs in separately.
    pub async fn register(&self, data: &RegisterData) -> Result<(), ApiError> {
        let request = ApiRequest::post(REGISTER_PATH).json(data)?;
        let response = self.send(&request, None).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorMessage>(&body)
            .ok()
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| REGISTER_FAILED_MESSAGE.to_string());
        debug!(status = %status, message = %message, "Registration rejected");
        Err(ApiError::Validation(message))
    }

    /// Fetch the current user's profile.
    /// Any non-success status (including a 401 that survived refresh) yields `None`.
    pub async fn fetch_profile(&self) -> Result<Option<UserProfile>, ApiError> {
        let response = self.request_with_auth(&ApiRequest::get(PROFILE_PATH)).await?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = %status, "Profile unavailable");
            return Ok(None);
        }

        let body = response.text().await?;
        let profile: UserProfile = Self::parse_body(PROFILE_PATH, &body)?;
        profile
            .validate()
            .map_err(|reason| ApiError::malformed(PROFILE_PATH, reason))?;
        Ok(Some(profile))
    }

    /// Tell the backend the given access token is done with.
    /// Returns true only when the backend acknowledges with `204 No Content`.
    pub async fn notify_logout(&self, access_token: &str) -> Result<bool, ApiError> {
        let response = self
            .send(&ApiRequest::post(LOGOUT_PATH), Some(access_token))
            .await?;
        Ok(response.status() == StatusCode::NO_CONTENT)
    }

    /// Fetch the product list, failing on any non-success status
    pub async fn try_fetch_products(&self) -> Result<Vec<Product>, ApiError> {
        let response = self.request_with_auth(&ApiRequest::get(PRODUCTS_PATH)).await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        Self::parse_body(PRODUCTS_PATH, &body)
    }

    /// Fetch the product list; any failure yields an empty list
    pub async fn fetch_products(&self) -> Vec<Product> {
        match self.try_fetch_products().await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "Failed to fetch products");
                Vec::new()
            }
        }
    }
}
