//! Integration tests for bearer auth, token refresh and session operations

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use storefront_core::api::client::{
    LOGIN_PATH, LOGOUT_PATH, PROFILE_PATH, REFRESH_PATH, REGISTER_PATH,
};
use storefront_core::auth::{CredentialStore, ProfileLoad, Session};
use storefront_core::models::RegisterData;
use storefront_core::{ApiClient, ApiError, ApiRequest};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn profile_json(username: &str) -> serde_json::Value {
    json!({
        "id": 1,
        "username": username,
        "email": "a@b.com",
        "firstName": "Ana",
        "lastName": "García",
        "birthDate": "1990-04-12",
        "address": "Calle Mayor 1"
    })
}

fn client_for(server_uri: &str, store: &Arc<CredentialStore>) -> ApiClient {
    ApiClient::new(server_uri, Arc::clone(store)).expect("client should build")
}

/// A local address with nothing listening on it
fn unreachable_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn authenticated_store(access: &str, refresh: &str) -> Arc<CredentialStore> {
    let store = Arc::new(CredentialStore::in_memory());
    store.set_tokens(access.to_string(), refresh.to_string());
    store
}

fn assert_cleared(store: &CredentialStore) {
    let state = store.snapshot();
    assert!(!state.is_authenticated);
    assert_eq!(state.access_token, None);
    assert_eq!(state.refresh_token, None);
    assert_eq!(state.user, None);
}

async fn mount_refresh(
    server: &MockServer,
    old_refresh: &str,
    new_access: &str,
    new_refresh: &str,
) {
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_json(json!({ "refreshToken": old_refresh })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": new_access,
            "refreshToken": new_refresh
        })))
        .expect(1)
        .named("refresh")
        .mount(server)
        .await;
}

// ============================================================================
// Authenticated request client
// ============================================================================

#[tokio::test]
async fn test_refresh_and_retry_hides_401() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer AT-old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .named("profile with stale token")
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer AT-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("a")))
        .expect(1)
        .named("profile with fresh token")
        .mount(&server)
        .await;
    mount_refresh(&server, "RT-old", "AT-new", "RT-new").await;

    let store = authenticated_store("AT-old", "RT-old");
    let client = client_for(&server.uri(), &store);

    let response = client
        .request_with_auth(&ApiRequest::get(PROFILE_PATH))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert!(store.is_authenticated());
    assert_eq!(store.access_token().as_deref(), Some("AT-new"));
    assert_eq!(store.refresh_token().as_deref(), Some("RT-new"));
}

#[tokio::test]
async fn test_refresh_failure_returns_original_401_and_clears_store() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let store = authenticated_store("AT1", "RT1");
    let client = client_for(&server.uri(), &store);

    let response = client
        .request_with_auth(&ApiRequest::get(PROFILE_PATH))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(response.text().await.unwrap(), "token expired");
    assert_cleared(&store);
}

#[tokio::test]
async fn test_malformed_refresh_body_clears_store() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "nope" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = authenticated_store("AT1", "RT1");
    let client = client_for(&server.uri(), &store);

    let response = client
        .request_with_auth(&ApiRequest::get(PROFILE_PATH))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_cleared(&store);
}

#[tokio::test]
async fn test_anonymous_request_sends_no_auth_and_never_refreshes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(CredentialStore::in_memory());
    let client = client_for(&server.uri(), &store);

    let response = client
        .request_with_auth(&ApiRequest::get(PROFILE_PATH))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_retried_401_is_returned_without_second_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, "RT1", "AT2", "RT2").await;

    let store = authenticated_store("AT1", "RT1");
    let client = client_for(&server.uri(), &store);

    let response = client
        .request_with_auth(&ApiRequest::get(PROFILE_PATH))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    // The refresh itself worked, so the new pair is kept
    assert_eq!(store.access_token().as_deref(), Some("AT2"));
}

#[tokio::test]
async fn test_non_401_failures_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = authenticated_store("AT1", "RT1");
    let client = client_for(&server.uri(), &store);

    let response = client
        .request_with_auth(&ApiRequest::get("/products"))
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn test_retry_resends_method_and_body() {
    let server = MockServer::start().await;
    let body = json!({ "productId": 3, "quantity": 2 });

    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .and(header("authorization", "Bearer AT1"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .and(header("authorization", "Bearer AT2"))
        .and(header("content-type", "application/json"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "RT1", "AT2", "RT2").await;

    let store = authenticated_store("AT1", "RT1");
    let client = client_for(&server.uri(), &store);

    let request = ApiRequest::post("/cart/items").json(&body).unwrap();
    let response = client.request_with_auth(&request).await.unwrap();
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer AT-old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer AT-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("a")))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "AT-new", "refreshToken": "RT-new" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = authenticated_store("AT-old", "RT-old");
    let client = client_for(&server.uri(), &store);
    let request = ApiRequest::get(PROFILE_PATH);

    let (first, second) = tokio::join!(
        client.request_with_auth(&request),
        client.request_with_auth(&request)
    );
    assert_eq!(first.unwrap().status(), 200);
    assert_eq!(second.unwrap().status(), 200);
    assert_eq!(store.access_token().as_deref(), Some("AT-new"));
}

#[tokio::test]
async fn test_transport_error_propagates() {
    let uri = unreachable_uri();

    let store = authenticated_store("AT1", "RT1");
    let client = client_for(&uri, &store);

    let result = client.request_with_auth(&ApiRequest::get(PROFILE_PATH)).await;
    assert!(matches!(result, Err(ApiError::NetworkError(_))));
    // A failed request is not a failed refresh; the session stays
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn test_refresh_transport_error_clears_store() {
    let uri = unreachable_uri();

    let store = authenticated_store("AT1", "RT1");
    let client = client_for(&uri, &store);

    assert!(!client.refresh_token().await);
    assert_cleared(&store);
}

// ============================================================================
// Session operations
// ============================================================================

#[tokio::test]
async fn test_login_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(body_json(json!({ "email": "a@b.com", "password": "pw" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "AT1", "refreshToken": "RT1" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer AT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("a")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(CredentialStore::in_memory());
    let session = Session::new(client_for(&server.uri(), &store));

    let profile = session.login("a@b.com", "pw").await.unwrap();
    assert_eq!(profile.username, "a");

    let state = store.snapshot();
    assert!(state.is_authenticated);
    assert_eq!(state.access_token.as_deref(), Some("AT1"));
    assert_eq!(state.user.map(|u| u.username).as_deref(), Some("a"));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_login_rolls_back_when_profile_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "AT1", "refreshToken": "RT1" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(CredentialStore::in_memory());
    let session = Session::new(client_for(&server.uri(), &store));

    let result = session.login("a@b.com", "pw").await;
    assert!(matches!(result, Err(ApiError::ProfileUnavailable)));
    assert_cleared(&store);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_login_rejected_leaves_store_clean() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // A previous session must not survive a failed login
    let store = authenticated_store("AT-prev", "RT-prev");
    let session = Session::new(client_for(&server.uri(), &store));

    let result = session.login("a@b.com", "wrong").await;
    assert!(matches!(result, Err(ApiError::InvalidCredentials)));
    assert_cleared(&store);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_login_malformed_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "AT1" })))
        .mount(&server)
        .await;

    let store = Arc::new(CredentialStore::in_memory());
    let session = Session::new(client_for(&server.uri(), &store));

    let result = session.login("a@b.com", "pw").await;
    assert!(matches!(result, Err(ApiError::MalformedResponse { .. })));
    assert_cleared(&store);
}

fn registration() -> RegisterData {
    RegisterData {
        username: "ana".to_string(),
        first_name: "Ana".to_string(),
        last_name: "García".to_string(),
        birth_date: "12/04/1990".to_string(),
        email: "ana@example.com".to_string(),
        password: "secret".to_string(),
        address: "Calle Mayor 1, Madrid".to_string(),
    }
}

#[tokio::test]
async fn test_register_success_sends_normalized_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REGISTER_PATH))
        .and(body_json(json!({
            "username": "ana",
            "firstName": "Ana",
            "lastName": "García",
            "birthDate": "1990-04-12",
            "email": "ana@example.com",
            "password": "secret",
            "address": "Calle Mayor 1, Madrid"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(CredentialStore::in_memory());
    let session = Session::new(client_for(&server.uri(), &store));

    session.register(registration()).await.unwrap();
    // Registration never creates a session
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn test_register_surfaces_server_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REGISTER_PATH))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({ "message": "Email already registered" })),
        )
        .mount(&server)
        .await;

    let store = Arc::new(CredentialStore::in_memory());
    let session = Session::new(client_for(&server.uri(), &store));

    match session.register(registration()).await {
        Err(ApiError::Validation(message)) => assert_eq!(message, "Email already registered"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_register_generic_message_without_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REGISTER_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let store = Arc::new(CredentialStore::in_memory());
    let session = Session::new(client_for(&server.uri(), &store));

    match session.register(registration()).await {
        Err(ApiError::Validation(message)) => assert_eq!(message, "Failed to register user"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_register_invalid_input_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REGISTER_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(CredentialStore::in_memory());
    let session = Session::new(client_for(&server.uri(), &store));

    let mut data = registration();
    data.birth_date = "someday".to_string();
    assert!(matches!(session.register(data).await, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn test_fetch_user_profile_is_none_on_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = authenticated_store("AT1", "RT1");
    let session = Session::new(client_for(&server.uri(), &store));

    assert_eq!(session.fetch_user_profile().await.unwrap(), None);
    // The caller decides what to do; the store is untouched
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn test_logout_acknowledged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .and(header("authorization", "Bearer AT1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = authenticated_store("AT1", "RT1");
    let session = Session::new(client_for(&server.uri(), &store));

    assert!(session.logout().await);
    assert_cleared(&store);
}

#[tokio::test]
async fn test_logout_clears_even_when_backend_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = authenticated_store("AT1", "RT1");
    let session = Session::new(client_for(&server.uri(), &store));

    assert!(!session.logout().await);
    assert_cleared(&store);
}

#[tokio::test]
async fn test_logout_clears_when_backend_unreachable() {
    let uri = unreachable_uri();

    let store = authenticated_store("AT1", "RT1");
    let session = Session::new(client_for(&uri, &store));

    assert!(!session.logout().await);
    assert_cleared(&store);
}

#[tokio::test]
async fn test_load_profile_outcomes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer AT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("a")))
        .expect(1)
        .mount(&server)
        .await;

    let anonymous = Arc::new(CredentialStore::in_memory());
    let session = Session::new(client_for(&server.uri(), &anonymous));
    assert_eq!(session.load_profile().await, ProfileLoad::Anonymous);

    let store = authenticated_store("AT1", "RT1");
    let session = Session::new(client_for(&server.uri(), &store));
    let loaded = session.load_profile().await;
    assert!(matches!(loaded, ProfileLoad::Loaded(ref p) if p.username == "a"));

    // Second call is served from the store without a request
    assert!(matches!(session.load_profile().await, ProfileLoad::Cached(_)));
}

#[tokio::test]
async fn test_load_profile_expired_session_rolls_back() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store = authenticated_store("AT1", "RT1");
    let mut changes = store.subscribe();
    let session = Session::new(client_for(&server.uri(), &store));

    let outcome = session.load_profile().await;
    assert_eq!(outcome, ProfileLoad::SessionExpired);
    assert!(outcome.notification().is_some());
    assert_cleared(&store);
    assert!(!changes.borrow_and_update().is_authenticated);
}
