//! Request pipeline tests against a wiremock backend

mod common;

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::capture_logs_at;
use qaharness::client::{
    build_url, ApiClient, ApiRequest, ClientConfig, Credentials, LoginFlavor, LoginSettings, RetryPolicy, Session,
};
use qaharness::errors::HarnessError;

fn fast_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(attempts)
        .with_base_delay(Duration::from_millis(10))
}

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri())
        .with_timeout(Duration::from_secs(5))
        .with_retry(fast_retry(3))
        .with_credentials(Credentials::new("001", "admin", "Lx123456"))
        .with_login(LoginSettings::default().with_logout_endpoint("/user/logout"))
}

fn login_ok(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 0,
        "message": "login succeeded",
        "data": {"token": token, "username": "admin"}
    }))
}

fn login_rejected() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 1,
        "message": "invalid username or password",
        "data": null
    }))
}

// ============================================================================
// URL building
// ============================================================================

#[test]
fn test_build_url_single_separator() {
    assert_eq!(build_url("http://h:8081/", "/user/login"), "http://h:8081/user/login");
    assert_eq!(build_url("http://h:8081", "user/login"), "http://h:8081/user/login");
    assert_eq!(build_url("http://h:8081", "https://other/x"), "https://other/x");
}

#[tokio::test]
async fn test_query_parameters_are_appended() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/list"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(config(&server)).unwrap();
    let response = client
        .send(ApiRequest::get("/user/list").query("page", "2"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert!(response.is_business_success());
}

// ============================================================================
// Login and session
// ============================================================================

#[tokio::test]
async fn test_login_token_is_sent_on_authenticated_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .and(body_partial_json(json!({"username": "admin", "number": "001"})))
        .respond_with(login_ok("tok-abc-123"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/info"))
        .and(header("authorization", "Bearer tok-abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0, "message": "ok", "data": {"username": "admin"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = ApiClient::new(config(&server)).unwrap();
    let outcome = client.login_with_config().await.unwrap();
    assert_eq!(outcome.token.as_deref(), Some("tok-abc-123"));
    assert!(client.session().is_authenticated());

    let info = client.get("/user/info").await.unwrap();
    assert_eq!(info.status, 200);
    assert_eq!(info.pointer("/data/username").unwrap(), "admin");
}

#[tokio::test]
async fn test_no_auth_request_skips_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(login_ok("tok-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut client = ApiClient::new(config(&server)).unwrap();
    client.login_with_config().await.unwrap();
    client.send(ApiRequest::get("/public").no_auth()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let public = requests.iter().find(|r| r.url.path() == "/public").unwrap();
    assert!(public.headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_logout_removes_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(login_ok("tok-xyz"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 401, "message": "unauthorized"})))
        .mount(&server)
        .await;

    let mut client = ApiClient::new(config(&server)).unwrap();
    client.login_with_config().await.unwrap();
    client.logout().await;
    assert!(!client.session().is_authenticated());

    let response = client.get("/user/info").await.unwrap();
    assert_eq!(response.business_code(), Some(401));

    let requests = server.received_requests().await.unwrap();
    let info = requests.iter().find(|r| r.url.path() == "/user/info").unwrap();
    assert!(info.headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_logout_drops_session_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(login_ok("tok-xyz"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 401, "message": "unauthorized"})))
        .mount(&server)
        .await;

    let mut session = Session::new();
    session.set_header("Authorization", "Bearer manual").unwrap();
    let mut client = ApiClient::new(config(&server)).unwrap().with_session(session);

    client.login_with_config().await.unwrap();
    client.logout().await;
    client.get("/user/info").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let info = requests.iter().find(|r| r.url.path() == "/user/info").unwrap();
    assert!(info.headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_rejected_login_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .and(body_partial_json(json!({"password": "Lx123456"})))
        .respond_with(login_ok("tok-good"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .and(body_partial_json(json!({"password": "wrong"})))
        .respond_with(login_rejected())
        .mount(&server)
        .await;

    let mut client = ApiClient::new(config(&server)).unwrap();
    assert!(client.login_with_config().await.unwrap().is_success());

    let outcome = client.login("001", "admin", "wrong").await.unwrap();
    assert!(outcome.token.is_none());
    assert_eq!(outcome.response.business_code(), Some(1));
    assert!(outcome.response.data().unwrap().is_null());
    assert!(!client.session().is_authenticated());
    assert!(client.session().access_token().is_none());
}

#[tokio::test]
async fn test_token_pair_flavor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/get_token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "acc-1", "refresh": "ref-1"})))
        .mount(&server)
        .await;

    let config = config(&server).with_login(LoginSettings::new(LoginFlavor::TokenPair));
    let mut client = ApiClient::new(config).unwrap();
    let outcome = client.login_with_config().await.unwrap();
    assert_eq!(outcome.token.as_deref(), Some("acc-1"));
    assert_eq!(client.session().refresh_token(), Some("ref-1"));
}

#[tokio::test]
async fn test_api_key_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/keyed"))
        .and(header("x-api-key", "k-123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut credentials = Credentials::new("001", "admin", "Lx123456");
    credentials.api_key = Some("k-123".into());
    let client = ApiClient::new(config(&server).with_credentials(credentials)).unwrap();
    assert_eq!(client.get("/keyed").await.unwrap().status, 200);
}

// ============================================================================
// Retry
// ============================================================================

#[tokio::test]
async fn test_retryable_status_is_attempted_exactly_max_times() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = ApiClient::new(config(&server)).unwrap();
    let response = client.get("/flaky").await.unwrap();
    assert_eq!(response.status, 503);
    assert_eq!(response.attempts, 3);
}

#[tokio::test]
async fn test_large_attempt_counts_are_not_capped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(12)
        .mount(&server)
        .await;

    let mut retry = fast_retry(12);
    retry.max_delay = Duration::from_millis(20);
    let client = ApiClient::new(config(&server).with_retry(retry)).unwrap();

    let response = client.get("/flaky").await.unwrap();
    assert_eq!(response.attempts, 12);
}

#[tokio::test]
async fn test_non_retryable_status_is_returned_at_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(config(&server)).unwrap();
    let response = client.get("/missing").await.unwrap();
    assert_eq!(response.status, 404);
    assert!(matches!(response.error_for_status(), Err(HarnessError::Status { status: 404, .. })));
}

#[tokio::test]
async fn test_post_is_not_retried_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(config(&server)).unwrap();
    let response = client.post_json("/orders", json!({"item": 1})).await.unwrap();
    assert_eq!(response.attempts, 1);
}

#[tokio::test]
async fn test_recovers_when_backend_comes_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eventually"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/eventually"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .mount(&server)
        .await;

    let client = ApiClient::new(config(&server)).unwrap();
    let response = client.get("/eventually").await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.attempts, 2);
}

#[tokio::test]
async fn test_transport_failure_after_retries() {
    // nothing listens on port 1
    let config = ClientConfig::new("http://127.0.0.1:1")
        .with_timeout(Duration::from_secs(2))
        .with_retry(fast_retry(2))
        .with_credentials(Credentials::new("001", "admin", "Lx123456"));

    let mut client = ApiClient::new(config).unwrap();
    match client.get("/user/info").await {
        Err(HarnessError::Transport { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected transport error, got {:?}", other),
    }

    let err = client.login_with_config().await.unwrap_err();
    assert!(err.is_transport());
    assert!(!client.session().is_authenticated());
}

// ============================================================================
// Logging
// ============================================================================

#[tokio::test]
async fn test_password_never_reaches_the_log() {
    let (logs, _guard) = capture_logs_at(tracing::Level::INFO);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(login_ok("tok-log"))
        .mount(&server)
        .await;

    let secret = "Sup3r-Secret-Pa55";
    let config = config(&server).with_credentials(Credentials::new("001", "admin", secret));
    let mut client = ApiClient::new(config).unwrap();
    client.login_with_config().await.unwrap();
    client
        .post_form("/user/profile", [("username", "admin"), ("password", secret)])
        .await
        .unwrap();

    let output = logs.contents();
    assert!(output.contains("Logging in"), "log was: {}", output);
    assert!(output.contains("Request body"));
    assert!(output.contains("Response body"));
    assert!(output.contains("password=******"), "masked form body missing: {}", output);
    assert!(!output.contains(secret), "password leaked into log: {}", output);
}

#[tokio::test]
async fn test_password_query_parameter_masked_in_log() {
    let (logs, _guard) = capture_logs_at(tracing::Level::INFO);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/check"))
        .and(query_param("password", "Qu3ry-Secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(config(&server)).unwrap();
    let request = ApiRequest::get("/user/check")
        .query("username", "admin")
        .query("password", "Qu3ry-Secret");
    client.send(request).await.unwrap();

    let output = logs.contents();
    assert!(output.contains("Sending request"), "log was: {}", output);
    assert!(!output.contains("Qu3ry-Secret"), "password leaked into log: {}", output);
}
