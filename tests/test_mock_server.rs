//! Mock backend tests: the built-in user service and static routes

use serde_json::json;
use std::time::Duration;

mod common;

use qaharness::client::{
    probe_login_endpoints, ApiClient, ClientConfig, Credentials, LoginFlavor, LoginSettings, RetryPolicy,
};
use qaharness::data::UserRecord;
use qaharness::mock::{
    HttpMethod, MockHandle, MockServer, MockServerConfig, ResponseConfig, RouteConfig, UserService, MOCK_TOKEN,
};

async fn start(config: MockServerConfig) -> MockHandle {
    MockServer::new(config.with_port(0))
        .unwrap()
        .with_user_service(UserService::default())
        .start()
        .await
        .unwrap()
}

fn client_for(handle: &MockHandle) -> ApiClient {
    let config = ClientConfig::new(handle.uri())
        .with_timeout(Duration::from_secs(5))
        .with_retry(RetryPolicy::none())
        .with_credentials(Credentials::new("001", "admin", "Lx123456"))
        .with_login(LoginSettings::default().with_logout_endpoint("/user/logout"));
    ApiClient::new(config).unwrap()
}

// ============================================================================
// User service
// ============================================================================

#[tokio::test]
async fn test_login_then_fetch_profile() {
    let handle = start(MockServerConfig::new()).await;
    let mut client = client_for(&handle);

    let outcome = client.login("001", "admin", "Lx123456").await.unwrap();
    assert_eq!(outcome.response.business_code(), Some(0));
    assert_eq!(outcome.token.as_deref(), Some(MOCK_TOKEN));
    assert_eq!(client.session().access_token(), Some(MOCK_TOKEN));

    let info = client.get("/user/info").await.unwrap();
    assert_eq!(info.status, 200);
    assert_eq!(info.business_code(), Some(0));
    assert_eq!(info.pointer("/data/username").unwrap(), "admin");
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let handle = start(MockServerConfig::new()).await;
    let mut client = client_for(&handle);

    let outcome = client.login("001", "admin", "wrong_password").await.unwrap();
    assert_eq!(outcome.response.business_code(), Some(1));
    assert!(outcome.response.data().unwrap().is_null());
    assert!(outcome.token.is_none());
    assert!(client.session().access_token().is_none());
}

#[tokio::test]
async fn test_empty_credentials_are_rejected() {
    let handle = start(MockServerConfig::new()).await;
    let mut client = client_for(&handle);

    assert!(client.login("001", "", "Lx123456").await.unwrap().token.is_none());
    assert!(client.login("001", "admin", "").await.unwrap().token.is_none());
}

#[tokio::test]
async fn test_profile_requires_token() {
    let handle = start(MockServerConfig::new()).await;
    let client = client_for(&handle);

    let info = client.get("/user/info").await.unwrap();
    assert_eq!(info.status, 200);
    assert_eq!(info.business_code(), Some(401));
}

#[tokio::test]
async fn test_user_list_and_logout() {
    let users = vec![
        UserRecord::builtin_admin(),
        UserRecord {
            number: "002".to_string(),
            username: "tester".to_string(),
            password: "Test123456".to_string(),
            name: None,
            role: Some("tester".to_string()),
        },
    ];
    let handle = MockServer::new(MockServerConfig::new().with_port(0))
        .unwrap()
        .with_user_service(UserService::new(users))
        .start()
        .await
        .unwrap();
    let mut client = client_for(&handle);

    assert!(client.login("002", "tester", "Test123456").await.unwrap().is_success());
    let list = client.get("/user/list").await.unwrap();
    assert_eq!(list.pointer("/data/total").unwrap(), 2);

    client.logout().await;
    let requests = handle.requests().await;
    assert!(requests.iter().any(|r| r.request.path == "/user/logout"));

    let after = client.get("/user/list").await.unwrap();
    assert_eq!(after.business_code(), Some(401));
}

#[tokio::test]
async fn test_token_pair_endpoint() {
    let handle = start(MockServerConfig::new()).await;
    let config = ClientConfig::new(handle.uri())
        .with_retry(RetryPolicy::none())
        .with_credentials(Credentials::new("", "admin", "Lx123456"))
        .with_login(LoginSettings::new(LoginFlavor::TokenPair));
    let mut client = ApiClient::new(config).unwrap();

    let outcome = client.login_with_config().await.unwrap();
    assert_eq!(outcome.response.status, 200);
    assert_eq!(outcome.token.as_deref(), Some(MOCK_TOKEN));
    assert!(client.session().refresh_token().is_some());
}

// ============================================================================
// Static routes
// ============================================================================

#[tokio::test]
async fn test_static_route_with_parameter_template() {
    let mut response = ResponseConfig::json_body(json!({"id": "{{id}}", "via": "{{method}}"}));
    response.template = true;
    let config = MockServerConfig::new().add_route(RouteConfig::new(HttpMethod::Get, "/api/items/:id", response));
    let handle = start(config).await;

    let client = client_for(&handle);
    let item = client.get("/api/items/42").await.unwrap();
    assert_eq!(item.status, 200);
    assert_eq!(item.pointer("/id").unwrap(), "42");
    assert_eq!(item.pointer("/via").unwrap(), "GET");
}

#[tokio::test]
async fn test_unmatched_request_gets_404_envelope() {
    let handle = start(MockServerConfig::new()).await;
    let client = client_for(&handle);

    let response = client.get("/nothing/here").await.unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(response.business_code(), Some(404));
}

#[tokio::test]
async fn test_route_from_spec_and_cors() {
    let mut config = MockServerConfig::new().add_route(RouteConfig::from_spec("GET:/health:ok").unwrap());
    config.cors = true;
    let handle = start(config).await;

    let client = client_for(&handle);
    let response = client.get("/health").await.unwrap();
    assert_eq!(response.text(), "ok");
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn test_request_log_and_clear() {
    let handle = start(MockServerConfig::new()).await;
    let client = client_for(&handle);

    client.get("/user/info").await.unwrap();
    client.get("/user/list").await.unwrap();
    let requests = handle.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].request.method, "GET");
    assert_eq!(requests[0].status, 200);

    handle.clear_requests().await;
    assert!(handle.requests().await.is_empty());
}

#[tokio::test]
async fn test_yaml_config_routes() {
    let yaml = r#"
port: 0
user_service: false
routes:
  - method: POST
    path: /api/orders
    response:
      status: 201
      json:
        code: 0
        data:
          id: 7
"#;
    let config = MockServerConfig::from_yaml(yaml).unwrap();
    let handle = MockServer::new(config).unwrap().start().await.unwrap();
    let client = client_for(&handle);

    let created = client.post_json("/api/orders", json!({"sku": "A1"})).await.unwrap();
    assert_eq!(created.status, 201);
    assert_eq!(created.pointer("/data/id").unwrap(), 7);

    // user service disabled, so login paths fall through to the default
    let login = client.get("/user/info").await.unwrap();
    assert_eq!(login.status, 404);
}

// ============================================================================
// Login endpoint probing
// ============================================================================

#[tokio::test]
async fn test_probe_finds_first_working_login_path() {
    let handle = start(MockServerConfig::new()).await;
    let config = ClientConfig::new(handle.uri())
        .with_timeout(Duration::from_secs(5))
        .with_retry(RetryPolicy::none())
        .with_credentials(Credentials::new("001", "admin", "Lx123456"));
    let candidates: Vec<String> = ["/api/login", "/user/login", "/api/user/get_token/"]
        .iter()
        .map(|c| c.to_string())
        .collect();

    let report = probe_login_endpoints(&config, &candidates).await.unwrap();

    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.attempts[0].status, Some(404));
    assert!(report.attempts[0].token.is_none());
    let found = report.found().unwrap();
    assert_eq!(found.endpoint, "/user/login");
    assert_eq!(found.token.as_deref(), Some(MOCK_TOKEN));
}

#[tokio::test]
async fn test_probe_records_transport_failures() {
    let config = ClientConfig::new("http://127.0.0.1:1")
        .with_timeout(Duration::from_secs(2))
        .with_retry(RetryPolicy::none())
        .with_credentials(Credentials::new("001", "admin", "Lx123456"));

    let report = probe_login_endpoints(&config, &["/user/login".to_string()]).await.unwrap();

    assert!(report.found().is_none());
    assert_eq!(report.attempts[0].status, None);
    assert!(report.attempts[0].error.is_some());
}
