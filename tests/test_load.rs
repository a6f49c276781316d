//! Load runs against the in-process mock backend

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use qaharness::client::Credentials;
use qaharness::load::{format_results, run_load, LoadConfig, LoadTask, LOGIN_CALL};
use qaharness::mock::{MockHandle, MockServer, MockServerConfig, UserService};
use reqwest::Method;

async fn backend() -> MockHandle {
    MockServer::new(MockServerConfig::new().with_port(0))
        .unwrap()
        .with_user_service(UserService::default())
        .start()
        .await
        .unwrap()
}

fn config(handle: &MockHandle) -> LoadConfig {
    LoadConfig::new(handle.uri())
        .with_users(3)
        .with_iterations(4)
        .with_wait(Duration::ZERO, Duration::from_millis(10))
}

fn running() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[tokio::test]
async fn test_run_against_user_service() {
    let handle = backend().await;

    let report = run_load(config(&handle), running()).await.unwrap();

    let login = report.endpoint(LOGIN_CALL).expect("login stats");
    assert_eq!(login.successes, 3);
    assert_eq!(login.failures, 0);

    let info = report.endpoint("user info").map(|e| e.total()).unwrap_or(0);
    let list = report.endpoint("user list").map(|e| e.total()).unwrap_or(0);
    assert_eq!(info + list, 12);
    assert_eq!(report.total_requests(), 15);
    assert_eq!(report.total_failures(), 0);
    assert_eq!(report.users, 3);

    let table = format_results(&report);
    assert!(table.contains(LOGIN_CALL));
    assert!(table.contains("Endpoint"));
    assert!(!table.contains("Failures\n"));
}

#[tokio::test]
async fn test_rejected_login_makes_calls_fail() {
    let handle = backend().await;
    let mut config = config(&handle).with_users(2).with_iterations(2);
    config.credentials = Credentials::new("001", "admin", "wrong-password");

    let report = run_load(config, running()).await.unwrap();

    let login = report.endpoint(LOGIN_CALL).unwrap();
    assert_eq!(login.failures, 2);
    assert_eq!(report.total_failures(), 6);

    let reasons: Vec<&String> = report
        .endpoints
        .iter()
        .filter(|e| e.name != LOGIN_CALL)
        .flat_map(|e| e.failure_reasons.keys())
        .collect();
    assert!(!reasons.is_empty());
    assert!(reasons.iter().all(|r| r.as_str() == "business code 401: unauthorized"));

    let table = format_results(&report);
    assert!(table.contains("Failures"));
    assert!(table.contains("business code 401: unauthorized"));
}

#[tokio::test]
async fn test_custom_task_weights() {
    let handle = backend().await;
    let config = config(&handle).with_tasks(vec![
        LoadTask::new("profile", Method::GET, "/user/info", 1),
        LoadTask::new("never", Method::GET, "/user/list", 0),
    ]);

    let report = run_load(config, running()).await.unwrap();

    assert_eq!(report.endpoint("profile").unwrap().successes, 12);
    assert!(report.endpoint("never").is_none());
}

#[tokio::test]
async fn test_missing_route_counts_as_http_failure() {
    let handle = backend().await;
    let config = config(&handle)
        .with_users(1)
        .with_tasks(vec![LoadTask::new("missing", Method::GET, "/nope", 1)]);

    let report = run_load(config, running()).await.unwrap();

    let missing = report.endpoint("missing").unwrap();
    assert_eq!(missing.failures, 4);
    assert_eq!(missing.failure_reasons.get("HTTP 404"), Some(&4));
    assert_eq!(missing.success_rate(), 0.0);
}

#[tokio::test]
async fn test_stop_flag_skips_iterations() {
    let handle = backend().await;

    let report = run_load(config(&handle), Arc::new(AtomicBool::new(true))).await.unwrap();

    assert_eq!(report.endpoint(LOGIN_CALL).unwrap().total(), 3);
    assert_eq!(report.total_requests(), 3);
}

#[tokio::test]
async fn test_unreachable_backend() {
    let config = LoadConfig::new("http://127.0.0.1:1")
        .with_users(1)
        .with_iterations(1)
        .with_wait(Duration::ZERO, Duration::ZERO);

    let report = run_load(config, running()).await.unwrap();

    assert_eq!(report.total_failures(), 2);
    let login = report.endpoint(LOGIN_CALL).unwrap();
    assert!(login.failure_reasons.contains_key("Connection failed"));
}

#[tokio::test]
async fn test_zero_users_rejected() {
    let result = run_load(LoadConfig::new("http://127.0.0.1:1").with_users(0), running()).await;
    assert!(result.is_err());
}
