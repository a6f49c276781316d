//! Subcommand implementations

use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::args::{LoadArgs, LoginArgs, MockArgs, ProbeArgs};
use crate::client::{probe_login_endpoints, ApiClient, DEFAULT_LOGIN_CANDIDATES};
use crate::config::Settings;
use crate::errors::{HarnessError, Result};
use crate::load::{format_results, run_load, LoadConfig, LoadTask};
use crate::mock::{MockServer, MockServerConfig, RouteConfig};
use crate::status::ExitStatus;

fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

/// `10-100` or `50`, in milliseconds
pub fn parse_latency(latency: &str) -> Result<(u64, u64)> {
    let parse = |s: &str| {
        s.trim()
            .parse::<u64>()
            .map_err(|_| HarnessError::InvalidArgument(format!("Invalid latency: {}", latency)))
    };
    match latency.split_once('-') {
        Some((min, max)) => Ok((parse(min)?, parse(max)?)),
        None => {
            let ms = parse(latency)?;
            Ok((ms, ms))
        }
    }
}

pub fn mock_config(args: &MockArgs) -> Result<MockServerConfig> {
    let mut config = match &args.mock_config {
        Some(path) => MockServerConfig::load(path)?,
        None => MockServerConfig::default(),
    };

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if args.cors {
        config.cors = true;
    }
    if let Some(latency) = &args.latency {
        config.latency = Some(parse_latency(latency)?);
    }
    if let Some(users) = &args.users_file {
        config.users_file = Some(users.clone());
    }
    if args.no_user_service {
        config.user_service = false;
    }
    for spec in &args.routes {
        config
            .routes
            .push(RouteConfig::from_spec(spec).map_err(HarnessError::InvalidArgument)?);
    }

    Ok(config)
}

pub async fn run_mock(args: &MockArgs, stop: Arc<AtomicBool>) -> Result<ExitStatus> {
    let config = mock_config(args)?;
    let handle = MockServer::new(config)?.start().await?;
    println!("Mock server listening on {}", handle.uri());

    while !stop.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    info!(requests = handle.requests().await.len(), "Mock server stopping");
    Ok(ExitStatus::Interrupted)
}

pub fn load_config(settings: &Settings, args: &LoadArgs) -> Result<LoadConfig> {
    let mut config = LoadConfig::from_client_config(&settings.client)
        .with_users(args.users)
        .with_iterations(args.iterations)
        .with_wait(args.wait_min, args.wait_max)
        .with_spawn_interval(args.spawn_interval);

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if !args.tasks.is_empty() {
        let tasks = args
            .tasks
            .iter()
            .map(|spec| LoadTask::parse(spec))
            .collect::<Result<Vec<_>>>()?;
        config = config.with_tasks(tasks);
    }
    config.validate()?;
    Ok(config)
}

pub async fn run_load_command(
    settings: &Settings,
    args: &LoadArgs,
    stop: Arc<AtomicBool>,
) -> Result<ExitStatus> {
    let config = load_config(settings, args)?;
    let report = run_load(config, stop.clone()).await?;
    println!("{}", format_results(&report));

    if stop.load(Ordering::SeqCst) {
        return Ok(ExitStatus::Interrupted);
    }
    Ok(ExitStatus::Success)
}

pub async fn run_probe(settings: &Settings, args: &ProbeArgs) -> Result<ExitStatus> {
    let candidates: Vec<String> = if args.candidates.is_empty() {
        DEFAULT_LOGIN_CANDIDATES.iter().map(|c| c.to_string()).collect()
    } else {
        args.candidates.clone()
    };

    let report = probe_login_endpoints(&settings.client, &candidates).await?;

    let mut output = table(&["Endpoint", "Status", "Token", "Error"]);
    for attempt in &report.attempts {
        output.add_row(vec![
            Cell::new(&attempt.endpoint),
            Cell::new(attempt.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(if attempt.token.is_some() { "yes" } else { "no" }),
            Cell::new(attempt.error.as_deref().unwrap_or("")),
        ]);
    }
    println!("{}", output);

    match report.found() {
        Some(found) => {
            println!("Login endpoint: {}", found.endpoint);
            Ok(ExitStatus::Success)
        }
        None => {
            println!("No candidate returned a token");
            Ok(ExitStatus::Error)
        }
    }
}

pub async fn run_login(settings: &Settings, args: &LoginArgs) -> Result<ExitStatus> {
    let mut client = ApiClient::new(settings.client.clone())?;
    let outcome = client.login_with_config().await?;

    if !outcome.is_success() {
        println!(
            "Login failed: HTTP {}, {}",
            outcome.response.status,
            outcome.response.business_message().unwrap_or("no token in response")
        );
        return Ok(ExitStatus::Error);
    }
    println!("Login succeeded as {}", settings.client.credentials.username);

    let mut status = ExitStatus::Success;
    if let Some(endpoint) = &args.fetch {
        let response = client.get(endpoint).await?;
        println!("GET {} -> HTTP {}", endpoint, response.status);
        println!("{}", response.text());
        status = ExitStatus::from_success(response.is_success() && response.business_code().unwrap_or(0) == 0);
    }

    if args.logout {
        client.logout().await;
        println!("Logged out");
    }
    Ok(status)
}

pub fn run_env(settings: &Settings) -> Result<ExitStatus> {
    let mut output = table(&["Key", "Value"]);
    for (key, value) in settings.properties() {
        output.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    println!("{}", output);
    Ok(ExitStatus::Success)
}
