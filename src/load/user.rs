//! One simulated user: logs in, then calls weighted tasks with think time

use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::{Client, Method};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::scenario::LoadConfig;
use super::stats::CallRecord;
use crate::client::{build_url, ApiResponse, LoginFlavor};
use crate::errors::{HarnessError, Result};

pub const LOGIN_CALL: &str = "login";

/// Success iff 2xx and the body is an envelope with `code == 0`
pub fn classify(status: u16, body: &[u8]) -> std::result::Result<(), String> {
    if !(200..300).contains(&status) {
        return Err(format!("HTTP {}", status));
    }
    let json: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| "response is not valid JSON".to_string())?;
    match json.get("code").and_then(|c| c.as_i64()) {
        Some(0) => Ok(()),
        Some(code) => {
            let message = json
                .get("message")
                .or_else(|| json.get("msg"))
                .and_then(|m| m.as_str())
                .unwrap_or_default();
            Err(format!("business code {}: {}", code, message))
        }
        None => Err("response has no business code".to_string()),
    }
}

fn describe_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Timeout".to_string()
    } else if err.is_connect() {
        "Connection failed".to_string()
    } else {
        err.to_string()
    }
}

pub struct SimulatedUser {
    id: u32,
    config: Arc<LoadConfig>,
    client: Client,
    token: Option<String>,
    rng: StdRng,
    tx: mpsc::Sender<CallRecord>,
    stop: Arc<AtomicBool>,
}

impl SimulatedUser {
    pub fn new(
        id: u32,
        config: Arc<LoadConfig>,
        tx: mpsc::Sender<CallRecord>,
        stop: Arc<AtomicBool>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(HarnessError::Request)?;
        Ok(Self {
            id,
            config,
            client,
            token: None,
            rng: StdRng::from_os_rng(),
            tx,
            stop,
        })
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Log in, then run the configured iterations
    pub async fn run(mut self) {
        self.login().await;

        for _ in 0..self.config.iterations {
            if self.stopped() {
                debug!(user = self.id, "Stop requested");
                break;
            }
            let task = match self.config.pick_task(&mut self.rng) {
                Some(task) => task.clone(),
                None => break,
            };
            let record = self.call(&task.name, task.method.clone(), &task.path).await;
            if self.tx.send(record).await.is_err() {
                break;
            }

            let wait = self.config.pick_wait(&mut self.rng);
            self.think(wait).await;
        }
    }

    /// Sleep in short slices so a stop request is seen quickly
    async fn think(&self, wait: Duration) {
        let slice = Duration::from_millis(100);
        let start = Instant::now();
        while !self.stopped() {
            let elapsed = start.elapsed();
            if elapsed >= wait {
                break;
            }
            tokio::time::sleep(slice.min(wait - elapsed)).await;
        }
    }

    async fn login(&mut self) {
        let url = build_url(&self.config.base_url, &self.config.login_path);
        let credentials = &self.config.credentials;
        let body = json!({
            "number": credentials.number,
            "username": credentials.username,
            "password": credentials.password.expose(),
        });

        let start = Instant::now();
        let record = match self.client.post(&url).json(&body).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let headers = response.headers().clone();
                let raw = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                let latency = start.elapsed();
                let api_response = ApiResponse::new(status, url.as_str(), headers, raw);
                match LoginFlavor::Auto.extract(&api_response) {
                    Ok(grant) => {
                        self.token = Some(grant.access);
                        CallRecord::success(LOGIN_CALL, latency)
                    }
                    Err(reason) => {
                        warn!(user = self.id, %reason, "Simulated user login failed");
                        CallRecord::failure(LOGIN_CALL, latency, reason)
                    }
                }
            }
            Err(err) => CallRecord::failure(LOGIN_CALL, start.elapsed(), describe_error(&err)),
        };
        let _ = self.tx.send(record).await;
    }

    async fn call(&self, name: &str, method: Method, path: &str) -> CallRecord {
        let url = build_url(&self.config.base_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let start = Instant::now();
        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                let latency = start.elapsed();
                match classify(status, &body) {
                    Ok(()) => CallRecord::success(name, latency),
                    Err(reason) => CallRecord::failure(name, latency, reason),
                }
            }
            Err(err) => CallRecord::failure(name, start.elapsed(), describe_error(&err)),
        }
    }
}
