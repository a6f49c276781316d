//! Mock server configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::routes::{ResponseConfig, Route, RouteConfig};
use crate::errors::{HarnessError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// `0` picks a free port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub log_requests: bool,

    #[serde(default)]
    pub cors: bool,

    /// Answer for requests nothing else matched
    #[serde(default)]
    pub default_response: Option<ResponseConfig>,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Random delay range in milliseconds
    #[serde(default)]
    pub latency: Option<(u64, u64)>,

    /// Serve the built-in `/user/*` endpoints
    #[serde(default = "default_true")]
    pub user_service: bool,

    /// Users for the built-in service; falls back to the admin account
    #[serde(default)]
    pub users_file: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_true() -> bool {
    true
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_requests: true,
            cors: false,
            default_response: None,
            routes: Vec::new(),
            latency: None,
            user_service: true,
            users_file: None,
        }
    }
}

impl MockServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_users_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.users_file = Some(path.into());
        self
    }

    pub fn without_user_service(mut self) -> Self {
        self.user_service = false;
        self
    }

    pub fn add_route(mut self, route: RouteConfig) -> Self {
        self.routes.push(route);
        self
    }

    /// Load from YAML, TOML or JSON, picked by extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()).unwrap_or("json") {
            "yaml" | "yml" => Self::from_yaml(&content),
            "toml" => toml::from_str(&content)
                .map_err(|e| HarnessError::Config(format!("Failed to parse TOML mock config: {}", e))),
            _ => serde_json::from_str(&content)
                .map_err(|e| HarnessError::Config(format!("Failed to parse JSON mock config: {}", e))),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| HarnessError::Config(format!("Failed to parse YAML mock config: {}", e)))
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        for route in &self.routes {
            Route::new(route.clone())
                .map_err(|e| HarnessError::Config(format!("Invalid route '{}': {}", route.path, e)))?;
        }
        if let Some((min, max)) = self.latency {
            if min > max {
                return Err(HarnessError::Config(format!(
                    "Latency range {}..{} is inverted",
                    min, max
                )));
            }
        }
        Ok(())
    }
}
