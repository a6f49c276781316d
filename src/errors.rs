//! Error types for qaharness

use std::time::Duration;
use thiserror::Error;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Transport error after {attempts} attempt(s): {message}")]
    Transport {
        attempts: u32,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Timed out after {timeout:?} waiting for '{selector}' to be {state}")]
    ElementTimeout {
        selector: String,
        state: String,
        timeout: Duration,
    },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Browser driver error: {0}")]
    Driver(String),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status {
        status: u16,
        url: String,
    },

    #[error("Business error code {code}: {message}")]
    BusinessCode {
        code: i64,
        message: String,
    },

    #[error("Report error: {0}")]
    Report(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Mock server error: {0}")]
    MockServer(String),
}

impl HarnessError {
    /// Whether the error came from the network layer rather than from the test itself
    pub fn is_transport(&self) -> bool {
        matches!(self, HarnessError::Transport { .. } | HarnessError::Request(_))
    }

    /// Whether a check in the test failed, as opposed to the test breaking
    pub fn is_test_failure(&self) -> bool {
        matches!(
            self,
            HarnessError::Assertion(_)
                | HarnessError::ElementTimeout { .. }
                | HarnessError::BusinessCode { .. }
                | HarnessError::Status { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
