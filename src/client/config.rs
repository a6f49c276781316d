//! Immutable client configuration

use std::time::Duration;

use super::auth::LoginSettings;
use super::retry::RetryPolicy;
use crate::config::SecretString;
use crate::middleware::DEFAULT_API_KEY_HEADER;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LOG_BODY_LIMIT: usize = 1024;

/// Login credentials of the account under test
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub number: String,
    pub username: String,
    pub password: SecretString,
    /// Sent as a static header on every request when set
    pub api_key: Option<SecretString>,
}

impl Credentials {
    pub fn new(
        number: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        Self {
            number: number.into(),
            username: username.into(),
            password: password.into(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per attempt
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub credentials: Credentials,
    pub login: LoginSettings,
    /// Characters of a response body kept in the log
    pub log_body_limit: usize,
    pub api_key_header: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            credentials: Credentials::default(),
            login: LoginSettings::default(),
            log_body_limit: DEFAULT_LOG_BODY_LIMIT,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_login(mut self, login: LoginSettings) -> Self {
        self.login = login;
        self
    }

    pub fn with_log_body_limit(mut self, limit: usize) -> Self {
        self.log_body_limit = limit;
        self
    }

    pub fn with_api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self
    }
}
