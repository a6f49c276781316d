//! Session state: tokens from the last login plus default headers
//!
//! A session belongs to exactly one client. It is never shared between
//! concurrently running cases; pass it explicitly if a case needs a copy.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;

use crate::config::SecretString;
use crate::errors::{HarnessError, Result};
use crate::middleware::Auth;

/// Headers that belong to a single request and are never stored as defaults
const SESSION_EXCLUDED_HEADERS: &[&str] = &[
    "content-type",
    "content-length",
    "host",
    "connection",
    "transfer-encoding",
];

/// Tokens extracted from a successful login, whatever shape the backend used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access: String,
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    default_headers: BTreeMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the tokens of a successful login
    pub fn authenticate(&mut self, grant: TokenGrant) {
        self.access_token = Some(SecretString::new(grant.access));
        self.refresh_token = grant.refresh.map(SecretString::new);
    }

    /// Forget both tokens; default headers stay
    pub fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }

    /// Forget both tokens and any `Authorization` default header
    pub fn sign_out(&mut self) {
        self.clear_tokens();
        self.default_headers
            .retain(|name, _| !name.eq_ignore_ascii_case("authorization"));
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_ref().is_some_and(|t| !t.is_empty())
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_ref().map(SecretString::expose)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(SecretString::expose)
    }

    /// Bearer auth for the current token, if any
    pub fn auth(&self) -> Option<Auth> {
        self.access_token
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|t| Auth::bearer(t.clone()))
    }

    /// Add a header sent with every request of the owning client
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        if SESSION_EXCLUDED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
            return Err(HarnessError::InvalidArgument(format!(
                "'{}' is request-specific and cannot be a session header",
                name
            )));
        }
        self.default_headers.insert(name, value.into());
        Ok(())
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.default_headers.remove(name)
    }

    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }

    /// Default headers as a `HeaderMap`, the first layer of every request
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.default_headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| HarnessError::InvalidArgument(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| HarnessError::InvalidArgument(format!("Invalid header value: {}", e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}
