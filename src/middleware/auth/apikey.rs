//! API key authentication via a custom header

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::AuthError;
use crate::config::SecretString;

/// Default header carrying the key
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Static API key sent on every request of a client
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    header_name: String,
    key: SecretString,
}

impl ApiKeyAuth {
    pub fn new(header_name: impl Into<String>, key: impl Into<SecretString>) -> Self {
        Self {
            header_name: header_name.into(),
            key: key.into(),
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        let name = HeaderName::try_from(self.header_name.as_str())
            .map_err(|e| AuthError::InvalidHeader(format!("invalid header name: {}", e)))?;

        let mut value = HeaderValue::from_str(self.key.expose())
            .map_err(|e| AuthError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);

        headers.insert(name, value);
        Ok(())
    }
}
