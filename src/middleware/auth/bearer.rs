//! Bearer token authentication (RFC 6750)

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use super::AuthError;
use crate::config::SecretString;

/// Bearer token taken from the session after login
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: SecretString,
}

impl BearerAuth {
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Set `Authorization: Bearer <token>`, replacing any earlier value
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token.expose()))
            .map_err(|e| AuthError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);

        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}
