//! Authentication applied to outgoing requests
//!
//! A closed set of schemes, so an enum rather than trait objects.

mod apikey;
mod bearer;

pub use apikey::{ApiKeyAuth, DEFAULT_API_KEY_HEADER};
pub use bearer::BearerAuth;

use reqwest::header::HeaderMap;
use thiserror::Error;

use crate::errors::HarnessError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("missing credentials")]
    MissingCredentials,
}

impl From<AuthError> for HarnessError {
    fn from(err: AuthError) -> Self {
        HarnessError::Auth(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub enum Auth {
    /// Token obtained by login
    Bearer(BearerAuth),
    /// Static key from the credentials section
    ApiKey(ApiKeyAuth),
}

impl Auth {
    pub fn bearer(token: impl Into<crate::config::SecretString>) -> Self {
        Auth::Bearer(BearerAuth::new(token))
    }

    pub fn api_key(header_name: impl Into<String>, key: impl Into<crate::config::SecretString>) -> Self {
        Auth::ApiKey(ApiKeyAuth::new(header_name, key))
    }

    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        match self {
            Auth::Bearer(auth) => auth.apply(headers),
            Auth::ApiKey(auth) => auth.apply(headers),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::ApiKey(_) => "api-key",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_bearer_auth() {
        let auth = Auth::bearer("mock_token_123456");
        let mut headers = HeaderMap::new();
        auth.apply(&mut headers).unwrap();

        let value = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert_eq!(value, "Bearer mock_token_123456");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn test_empty_bearer_rejected() {
        let mut headers = HeaderMap::new();
        let err = Auth::bearer("").apply(&mut headers).unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_api_key_auth() {
        let auth = Auth::api_key(DEFAULT_API_KEY_HEADER, "secret123");
        let mut headers = HeaderMap::new();
        auth.apply(&mut headers).unwrap();

        assert_eq!(headers.get("X-API-Key").unwrap().to_str().unwrap(), "secret123");
        assert_eq!(auth.type_name(), "api-key");
    }
}
