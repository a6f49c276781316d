//! Login response shapes and where to send credentials
//!
//! Backends disagree on the login contract. Each flavor knows its default
//! endpoint and how to pull a [`TokenGrant`] out of the response.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use super::response::ApiResponse;
use super::session::TokenGrant;

pub const ENVELOPE_LOGIN_ENDPOINT: &str = "/user/login";
pub const TOKEN_PAIR_LOGIN_ENDPOINT: &str = "/api/user/get_token/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginFlavor {
    /// `{code, message, data: {token}}`, success is `code == 0`
    #[default]
    Envelope,
    /// `{access, refresh}` on a 2xx status
    TokenPair,
    /// Whichever of the two shapes the response has
    Auto,
}

impl LoginFlavor {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LoginFlavor::Envelope | LoginFlavor::Auto => ENVELOPE_LOGIN_ENDPOINT,
            LoginFlavor::TokenPair => TOKEN_PAIR_LOGIN_ENDPOINT,
        }
    }

    /// Normalise a login response; `Err` carries the reason for the log
    pub fn extract(&self, response: &ApiResponse) -> Result<TokenGrant, String> {
        match self {
            LoginFlavor::Envelope => extract_envelope(response),
            LoginFlavor::TokenPair => extract_token_pair(response),
            LoginFlavor::Auto => {
                if response.business_code().is_some() {
                    extract_envelope(response)
                } else {
                    extract_token_pair(response)
                }
            }
        }
    }
}

impl fmt::Display for LoginFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoginFlavor::Envelope => "envelope",
            LoginFlavor::TokenPair => "token_pair",
            LoginFlavor::Auto => "auto",
        };
        f.write_str(name)
    }
}

impl FromStr for LoginFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "envelope" => Ok(LoginFlavor::Envelope),
            "token_pair" | "tokenpair" => Ok(LoginFlavor::TokenPair),
            "auto" => Ok(LoginFlavor::Auto),
            other => Err(format!(
                "unknown login flavor '{}' (expected envelope, token_pair or auto)",
                other
            )),
        }
    }
}

fn non_empty_str(value: Option<&serde_json::Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn extract_envelope(response: &ApiResponse) -> Result<TokenGrant, String> {
    match response.business_code() {
        Some(0) => {
            let access = non_empty_str(response.pointer("/data/token"))
                .ok_or_else(|| "login succeeded but data.token is missing".to_string())?;
            let refresh = non_empty_str(response.pointer("/data/refresh_token"));
            Ok(TokenGrant { access, refresh })
        }
        Some(code) => Err(format!(
            "business code {}: {}",
            code,
            response.business_message().unwrap_or("no message")
        )),
        None => Err(format!("HTTP {} without a business envelope", response.status)),
    }
}

fn extract_token_pair(response: &ApiResponse) -> Result<TokenGrant, String> {
    if !response.is_success() {
        return Err(format!("HTTP {}", response.status));
    }
    let access = non_empty_str(response.pointer("/access"))
        .or_else(|| non_empty_str(response.pointer("/token")))
        .ok_or_else(|| "response carries no access token".to_string())?;
    let refresh = non_empty_str(response.pointer("/refresh"));
    Ok(TokenGrant { access, refresh })
}

/// Where login and logout requests go, and how to read the login response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginSettings {
    pub flavor: LoginFlavor,
    /// Overrides the flavor's default endpoint
    pub endpoint: Option<String>,
    /// No logout request is sent when unset
    pub logout_endpoint: Option<String>,
}

impl LoginSettings {
    pub fn new(flavor: LoginFlavor) -> Self {
        Self {
            flavor,
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_logout_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.logout_endpoint = Some(endpoint.into());
        self
    }

    pub fn login_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.flavor.default_endpoint())
    }
}
