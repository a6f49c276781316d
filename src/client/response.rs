//! Response envelope returned by the request pipeline

use reqwest::header::HeaderMap;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::errors::{HarnessError, Result};

/// Everything a test needs to assert on after one exchange
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    pub headers: HeaderMap,
    pub raw_body: Vec<u8>,
    /// Parsed body, `None` when the body is not JSON
    pub json: Option<JsonValue>,
    pub elapsed: Duration,
    /// How many attempts the pipeline made to get this response
    pub attempts: u32,
}

impl ApiResponse {
    pub fn new(status: u16, url: impl Into<String>, headers: HeaderMap, raw_body: Vec<u8>) -> Self {
        let json = serde_json::from_slice(&raw_body).ok();
        Self {
            status,
            url: url.into(),
            headers,
            raw_body,
            json,
            elapsed: Duration::ZERO,
            attempts: 1,
        }
    }

    /// Transport-level success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossily decoded
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.raw_body).into_owned()
    }

    /// The `code` field of a `{code, message, data}` envelope
    pub fn business_code(&self) -> Option<i64> {
        self.json.as_ref()?.get("code")?.as_i64()
    }

    /// The `message` (or `msg`) field of the envelope
    pub fn business_message(&self) -> Option<&str> {
        let json = self.json.as_ref()?;
        json.get("message")
            .or_else(|| json.get("msg"))
            .and_then(JsonValue::as_str)
    }

    /// Business-level success: envelope present and `code == 0`
    pub fn is_business_success(&self) -> bool {
        self.business_code() == Some(0)
    }

    /// The `data` member of the envelope
    pub fn data(&self) -> Option<&JsonValue> {
        self.json.as_ref()?.get("data")
    }

    /// Look up a value by JSON pointer, e.g. `/data/token`
    pub fn pointer(&self, pointer: &str) -> Option<&JsonValue> {
        self.json.as_ref()?.pointer(pointer)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Strict variant for callers that treat non-2xx as an error
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HarnessError::Status {
                status: self.status,
                url: self.url,
            })
        }
    }

    /// Fail unless the envelope reports `code == 0`
    pub fn expect_business_ok(self) -> Result<Self> {
        match self.business_code() {
            Some(0) => Ok(self),
            Some(code) => Err(HarnessError::BusinessCode {
                code,
                message: self.business_message().unwrap_or_default().to_string(),
            }),
            None => Err(HarnessError::Assertion(format!(
                "response from {} carries no business code (HTTP {})",
                self.url, self.status
            ))),
        }
    }
}
