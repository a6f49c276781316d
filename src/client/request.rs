//! Request descriptor consumed by [`ApiClient::send`](super::ApiClient::send)

use reqwest::Method;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::redact;
use crate::errors::Result;

/// Request body variants
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs
    Form(Vec<(String, String)>),
    /// `application/json` document
    Json(JsonValue),
}

impl RequestBody {
    /// Content type and encoded bytes
    pub fn encode(&self) -> Result<Option<(&'static str, Vec<u8>)>> {
        match self {
            RequestBody::Empty => Ok(None),
            RequestBody::Form(pairs) => {
                let encoded = serde_urlencoded::to_string(pairs)
                    .map_err(|e| crate::errors::HarnessError::InvalidArgument(format!("Unencodable form: {}", e)))?;
                Ok(Some(("application/x-www-form-urlencoded", encoded.into_bytes())))
            }
            RequestBody::Json(value) => Ok(Some(("application/json", serde_json::to_vec(value)?))),
        }
    }

    /// Body rendering safe to log
    pub fn redacted(&self) -> Option<String> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Form(pairs) => {
                let masked = redact::redact_form(pairs);
                Some(serde_urlencoded::to_string(&masked).unwrap_or_default())
            }
            RequestBody::Json(value) => Some(redact::redact_json(value).to_string()),
        }
    }
}

/// One HTTP call, described before it is dispatched
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Relative endpoint or absolute URL
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
    /// Attach the session token when one is present
    pub auth_required: bool,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            headers: Vec::new(),
            auth_required: true,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PATCH, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Add a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header; it wins over session headers and the bearer token
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, value: JsonValue) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Serialize any value as the JSON body
    pub fn json_from<T: Serialize>(self, value: &T) -> Result<Self> {
        Ok(self.json(serde_json::to_value(value)?))
    }

    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Send without the session token
    pub fn no_auth(mut self) -> Self {
        self.auth_required = false;
        self
    }
}
