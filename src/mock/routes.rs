//! Static mock routes and request records

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;

/// HTTP method for route matching
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    #[default]
    #[serde(rename = "*")]
    Any,
}

impl HttpMethod {
    pub fn matches(&self, method: &str) -> bool {
        match self {
            HttpMethod::Any => true,
            other => other.as_str().eq_ignore_ascii_case(method),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Any => "*",
        }
    }

    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "PATCH" => Some(HttpMethod::Patch),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            "*" => Some(HttpMethod::Any),
            _ => None,
        }
    }
}

/// What a route answers with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
    #[serde(default = "default_status")]
    pub status: u16,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Literal body
    #[serde(default)]
    pub body: Option<String>,

    /// Body read from a file at response time
    #[serde(default)]
    pub body_file: Option<String>,

    /// JSON body; wins over `body`
    #[serde(default)]
    pub json: Option<JsonValue>,

    #[serde(default)]
    pub delay_ms: u64,

    /// Substitute `{{param}}`, `{{query.x}}`, `{{header.x}}`, `{{method}}`, `{{path}}`, `{{body}}`
    #[serde(default)]
    pub template: bool,
}

fn default_status() -> u16 {
    200
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: None,
            body_file: None,
            json: None,
            delay_ms: 0,
            template: false,
        }
    }
}

impl ResponseConfig {
    pub fn text(body: &str) -> Self {
        Self {
            body: Some(body.to_string()),
            headers: [("Content-Type".to_string(), "text/plain".to_string())].into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn json_body(value: JsonValue) -> Self {
        Self {
            json: Some(value),
            headers: [("Content-Type".to_string(), "application/json".to_string())].into_iter().collect(),
            ..Default::default()
        }
    }

    /// `{code, message, data}` envelope with HTTP 200
    pub fn envelope(code: i64, message: &str, data: JsonValue) -> Self {
        Self::json_body(json!({
            "code": code,
            "message": message,
            "data": data,
        }))
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            ..Self::text(message)
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn get_body(&self) -> Vec<u8> {
        if let Some(ref json) = self.json {
            serde_json::to_vec(json).unwrap_or_else(|_| b"{}".to_vec())
        } else if let Some(ref body) = self.body {
            body.clone().into_bytes()
        } else if let Some(ref path) = self.body_file {
            match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Mock body file unreadable");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default)]
    pub method: HttpMethod,

    /// Path pattern: `:param` placeholders, `*` one segment, `**` anything
    pub path: String,

    pub response: ResponseConfig,

    /// Higher is matched first
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl RouteConfig {
    pub fn new(method: HttpMethod, path: &str, response: ResponseConfig) -> Self {
        Self {
            method,
            path: path.to_string(),
            response,
            priority: 0,
            enabled: true,
            name: None,
        }
    }

    pub fn get(path: &str, body: &str) -> Self {
        Self::new(HttpMethod::Get, path, ResponseConfig::text(body))
    }

    pub fn post_json(path: &str, json: JsonValue) -> Self {
        Self::new(HttpMethod::Post, path, ResponseConfig::json_body(json))
    }

    /// Parse `METHOD:PATH[:BODY]`; a body starting with `@` names a file,
    /// one starting with `{` or `[` is JSON
    pub fn from_spec(spec: &str) -> Result<Self, String> {
        let parts: Vec<&str> = spec.splitn(3, ':').collect();
        if parts.len() < 2 {
            return Err(format!(
                "Invalid route '{}', expected METHOD:PATH or METHOD:PATH:BODY",
                spec
            ));
        }
        let method = HttpMethod::parse(parts[0]).ok_or_else(|| format!("Unknown HTTP method: {}", parts[0]))?;

        let response = match parts.get(2) {
            Some(body) if body.starts_with('@') => ResponseConfig {
                body_file: Some(body[1..].to_string()),
                ..Default::default()
            },
            Some(body) if body.starts_with('{') || body.starts_with('[') => {
                let json = serde_json::from_str(body).map_err(|e| format!("Invalid JSON body: {}", e))?;
                ResponseConfig::json_body(json)
            }
            Some(body) => ResponseConfig::text(body),
            None => ResponseConfig::text("OK"),
        };

        Ok(Self::new(method, parts[1], response))
    }
}

/// A route with its path pattern compiled
#[derive(Debug, Clone)]
pub struct Route {
    pub config: RouteConfig,
    path_regex: Regex,
    param_names: Vec<String>,
}

impl Route {
    pub fn new(config: RouteConfig) -> Result<Self, String> {
        let (regex, params) = compile_path_pattern(&config.path)?;
        Ok(Self {
            config,
            path_regex: regex,
            param_names: params,
        })
    }

    /// Captured path parameters when method and path match
    pub fn matches(&self, method: &str, path: &str) -> Option<HashMap<String, String>> {
        if !self.config.enabled || !self.config.method.matches(method) {
            return None;
        }

        self.path_regex.captures(path).map(|caps| {
            self.param_names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| caps.get(i + 1).map(|m| (name.clone(), m.as_str().to_string())))
                .collect()
        })
    }
}

fn compile_path_pattern(pattern: &str) -> Result<(Regex, Vec<String>), String> {
    let mut regex_str = String::from("^");
    let mut param_names = Vec::new();

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' => {
                let mut param_name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        param_name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if param_name.is_empty() {
                    return Err("Empty parameter name in path pattern".to_string());
                }
                param_names.push(param_name);
                regex_str.push_str("([^/]+)");
            }
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex_str.push_str("(.*)");
                    param_names.push("**".to_string());
                } else {
                    regex_str.push_str("([^/]*)");
                    param_names.push("*".to_string());
                }
            }
            '.' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '\\' | '^' | '$' | '|' => {
                regex_str.push('\\');
                regex_str.push(c);
            }
            _ => regex_str.push(c),
        }
    }

    regex_str.push('$');

    Regex::new(&regex_str)
        .map(|r| (r, param_names))
        .map_err(|e| format!("Invalid path pattern: {}", e))
}

/// A request as the mock server saw it
#[derive(Debug, Clone, Default, Serialize)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Lower-cased names
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl MockRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Token from an `Authorization: Bearer` header
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.header("authorization")?;
        let (scheme, token) = value.split_once(' ')?;
        scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
    }

    /// Body decoded as JSON, or as a form when it is not JSON
    pub fn body_fields(&self) -> Option<HashMap<String, String>> {
        if let Ok(JsonValue::Object(map)) = serde_json::from_str::<JsonValue>(&self.body) {
            return Some(
                map.into_iter()
                    .map(|(k, v)| {
                        let text = match v {
                            JsonValue::String(s) => s,
                            JsonValue::Null => String::new(),
                            other => other.to_string(),
                        };
                        (k, text)
                    })
                    .collect(),
            );
        }
        let content_type = self.header("content-type").unwrap_or_default();
        if content_type.starts_with("application/x-www-form-urlencoded") {
            return serde_urlencoded::from_str(&self.body).ok();
        }
        None
    }
}

/// Log entry for one served request
#[derive(Debug, Clone, Serialize)]
pub struct RequestInfo {
    pub request: MockRequest,
    pub status: u16,
    pub timestamp: String,
    pub client_ip: String,
}

impl RequestInfo {
    pub fn new(request: MockRequest, status: u16, client_ip: String) -> Self {
        Self {
            request,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            client_ip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_pattern_exact() {
        let (regex, params) = compile_path_pattern("/user/login").unwrap();
        assert!(params.is_empty());
        assert!(regex.is_match("/user/login"));
        assert!(!regex.is_match("/user/login/"));
    }

    #[test]
    fn test_path_pattern_params() {
        let route = Route::new(RouteConfig::get("/users/:id", "User")).unwrap();
        let params = route.matches("GET", "/users/42").unwrap();
        assert_eq!(params.get("id"), Some(&"42".to_string()));
        assert!(route.matches("POST", "/users/42").is_none());
        assert!(route.matches("GET", "/users/").is_none());
    }

    #[test]
    fn test_path_pattern_wildcard() {
        let (regex, _) = compile_path_pattern("/api/*").unwrap();
        assert!(regex.is_match("/api/anything"));
        assert!(!regex.is_match("/api/foo/bar"));

        let (regex, _) = compile_path_pattern("/api/**").unwrap();
        assert!(regex.is_match("/api/foo/bar/baz"));
    }

    #[test]
    fn test_route_from_spec() {
        let route = RouteConfig::from_spec("POST:/api/items:{\"id\":1}").unwrap();
        assert_eq!(route.method, HttpMethod::Post);
        assert_eq!(route.response.json, Some(json!({"id": 1})));

        let route = RouteConfig::from_spec("get:/health").unwrap();
        assert_eq!(route.response.body.as_deref(), Some("OK"));

        assert!(RouteConfig::from_spec("FETCH:/x").is_err());
        assert!(RouteConfig::from_spec("/only-path").is_err());
    }

    #[test]
    fn test_bearer_token_and_body_fields() {
        let mut request = MockRequest {
            body: r#"{"username":"admin","number":1}"#.to_string(),
            ..Default::default()
        };
        request.headers.insert("authorization".into(), "Bearer mock_token_123456".into());
        assert_eq!(request.bearer_token(), Some("mock_token_123456"));

        let fields = request.body_fields().unwrap();
        assert_eq!(fields["username"], "admin");
        assert_eq!(fields["number"], "1");
    }

    #[test]
    fn test_form_body_fields() {
        let mut request = MockRequest {
            body: "username=admin&password=Lx123456".to_string(),
            ..Default::default()
        };
        request.headers.insert("content-type".into(), "application/x-www-form-urlencoded".into());
        assert_eq!(request.body_fields().unwrap()["password"], "Lx123456");
    }
}
