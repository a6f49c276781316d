//! Built-in user service: login, profile, listing, logout
//!
//! Answers with the `{code, message, data}` envelope, plus the token-pair
//! endpoint for backends that hand out `{access, refresh}`.

use serde_json::{json, Value as JsonValue};
use std::path::Path;

use super::routes::{MockRequest, ResponseConfig};
use crate::data::{TestData, UserRecord};
use crate::errors::Result;

pub const MOCK_TOKEN: &str = "mock_token_123456";
pub const MOCK_REFRESH_TOKEN: &str = "mock_refresh_123456";

pub const LOGIN_PATH: &str = "/user/login";
pub const INFO_PATH: &str = "/user/info";
pub const LIST_PATH: &str = "/user/list";
pub const LOGOUT_PATH: &str = "/user/logout";
pub const TOKEN_PAIR_PATH: &str = "/api/user/get_token/";

#[derive(Debug, Clone)]
pub struct UserService {
    users: Vec<UserRecord>,
}

impl Default for UserService {
    fn default() -> Self {
        Self::new(vec![UserRecord::builtin_admin()])
    }
}

impl UserService {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self { users }
    }

    /// Users from a fixture file; the built-in admin when it has none
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = TestData::load(path)?;
        if data.users.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self::new(data.users))
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    /// `None` when the request is not for this service
    pub fn handle(&self, request: &MockRequest) -> Option<ResponseConfig> {
        let method = request.method.to_ascii_uppercase();
        let response = match (method.as_str(), request.path.as_str()) {
            ("POST", LOGIN_PATH) => self.login(request),
            ("GET", INFO_PATH) => self.info(request),
            ("GET", LIST_PATH) => self.list(request),
            ("POST", LOGOUT_PATH) => ResponseConfig::envelope(0, "logged out", JsonValue::Null),
            ("POST", TOKEN_PAIR_PATH) => self.token_pair(request),
            _ => return None,
        };
        Some(response)
    }

    fn authenticate(&self, request: &MockRequest) -> Option<&UserRecord> {
        let fields = request.body_fields()?;
        let field = |name: &str| fields.get(name).map(String::as_str).unwrap_or_default();

        let number = field("number");
        let username = field("username");
        let password = field("password");
        if username.is_empty() || password.is_empty() {
            return None;
        }

        self.users.iter().find(|user| {
            user.username == username
                && user.password == password
                && (number.is_empty() || user.number == number)
        })
    }

    fn login(&self, request: &MockRequest) -> ResponseConfig {
        match self.authenticate(request) {
            Some(user) => ResponseConfig::envelope(
                0,
                "login succeeded",
                json!({
                    "token": MOCK_TOKEN,
                    "username": user.username,
                    "name": user.name,
                    "role": user.role,
                }),
            ),
            None => ResponseConfig::envelope(1, "invalid username or password", JsonValue::Null),
        }
    }

    fn token_pair(&self, request: &MockRequest) -> ResponseConfig {
        match self.authenticate(request) {
            Some(_) => ResponseConfig::json_body(json!({
                "access": MOCK_TOKEN,
                "refresh": MOCK_REFRESH_TOKEN,
            })),
            None => ResponseConfig::json_body(json!({
                "detail": "No active account found with the given credentials",
            }))
            .with_status(401),
        }
    }

    fn authorized(request: &MockRequest) -> bool {
        request.bearer_token() == Some(MOCK_TOKEN)
    }

    fn unauthorized() -> ResponseConfig {
        ResponseConfig::envelope(401, "unauthorized", JsonValue::Null)
    }

    fn info(&self, request: &MockRequest) -> ResponseConfig {
        if !Self::authorized(request) {
            return Self::unauthorized();
        }
        let user = self
            .users
            .iter()
            .find(|u| u.username == "admin")
            .or_else(|| self.users.first());

        match user {
            Some(user) => ResponseConfig::envelope(0, "ok", profile(user)),
            None => ResponseConfig::envelope(1, "user not found", JsonValue::Null),
        }
    }

    fn list(&self, request: &MockRequest) -> ResponseConfig {
        if !Self::authorized(request) {
            return Self::unauthorized();
        }
        let items: Vec<JsonValue> = self.users.iter().map(profile).collect();
        ResponseConfig::envelope(
            0,
            "ok",
            json!({
                "total": items.len(),
                "items": items,
            }),
        )
    }
}

fn profile(user: &UserRecord) -> JsonValue {
    json!({
        "number": user.number,
        "username": user.username,
        "name": user.name,
        "role": user.role,
    })
}
