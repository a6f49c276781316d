//! API client: request pipeline, login flavors and session state

pub mod api;
pub mod auth;
pub mod config;
pub mod probe;
pub mod redact;
pub mod request;
pub mod response;
pub mod retry;
pub mod session;
pub mod url;

pub use api::{ApiClient, LoginOutcome, USER_AGENT_STRING};
pub use auth::{LoginFlavor, LoginSettings};
pub use config::{ClientConfig, Credentials};
pub use probe::{probe_login_endpoints, ProbeAttempt, ProbeReport, DEFAULT_LOGIN_CANDIDATES};
pub use request::{ApiRequest, RequestBody};
pub use response::ApiResponse;
pub use retry::RetryPolicy;
pub use session::{Session, TokenGrant};
pub use self::url::build_url;
