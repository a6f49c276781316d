//! Mock backend for API and load tests
//!
//! Serves the built-in user service plus any configured static routes.

pub mod config;
pub mod routes;
pub mod server;
pub mod user_service;

pub use config::MockServerConfig;
pub use routes::{HttpMethod, MockRequest, RequestInfo, ResponseConfig, Route, RouteConfig};
pub use server::{MockHandle, MockServer};
pub use user_service::{UserService, MOCK_REFRESH_TOKEN, MOCK_TOKEN};
