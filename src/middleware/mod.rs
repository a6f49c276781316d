//! Request middleware

pub mod auth;

pub use auth::{Auth, AuthError, DEFAULT_API_KEY_HEADER};
