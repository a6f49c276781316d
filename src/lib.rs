//! qaharness: building blocks for API and UI test suites
//!
//! # Module Organization
//!
//! - [`config`] - Environment-keyed settings and secrets
//! - [`logging`] - One-time tracing setup
//! - [`client`] - API client: URL building, auth, retries, redacted logging
//! - [`middleware`] - Bearer and API-key authentication
//! - [`page`] - Page objects over a W3C WebDriver session
//! - [`report`] - Attachments, Allure results, JUnit XML and HTML summaries
//! - [`load`] - Simulated-user load scenarios
//! - [`mock`] - Mock backend with a built-in user service
//! - [`data`] - Test data fixtures and generators
//! - [`cli`] - The `qaharness` command

pub mod cli;
pub mod client;
pub mod config;
pub mod data;
pub mod errors;
pub mod load;
pub mod logging;
pub mod middleware;
pub mod mock;
pub mod page;
pub mod report;
pub mod signals;
pub mod status;

pub use errors::{HarnessError, Result};
