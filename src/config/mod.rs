//! Environment-keyed settings loaded from a TOML file

mod secret;
pub mod settings;

pub use secret::SecretString;
pub use settings::{ReportSettings, Settings, UiConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, TEST_ENV_VAR};
