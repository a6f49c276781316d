//! Settings file: a `[defaults]` table plus one table per environment
//!
//! ```toml
//! current_env = "test"
//!
//! [defaults]
//! timeout = "10s"
//! log_level = "info"
//!
//! [environments.test]
//! base_url = "http://localhost:8081"
//! username = "admin"
//! password = "Lx123456"
//! number = "001"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::SecretString;
use crate::client::{ClientConfig, Credentials, LoginFlavor, LoginSettings, RetryPolicy};
use crate::errors::{HarnessError, Result};
use crate::logging::{LogFormat, LogSettings};

/// Selects the environment table
pub const TEST_ENV_VAR: &str = "TEST_ENV";
/// Overrides the settings file location
pub const CONFIG_PATH_ENV: &str = "QAHARNESS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

const DEFAULT_ENV: &str = "test";
const DEFAULT_BASE_URL: &str = "http://localhost:8081";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";
const DEFAULT_UI_TIMEOUT: Duration = Duration::from_secs(10);

/// Integer seconds or a humantime string such as `"500ms"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    fn to_duration(&self, key: &str) -> Result<Duration> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => humantime::parse_duration(text.trim())
                .map_err(|e| HarnessError::Config(format!("Invalid duration for '{}': {}", key, e))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawSection {
    base_url: Option<String>,
    ui_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    number: Option<String>,
    api_key: Option<String>,
    api_key_header: Option<String>,
    timeout: Option<DurationValue>,
    max_retries: Option<u32>,
    retry_delay: Option<DurationValue>,
    retry_non_idempotent: Option<bool>,
    log_level: Option<String>,
    log_format: Option<String>,
    log_file_path: Option<PathBuf>,
    log_body_limit: Option<usize>,
    allure_result_path: Option<PathBuf>,
    html_report_path: Option<PathBuf>,
    login_flavor: Option<String>,
    login_endpoint: Option<String>,
    logout_endpoint: Option<String>,
    webdriver_url: Option<String>,
    browser: Option<String>,
    headless: Option<bool>,
    ui_timeout: Option<DurationValue>,
    current_env: Option<String>,
}

macro_rules! overlay {
    ($base:expr, $over:expr, $($field:ident),+ $(,)?) => {
        RawSection {
            $($field: $over.$field.or($base.$field),)+
        }
    };
}

impl RawSection {
    /// Fields set in `over` replace those in `self`
    fn overlay(self, over: RawSection) -> RawSection {
        overlay!(
            self, over,
            base_url, ui_url, username, password, number, api_key, api_key_header,
            timeout, max_retries, retry_delay, retry_non_idempotent,
            log_level, log_format, log_file_path, log_body_limit,
            allure_result_path, html_report_path,
            login_flavor, login_endpoint, logout_endpoint,
            webdriver_url, browser, headless, ui_timeout, current_env,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFile {
    current_env: Option<String>,
    defaults: RawSection,
    environments: BTreeMap<String, RawSection>,
}

/// Browser side of the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct UiConfig {
    pub ui_url: String,
    /// Default auto-wait for page operations
    pub timeout: Duration,
    pub webdriver_url: String,
    pub browser: String,
    pub headless: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            ui_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_UI_TIMEOUT,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            browser: "chrome".to_string(),
            headless: true,
        }
    }
}

/// Where report artifacts go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub allure_result_path: PathBuf,
    pub html_report_path: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            allure_result_path: PathBuf::from("reports/allure_results"),
            html_report_path: PathBuf::from("reports/html_report"),
        }
    }
}

/// Resolved settings for one environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub env: String,
    pub client: ClientConfig,
    pub ui: UiConfig,
    pub log: LogSettings,
    pub reports: ReportSettings,
}

impl Settings {
    /// Settings file location: `QAHARNESS_CONFIG` or `config/config.toml`
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load from the default path with the environment picked by `TEST_ENV`
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path())
    }

    /// Load `path` with the environment picked by `TEST_ENV`
    pub fn load(path: &Path) -> Result<Self> {
        let env = std::env::var(TEST_ENV_VAR).ok().filter(|v| !v.trim().is_empty());
        Self::load_for(path, env.as_deref())
    }

    /// Load `path` for an explicit environment (`None` falls back to
    /// `current_env`, then `test`). A missing file yields built-in defaults.
    pub fn load_for(path: &Path, env: Option<&str>) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Settings file not found, using defaults");
            return Self::from_toml_str("", env);
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content, env)
    }

    pub fn from_toml_str(content: &str, env: Option<&str>) -> Result<Self> {
        let mut raw: RawFile = toml::from_str(content)
            .map_err(|e| HarnessError::Config(format!("Invalid settings TOML: {}", e)))?;

        let env = env
            .map(str::to_string)
            .or_else(|| raw.current_env.clone())
            .or_else(|| raw.defaults.current_env.clone())
            .unwrap_or_else(|| DEFAULT_ENV.to_string());

        let section = match raw.environments.remove(&env) {
            Some(section) => section,
            None if raw.environments.is_empty() => RawSection::default(),
            None => {
                let known: Vec<&str> = raw.environments.keys().map(String::as_str).collect();
                return Err(HarnessError::Config(format!(
                    "Unknown environment '{}' (available: {})",
                    env,
                    known.join(", ")
                )));
            }
        };

        Self::resolve(env, raw.defaults.overlay(section))
    }

    fn resolve(env: String, raw: RawSection) -> Result<Self> {
        let base_url = raw.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut retry = RetryPolicy::default();
        if let Some(max) = raw.max_retries {
            retry = retry.with_max_attempts(max);
        }
        if let Some(delay) = &raw.retry_delay {
            retry = retry.with_base_delay(delay.to_duration("retry_delay")?);
        }
        if let Some(enabled) = raw.retry_non_idempotent {
            retry = retry.retry_non_idempotent(enabled);
        }

        let flavor = match raw.login_flavor.as_deref() {
            Some(text) => text.parse::<LoginFlavor>().map_err(HarnessError::Config)?,
            None => LoginFlavor::default(),
        };
        let login = LoginSettings {
            flavor,
            endpoint: raw.login_endpoint,
            logout_endpoint: raw.logout_endpoint,
        };

        let credentials = Credentials {
            number: raw.number.unwrap_or_default(),
            username: raw.username.unwrap_or_default(),
            password: SecretString::new(raw.password.unwrap_or_default()),
            api_key: raw.api_key.filter(|k| !k.is_empty()).map(SecretString::new),
        };

        let mut client = ClientConfig::new(base_url.clone())
            .with_retry(retry)
            .with_credentials(credentials)
            .with_login(login);
        if let Some(timeout) = &raw.timeout {
            client = client.with_timeout(timeout.to_duration("timeout")?);
        }
        if let Some(limit) = raw.log_body_limit {
            client = client.with_log_body_limit(limit);
        }
        if let Some(header) = raw.api_key_header {
            client = client.with_api_key_header(header);
        }

        let ui_defaults = UiConfig::default();
        let ui = UiConfig {
            ui_url: raw.ui_url.unwrap_or(base_url),
            timeout: match &raw.ui_timeout {
                Some(t) => t.to_duration("ui_timeout")?,
                None => ui_defaults.timeout,
            },
            webdriver_url: raw.webdriver_url.unwrap_or(ui_defaults.webdriver_url),
            browser: raw.browser.unwrap_or(ui_defaults.browser),
            headless: raw.headless.unwrap_or(ui_defaults.headless),
        };

        let log_defaults = LogSettings::default();
        let log = LogSettings {
            level: raw.log_level.unwrap_or(log_defaults.level),
            format: match raw.log_format.as_deref() {
                Some(text) => text.parse::<LogFormat>().map_err(HarnessError::Config)?,
                None => log_defaults.format,
            },
            file: raw.log_file_path,
        };

        let report_defaults = ReportSettings::default();
        let reports = ReportSettings {
            allure_result_path: raw.allure_result_path.unwrap_or(report_defaults.allure_result_path),
            html_report_path: raw.html_report_path.unwrap_or(report_defaults.html_report_path),
        };

        Ok(Self {
            env,
            client,
            ui,
            log,
            reports,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        self.client.clone()
    }

    /// Key/value pairs describing the run, for `environment.properties`
    pub fn properties(&self) -> Vec<(String, String)> {
        vec![
            ("env".to_string(), self.env.clone()),
            ("base_url".to_string(), self.client.base_url.clone()),
            ("ui_url".to_string(), self.ui.ui_url.clone()),
            ("username".to_string(), self.client.credentials.username.clone()),
            ("login_flavor".to_string(), self.client.login.flavor.to_string()),
            ("browser".to_string(), self.ui.browser.clone()),
            ("headless".to_string(), self.ui.headless.to_string()),
        ]
    }
}
