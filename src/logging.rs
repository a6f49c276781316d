//! One-time tracing setup from configuration
//!
//! Components never own a logger. They log through `tracing` inside a span
//! handed to them; this module decides where those events end up.

use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::errors::{HarnessError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter directive, e.g. `info` or `qaharness=debug`
    pub level: String,
    pub format: LogFormat,
    /// Also append plain-text events to this file
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

/// Keeps the log file open; flushes it when dropped
#[derive(Debug)]
#[must_use = "dropping the guard flushes and stops file logging early"]
pub struct LogGuard {
    file: Option<Arc<File>>,
}

impl LogGuard {
    pub fn file_logging(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = (&**file).flush();
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this a second time
/// leaves the first subscriber in place and still returns a guard.
pub fn init(settings: &LogSettings) -> Result<LogGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| HarnessError::Config(format!("Invalid log level '{}': {}", settings.level, e)))?,
    };

    let file = match &settings.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(Arc::new(file))
        }
        None => None,
    };

    let (text_layer, json_layer) = match settings.format {
        LogFormat::Text => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };
    let file_layer = file
        .clone()
        .map(|f| fmt::layer().with_ansi(false).with_writer(f));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level = %settings.level, format = ?settings.format, "Logging initialised");
    }

    Ok(LogGuard { file })
}
