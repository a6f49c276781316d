//! Allure `environment.properties`

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::errors::Result;

pub const ENVIRONMENT_FILE: &str = "environment.properties";

/// Escape characters the properties format treats specially
fn escape(value: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '=' | ':' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key => out.push_str("\\ "),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_properties(properties: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in properties {
        let _ = writeln!(out, "{}={}", escape(key, true), escape(value, false));
    }
    out
}

/// Write `environment.properties` into `dir`, returning its path
pub fn write_environment(dir: &Path, properties: &[(String, String)]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(ENVIRONMENT_FILE);
    std::fs::write(&path, render_properties(properties))?;
    Ok(path)
}
