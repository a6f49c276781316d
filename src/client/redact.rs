//! Masking of credentials before bodies reach the log

use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::LazyLock;
use url::Url;

/// Replacement for every `password` value
pub const MASK: &str = "******";

/// Field name whose value is always masked
const SECRET_FIELD: &str = "password";

static FORM_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[&?\s])password=[^&\s]*").expect("static regex")
});

/// Copy of `value` with every `password` member masked, at any depth
pub fn redact_json(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(key, v)| {
                    let masked = if key == SECRET_FIELD {
                        JsonValue::String(MASK.to_string())
                    } else {
                        redact_json(v)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

/// Copy of form pairs with the `password` value masked
pub fn redact_form(pairs: &[(String, String)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| {
            if k == SECRET_FIELD {
                (k.clone(), MASK.to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

/// `url` as text with a `password` query value masked
pub fn redact_url(url: &Url) -> String {
    if !url.query_pairs().any(|(name, _)| name == SECRET_FIELD) {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(redact_form(&pairs));
    masked.to_string()
}

/// Redacted text rendering of an arbitrary body: JSON is masked structurally,
/// anything else has `password=` pairs masked
pub fn redact_body(raw: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<JsonValue>(raw) {
        return redact_json(&json).to_string();
    }
    let text = String::from_utf8_lossy(raw);
    FORM_PASSWORD
        .replace_all(&text, format!("${{1}}{}={}", SECRET_FIELD, MASK))
        .into_owned()
}

/// Cap `text` at `limit` characters for log output
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}... ({} bytes total)", &text[..cut], text.len()),
    }
}
