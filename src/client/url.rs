//! URL resolution for relative endpoints

/// Whether `endpoint` is already an absolute http(s) URL
pub fn is_absolute(endpoint: &str) -> bool {
    let lower = endpoint.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Join `base` and `endpoint` with exactly one `/` between them.
///
/// Absolute endpoints are returned verbatim; an empty endpoint yields the base.
pub fn build_url(base: &str, endpoint: &str) -> String {
    if is_absolute(endpoint) {
        return endpoint.to_string();
    }
    if endpoint.is_empty() {
        return base.to_string();
    }

    let base = base.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", base, endpoint)
}
