//! Server URL handling.
//!
//! Endpoints are appended to a user-supplied base URL, which may or may not
//! carry a trailing slash or a path prefix.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use a2ui_term::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://127.0.0.1:8000"), "http://127.0.0.1:8000");
/// assert_eq!(normalize_base_url("http://127.0.0.1:8000///"), "http://127.0.0.1:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash.
///
/// # Examples
///
/// ```
/// use a2ui_term::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/chat/stream"),
///     "http://localhost:8000/chat/stream"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Checks that `url` is an absolute http(s) URL with a host.
pub fn validate_server_url(url: &str) -> Result<String, String> {
    let normalized = normalize_base_url(url);
    let rest = normalized
        .strip_prefix("http://")
        .or_else(|| normalized.strip_prefix("https://"))
        .ok_or_else(|| format!("'{url}' must start with http:// or https://"))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(format!("'{url}' has no host"));
    }
    Ok(normalized)
}
