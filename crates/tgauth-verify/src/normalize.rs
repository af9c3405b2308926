//! Unwrapping of transport wrappers around the signed string.
//!
//! Clients do not always send the bare signed query string. Depending on the
//! client version the value may arrive as:
//!
//! - the raw signed string (`query_id=...&user=...&auth_date=...&hash=...`),
//! - a URL or URL fragment carrying it in a `tgWebAppData` parameter,
//! - a string carrying it in an outer `initData` parameter.
//!
//! [`normalize_init_data`] strips those layers in that priority order. It never
//! percent-decodes anything: the returned slice is byte-for-byte what the
//! client sent, so the canonicalizer can decide on decoding deliberately.

use std::sync::LazyLock;

use regex::Regex;

static WEB_APP_DATA_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[#&?]tgWebAppData=([^&]+)").expect("static regex should compile")
});

static INIT_DATA_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[?&#])initData=([^&]+)").expect("static regex should compile")
});

/// Reduce `input` to the innermost raw signed string.
///
/// Returns an empty string when nothing usable is found. Never fails.
///
/// # Examples
///
/// ```
/// use tgauth_verify::normalize::normalize_init_data;
///
/// assert_eq!(normalize_init_data("  auth_date=1&hash=ab  "), "auth_date=1&hash=ab");
/// assert_eq!(normalize_init_data("?auth_date=1&hash=ab"), "auth_date=1&hash=ab");
/// assert_eq!(
///     normalize_init_data("https://t.me/app#tgWebAppData=auth_date%3D1&tgWebAppVersion=7"),
///     "auth_date%3D1",
/// );
/// assert_eq!(normalize_init_data(""), "");
/// ```
#[must_use]
pub fn normalize_init_data(input: &str) -> &str {
    let mut s = input.trim();
    if s.is_empty() {
        return s;
    }

    if let Some(value) = capture_value(&WEB_APP_DATA_PARAM, s) {
        s = value;
    }

    if let Some(rest) = s.strip_prefix('?').or_else(|| s.strip_prefix('#')) {
        s = rest;
    }

    if let Some(value) = capture_value(&INIT_DATA_PARAM, s) {
        s = value;
    }

    s
}

fn capture_value<'a>(pattern: &Regex, haystack: &'a str) -> Option<&'a str> {
    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
