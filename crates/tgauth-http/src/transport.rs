//! Locating the init data in an HTTP request.
//!
//! Clients hand the signed payload over in one of three places, checked in
//! this order:
//!
//! 1. the `x-tg-initdata` header, verbatim;
//! 2. the `initData` query parameter, form-decoded once (undoing only the
//!    encoding added by the query string itself);
//! 3. the `initData` field of a JSON body, for non-`GET` requests that declare
//!    a JSON content type.
//!
//! The first non-empty candidate wins.

use std::fmt;

use http::header::CONTENT_TYPE;

/// Header carrying the init data.
pub const INIT_DATA_HEADER: &str = "x-tg-initdata";

/// Query parameter and JSON body field carrying the init data.
pub const INIT_DATA_FIELD: &str = "initData";

/// Where the init data was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitDataSource {
    /// The `x-tg-initdata` header.
    Header,
    /// The `initData` query parameter.
    Query,
    /// The `initData` field of a JSON body.
    Body,
}

impl InitDataSource {
    /// Stable lowercase name, used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for InitDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(serde::Deserialize)]
struct InitDataBody {
    #[serde(rename = "initData", default)]
    init_data: Option<String>,
}

/// Init data from the header or the query string, whichever comes first.
#[must_use]
pub fn from_parts(parts: &http::request::Parts) -> Option<(InitDataSource, String)> {
    from_header(&parts.headers)
        .map(|v| (InitDataSource::Header, v))
        .or_else(|| from_query(parts.uri.query()).map(|v| (InitDataSource::Query, v)))
}

/// Whether the body may carry the init data: a non-`GET` request with a JSON
/// content type.
#[must_use]
pub fn body_may_carry_init_data(parts: &http::request::Parts) -> bool {
    parts.method != http::Method::GET && is_json(&parts.headers)
}

/// Init data from a JSON request body.
///
/// A body that is not a JSON object, or whose field is not a string, carries
/// nothing.
#[must_use]
pub fn from_json_body(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<InitDataBody>(body)
        .ok()
        .and_then(|b| b.init_data)
        .filter(|v| !v.trim().is_empty())
}

fn from_header(headers: &http::HeaderMap) -> Option<String> {
    headers
        .get(INIT_DATA_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(ToOwned::to_owned)
}

fn from_query(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == INIT_DATA_FIELD)
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.trim().is_empty())
}

fn is_json(headers: &http::HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
}
