//! Data check string construction.
//!
//! The data check string is the exact byte sequence fed into the keyed hash:
//!
//! ```text
//! key1=value1\n
//! key2=value2\n
//! ...
//! keyN=valueN
//! ```
//!
//! Pairs are always sorted ascending by their raw key bytes. What differs
//! between the [`CanonicalForm`]s is only how each value is rendered. Keys are
//! never decoded, so decoding can never change the sort order.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;

use crate::pairs::Pair;

/// Separator between serialized pairs.
const PAIR_SEPARATOR: &str = "\n";

/// How pair values are rendered into the data check string.
///
/// The variants are listed in their default preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalForm {
    /// Values exactly as received, still percent-encoded.
    Raw,
    /// Values percent-decoded.
    Decoded,
    /// Values percent-decoded, and JSON values re-serialized compactly with
    /// sorted object keys.
    CanonicalJson,
}

impl CanonicalForm {
    /// Every form, in default preference order.
    pub const ALL: [Self; 3] = [Self::Raw, Self::Decoded, Self::CanonicalJson];

    /// Stable lowercase name, used in configuration and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Decoded => "decoded",
            Self::CanonicalJson => "canonical_json",
        }
    }
}

impl fmt::Display for CanonicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown canonical form name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown canonical form: {0}")]
pub struct ParseCanonicalFormError(String);

impl FromStr for CanonicalForm {
    type Err = ParseCanonicalFormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "decoded" => Ok(Self::Decoded),
            "canonical_json" | "json" => Ok(Self::CanonicalJson),
            _ => Err(ParseCanonicalFormError(s.to_owned())),
        }
    }
}

/// Build the data check string for `pairs` in the given `form`.
///
/// # Examples
///
/// ```
/// use tgauth_verify::canonical::{CanonicalForm, build_data_check_string};
/// use tgauth_verify::pairs::extract_pairs;
///
/// let pairs = extract_pairs("b=x%20y&a=1&hash=ff", &["hash"]);
/// assert_eq!(build_data_check_string(&pairs, CanonicalForm::Raw), "a=1\nb=x%20y");
/// assert_eq!(build_data_check_string(&pairs, CanonicalForm::Decoded), "a=1\nb=x y");
/// ```
#[must_use]
pub fn build_data_check_string(pairs: &[Pair<'_>], form: CanonicalForm) -> String {
    let mut sorted: Vec<&Pair<'_>> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.key.as_bytes().cmp(b.key.as_bytes()));

    sorted
        .iter()
        .map(|pair| format!("{}={}", pair.key, render_value(pair.value, form)))
        .collect::<Vec<_>>()
        .join(PAIR_SEPARATOR)
}

/// Render a single value according to `form`.
#[must_use]
pub fn render_value(value: &str, form: CanonicalForm) -> Cow<'_, str> {
    match form {
        CanonicalForm::Raw => Cow::Borrowed(value),
        CanonicalForm::Decoded => decode_value(value),
        CanonicalForm::CanonicalJson => canonicalize_json(decode_value(value)),
    }
}

/// Percent-decode a value, falling back to the value as received when it
/// holds a malformed escape or the decoded bytes are not valid UTF-8.
///
/// Decoding is all or nothing: a single bad `%` sequence leaves every other
/// escape in the value untouched. `+` is not treated as a space.
#[must_use]
pub fn decode_value(value: &str) -> Cow<'_, str> {
    if has_malformed_escape(value) {
        return Cow::Borrowed(value);
    }
    percent_decode_str(value)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(value))
}

/// Whether some `%` is not followed by two hex digits.
fn has_malformed_escape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !matches!(
                bytes.get(i + 1..i + 3),
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
            )
    })
}

/// Re-serialize a decoded value when it looks like JSON.
///
/// Values that do not start with `{` or `[`, or fail to parse, are returned
/// unchanged. Object keys come out sorted because `serde_json` maps are
/// ordered by key.
fn canonicalize_json(decoded: Cow<'_, str>) -> Cow<'_, str> {
    let trimmed = decoded.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return decoded;
    }

    match serde_json::from_str::<serde_json::Value>(&decoded) {
        Ok(value) => match serde_json::to_string(&value) {
            Ok(compact) => Cow::Owned(compact),
            Err(_) => decoded,
        },
        Err(_) => decoded,
    }
}
