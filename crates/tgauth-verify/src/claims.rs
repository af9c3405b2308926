//! Identity claims decoding.
//!
//! Claims are only ever decoded after the signature has been verified. Their
//! shape is controlled by the issuing platform, so they are kept as an opaque
//! JSON object ([`Claims`]). [`Principal`] is a lenient view of the few
//! attributes callers usually need.
//!
//! A missing or undecodable claims field never fails verification; it is
//! reported through [`ClaimsStatus`].

use serde_json::{Map, Value};
use tracing::debug;

use crate::canonical::decode_value;
use crate::pairs::Pair;

/// Claims field used by default.
pub const DEFAULT_CLAIMS_FIELD: &str = "user";

/// Decoded identity claims: an untyped JSON object.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Look up a single claim.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Take the underlying JSON object.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Extract the principal described by these claims, if they carry an id.
    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        Principal::from_claims(self)
    }
}

/// Outcome of decoding the claims field of a verified payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimsStatus {
    /// The claims field was present and decoded into a JSON object.
    Decoded,
    /// The payload has no claims field.
    Absent,
    /// The claims field was present but is not a JSON object.
    Malformed,
}

/// Decode the claims field named `claims_field` from verified `pairs`.
///
/// The value is percent-decoded and parsed as a JSON object. Parse failures are
/// absorbed and reported as [`ClaimsStatus::Malformed`].
#[must_use]
pub fn decode_claims(pairs: &[Pair<'_>], claims_field: &str) -> (Option<Claims>, ClaimsStatus) {
    let Some(pair) = pairs.iter().find(|pair| pair.key == claims_field) else {
        return (None, ClaimsStatus::Absent);
    };

    let decoded = decode_value(pair.value);
    match serde_json::from_str::<Map<String, Value>>(&decoded) {
        Ok(map) => (Some(Claims(map)), ClaimsStatus::Decoded),
        Err(err) => {
            debug!(field = claims_field, error = %err, "claims field is not a JSON object");
            (None, ClaimsStatus::Malformed)
        }
    }
}

/// The authenticated user described by the claims.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Numeric user identifier.
    pub id: i64,
    /// First name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Public username, without `@`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// IETF language tag of the user's client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    /// Whether the user has a premium subscription.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    /// Profile photo URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Principal {
    /// Build a principal from claims.
    ///
    /// The id may be a JSON integer or a string of digits. Claims without a
    /// usable id yield `None`. Other attributes are taken when they have the
    /// expected type and ignored otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use tgauth_verify::claims::{ClaimsStatus, decode_claims};
    /// use tgauth_verify::pairs::extract_pairs;
    ///
    /// let pairs = extract_pairs("user=%7B%22id%22%3A42%2C%22username%22%3A%22ann%22%7D", &["hash"]);
    /// let (claims, status) = decode_claims(&pairs, "user");
    /// assert_eq!(status, ClaimsStatus::Decoded);
    ///
    /// let principal = claims.unwrap().principal().unwrap();
    /// assert_eq!(principal.id, 42);
    /// assert_eq!(principal.username.as_deref(), Some("ann"));
    /// ```
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        let id = match claims.get("id")? {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            _ => return None,
        };

        Some(Self {
            id,
            first_name: string_claim(claims, "first_name"),
            last_name: string_claim(claims, "last_name"),
            username: string_claim(claims, "username"),
            language_code: string_claim(claims, "language_code"),
            is_premium: claims.get("is_premium").and_then(Value::as_bool),
            photo_url: string_claim(claims, "photo_url"),
        })
    }
}

fn string_claim(claims: &Claims, key: &str) -> Option<String> {
    claims.get(key).and_then(Value::as_str).map(ToOwned::to_owned)
}
