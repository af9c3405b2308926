//! Pair extraction from the raw signed string.
//!
//! The raw string is split on `&`, each segment on its first `=`. Segments
//! without `=` or with an empty key are ignored. Values are kept exactly as
//! received (still percent-encoded). The signature field(s) are never part of
//! the extracted pairs.

use std::collections::HashSet;

use tracing::debug;

/// Signature field names accepted by default, current name first.
pub const DEFAULT_SIGNATURE_FIELDS: [&str; 2] = ["hash", "signature"];

/// A single `key=value` pair borrowed from the raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair<'a> {
    /// The key, exactly as received.
    pub key: &'a str,
    /// The value, exactly as received (not percent-decoded).
    pub value: &'a str,
}

/// Split `raw` into pairs, excluding every key named in `signature_fields`.
///
/// The first occurrence of a key wins. Later duplicates are dropped; their
/// presence is logged because a well-formed payload never repeats a key.
/// Output order follows the input, which keeps debugging output readable. The
/// canonicalizer re-sorts, so the order has no effect on verification.
///
/// # Examples
///
/// ```
/// use tgauth_verify::pairs::extract_pairs;
///
/// let pairs = extract_pairs("b=2&a=1&hash=ff", &["hash"]);
/// let keys: Vec<&str> = pairs.iter().map(|p| p.key).collect();
/// assert_eq!(keys, vec!["b", "a"]);
/// ```
#[must_use]
pub fn extract_pairs<'a, S: AsRef<str>>(raw: &'a str, signature_fields: &[S]) -> Vec<Pair<'a>> {
    let mut seen = HashSet::new();
    let mut duplicates = 0usize;

    let pairs: Vec<Pair<'a>> = split_segments(raw)
        .filter(|pair| !is_signature_field(pair.key, signature_fields))
        .filter(|pair| {
            let first = seen.insert(pair.key);
            if !first {
                duplicates += 1;
            }
            first
        })
        .collect();

    if duplicates > 0 {
        debug!(duplicates, "dropped duplicate keys from signed payload");
    }

    pairs
}

/// Locate the caller-supplied signature in `raw`.
///
/// Field names are tried in the given order, so the current name should come
/// before any legacy alias. An empty value counts as absent. The returned pair
/// names the field that supplied the signature; its value is untouched.
///
/// # Examples
///
/// ```
/// use tgauth_verify::pairs::find_signature;
///
/// let found = find_signature("signature=aa&hash=bb", &["hash", "signature"]).unwrap();
/// assert_eq!((found.key, found.value), ("hash", "bb"));
/// assert!(find_signature("a=1", &["hash"]).is_none());
/// ```
#[must_use]
pub fn find_signature<'a, S: AsRef<str>>(raw: &'a str, signature_fields: &[S]) -> Option<Pair<'a>> {
    signature_fields.iter().find_map(|field| {
        let field = field.as_ref();
        split_segments(raw)
            .find(|pair| pair.key == field)
            .filter(|pair| !pair.value.is_empty())
    })
}

fn split_segments(raw: &str) -> impl Iterator<Item = Pair<'_>> {
    raw.split('&')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| Pair { key, value })
}

fn is_signature_field<S: AsRef<str>>(key: &str, signature_fields: &[S]) -> bool {
    signature_fields.iter().any(|field| field.as_ref() == key)
}
