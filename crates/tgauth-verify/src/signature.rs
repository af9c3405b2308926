//! Secret derivation and HMAC-SHA256 signing.
//!
//! The issuing platform never uses a credential as the HMAC key directly in
//! its documented scheme. Instead a secret is derived from it:
//!
//! ```text
//! Secret    = SHA-256(credential)
//! Signature = hex(HMAC-SHA256(Secret, data_check_string))
//! ```
//!
//! Other derivations seen in the wild are available as opt-in fallbacks
//! through [`SecretDerivation`].

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};

use crate::canonical::{CanonicalForm, build_data_check_string};
use crate::credentials::Credential;
use crate::pairs::{DEFAULT_SIGNATURE_FIELDS, extract_pairs};

type HmacSha256 = Hmac<Sha256>;

/// Key used by the `WebAppData` derivation.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// How the HMAC key is derived from a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretDerivation {
    /// `SHA-256(credential)`.
    Sha256,
    /// `HMAC-SHA256(key = "WebAppData", credential)`.
    #[serde(rename = "webappdata")]
    WebAppData,
    /// The credential bytes themselves.
    Raw,
}

impl SecretDerivation {
    /// Stable lowercase name, used in configuration and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::WebAppData => "webappdata",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for SecretDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown derivation name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown secret derivation: {0}")]
pub struct ParseSecretDerivationError(String);

impl FromStr for SecretDerivation {
    type Err = ParseSecretDerivationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "webappdata" | "web_app_data" => Ok(Self::WebAppData),
            "raw" => Ok(Self::Raw),
            _ => Err(ParseSecretDerivationError(s.to_owned())),
        }
    }
}

/// Derive the HMAC key for `credential`.
///
/// # Examples
///
/// ```
/// use tgauth_verify::credentials::Credential;
/// use tgauth_verify::signature::{SecretDerivation, derive_secret};
///
/// let secret = derive_secret(&Credential::new("secret"), SecretDerivation::Sha256);
/// assert_eq!(secret.len(), 32);
/// ```
#[must_use]
pub fn derive_secret(credential: &Credential, derivation: SecretDerivation) -> Vec<u8> {
    let bytes = credential.expose_secret();
    match derivation {
        SecretDerivation::Sha256 => Sha256::digest(bytes).to_vec(),
        SecretDerivation::WebAppData => hmac_sha256(WEB_APP_DATA_KEY, bytes),
        SecretDerivation::Raw => bytes.to_vec(),
    }
}

/// Compute the raw HMAC-SHA256 digest of `data` under `secret`.
#[must_use]
pub fn compute_signature(secret: &[u8], data: &str) -> Vec<u8> {
    hmac_sha256(secret, data.as_bytes())
}

/// Compute the HMAC-SHA256 digest of `data` under `secret`, hex-encoded.
#[must_use]
pub fn compute_signature_hex(secret: &[u8], data: &str) -> String {
    hex::encode(compute_signature(secret, data))
}

/// Sign an unsigned payload the way the issuing platform does.
///
/// Uses the `raw` canonical form, the `sha256` derivation and appends the
/// signature as a `hash` field. `payload` must not already carry a signature.
///
/// # Examples
///
/// ```
/// use tgauth_verify::credentials::Credential;
/// use tgauth_verify::signature::sign_init_data;
///
/// let signed = sign_init_data("auth_date=1700000000", &Credential::new("secret"));
/// assert!(signed.starts_with("auth_date=1700000000&hash="));
/// assert_eq!(signed.len(), "auth_date=1700000000&hash=".len() + 64);
/// ```
#[must_use]
pub fn sign_init_data(payload: &str, credential: &Credential) -> String {
    sign_init_data_with(
        payload,
        credential,
        CanonicalForm::Raw,
        SecretDerivation::Sha256,
        &DEFAULT_SIGNATURE_FIELDS,
    )
}

/// Sign an unsigned payload with an explicit form, derivation and field list.
///
/// The signature is appended under the first name in `signature_fields`
/// (`hash` when the list is empty); every listed field is excluded from the
/// signed content.
#[must_use]
pub fn sign_init_data_with<S: AsRef<str>>(
    payload: &str,
    credential: &Credential,
    form: CanonicalForm,
    derivation: SecretDerivation,
    signature_fields: &[S],
) -> String {
    let pairs = extract_pairs(payload, signature_fields);
    let data_check_string = build_data_check_string(&pairs, form);
    let secret = derive_secret(credential, derivation);
    let signature = compute_signature_hex(&secret, &data_check_string);

    let field = signature_fields
        .first()
        .map_or(DEFAULT_SIGNATURE_FIELDS[0], |field| field.as_ref());
    let payload = payload.trim_end_matches('&');
    if payload.is_empty() {
        format!("{field}={signature}")
    } else {
        format!("{payload}&{field}={signature}")
    }
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
