//! Init-data verification policy.
//!
//! This module implements the verification flow:
//!
//! 1. Unwrap the input down to the raw signed string.
//! 2. Locate the provided signature (current field name first, then aliases).
//! 3. Require at least one configured credential.
//! 4. Extract the pairs and build the data check string for every configured
//!    canonical form.
//! 5. Walk the credential × derivation × canonical form matrix in priority
//!    order and stop at the first digest that matches in constant time.
//! 6. Only then decode the claims.
//!
//! Each step is a hard gate. The flow performs no I/O, reads no clock and
//! holds no mutable state, so identical input and configuration always give
//! the identical result and a verifier can be shared freely between threads.
//!
//! The main entry point is [`InitDataVerifier::verify`].

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::canonical::{CanonicalForm, build_data_check_string, decode_value};
use crate::claims::{Claims, ClaimsStatus, DEFAULT_CLAIMS_FIELD, Principal, decode_claims};
use crate::compare::constant_time_eq;
use crate::credentials::{CredentialFingerprint, CredentialSet};
use crate::error::AuthError;
use crate::normalize::normalize_init_data;
use crate::pairs::{DEFAULT_SIGNATURE_FIELDS, Pair, extract_pairs, find_signature};
use crate::signature::{SecretDerivation, compute_signature, derive_secret};

/// Outcome of a verification: the verified payload or the failure reason.
pub type VerificationResult = Result<VerifiedInitData, AuthError>;

/// Tunables of the verification policy.
///
/// Lists are ordered by preference. An empty `canonical_forms` or
/// `derivations` list makes every signature invalid.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierConfig {
    /// Accepted signature field names, current name first.
    pub signature_fields: Vec<String>,
    /// Name of the field carrying the identity claims.
    pub claims_field: String,
    /// Canonical forms to try, in order.
    pub canonical_forms: Vec<CanonicalForm>,
    /// Secret derivations to try for each credential, in order.
    pub derivations: Vec<SecretDerivation>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            signature_fields: DEFAULT_SIGNATURE_FIELDS.iter().map(|&f| f.to_owned()).collect(),
            claims_field: DEFAULT_CLAIMS_FIELD.to_owned(),
            canonical_forms: CanonicalForm::ALL.to_vec(),
            derivations: vec![SecretDerivation::Sha256],
        }
    }
}

/// A payload whose signature has been verified.
#[derive(Debug, Clone)]
pub struct VerifiedInitData {
    /// Decoded identity claims, when present and well-formed.
    pub claims: Option<Claims>,
    /// Whether the claims field was decoded, absent or malformed.
    pub claims_status: ClaimsStatus,
    /// Fingerprint of the credential that produced the matching digest.
    pub fingerprint: CredentialFingerprint,
    /// Position of that credential in the set; `0` is the primary.
    pub credential_index: usize,
    /// Canonical form that produced the matching digest.
    pub form: CanonicalForm,
    /// Secret derivation that produced the matching digest.
    pub derivation: SecretDerivation,
    /// Every signed field, percent-decoded.
    pub fields: BTreeMap<String, String>,
}

impl VerifiedInitData {
    /// The principal described by the claims, if any.
    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        self.claims.as_ref().and_then(Claims::principal)
    }

    /// Whether the primary credential matched.
    #[must_use]
    pub fn is_primary_credential(&self) -> bool {
        self.credential_index == 0
    }

    /// A signed field, percent-decoded.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The `auth_date` field as Unix seconds.
    #[must_use]
    pub fn auth_date(&self) -> Option<i64> {
        self.field("auth_date")?.parse().ok()
    }
}

/// Verifier bound to an immutable credential set and configuration.
///
/// Construct it once at startup and share it (for example behind an `Arc`).
#[derive(Debug, Clone)]
pub struct InitDataVerifier {
    credentials: CredentialSet,
    config: VerifierConfig,
}

impl InitDataVerifier {
    /// Create a verifier.
    #[must_use]
    pub fn new(credentials: CredentialSet, config: VerifierConfig) -> Self {
        Self {
            credentials,
            config,
        }
    }

    /// Create a verifier with the default configuration.
    #[must_use]
    pub fn with_defaults(credentials: CredentialSet) -> Self {
        Self::new(credentials, VerifierConfig::default())
    }

    /// The accepted credentials.
    #[must_use]
    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify a signed payload, possibly wrapped in a URL or `initData`
    /// parameter.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if:
    /// - nothing usable remains after unwrapping the input
    /// - no accepted signature field is present
    /// - no credential is configured
    /// - no credential, derivation and canonical form reproduces the signature
    pub fn verify(&self, input: &str) -> VerificationResult {
        verify_with(input, &self.credentials, &self.config)
    }
}

/// Verify `input` against `credentials` using the default configuration.
///
/// # Errors
///
/// See [`InitDataVerifier::verify`].
///
/// # Examples
///
/// ```
/// use tgauth_verify::{AuthError, CredentialSet, verify};
///
/// let credentials = CredentialSet::from_primary_and_csv(Some("secret"), "");
/// assert_eq!(verify("", &credentials).unwrap_err(), AuthError::MissingInput);
/// assert_eq!(verify("a=1", &credentials).unwrap_err(), AuthError::MissingSignature);
/// ```
pub fn verify(input: &str, credentials: &CredentialSet) -> VerificationResult {
    verify_with(input, credentials, &VerifierConfig::default())
}

/// Identifies the matrix cell that reproduced the signature.
struct Match {
    credential_index: usize,
    fingerprint: CredentialFingerprint,
    derivation: SecretDerivation,
    form: CanonicalForm,
}

fn verify_with(
    input: &str,
    credentials: &CredentialSet,
    config: &VerifierConfig,
) -> VerificationResult {
    let raw = normalize_init_data(input);
    if raw.is_empty() {
        debug!("no init data after normalization");
        return Err(AuthError::MissingInput);
    }

    let Some(provided) = find_signature(raw, &config.signature_fields) else {
        debug!(fields = ?config.signature_fields, "no signature field in init data");
        return Err(AuthError::MissingSignature);
    };

    if credentials.is_empty() {
        debug!("no credential configured");
        return Err(AuthError::MissingCredential);
    }

    // Non-hex input decodes to nothing and can never match.
    let provided_digest = hex::decode(provided.value).unwrap_or_default();

    let pairs = extract_pairs(raw, &config.signature_fields);
    let candidates: Vec<(CanonicalForm, String)> = config
        .canonical_forms
        .iter()
        .map(|&form| (form, build_data_check_string(&pairs, form)))
        .collect();

    debug!(
        signature_field = provided.key,
        pairs = pairs.len(),
        forms = candidates.len(),
        credentials = credentials.len(),
        "verifying init data signature"
    );

    let Some(matched) = find_match(credentials, config, &candidates, &provided_digest) else {
        debug!("no credential and canonical form reproduces the signature");
        return Err(AuthError::InvalidSignature);
    };

    report_fallbacks(&matched, config);

    let (claims, claims_status) = decode_claims(&pairs, &config.claims_field);

    Ok(VerifiedInitData {
        claims,
        claims_status,
        fingerprint: matched.fingerprint,
        credential_index: matched.credential_index,
        form: matched.form,
        derivation: matched.derivation,
        fields: decoded_fields(&pairs),
    })
}

/// Walk credentials, then derivations, then canonical forms; first match wins.
fn find_match(
    credentials: &CredentialSet,
    config: &VerifierConfig,
    candidates: &[(CanonicalForm, String)],
    provided_digest: &[u8],
) -> Option<Match> {
    for (credential_index, credential) in credentials.iter().enumerate() {
        for &derivation in &config.derivations {
            let secret = derive_secret(credential, derivation);
            for (form, data_check_string) in candidates {
                let digest = compute_signature(&secret, data_check_string);
                if constant_time_eq(&digest, provided_digest) {
                    return Some(Match {
                        credential_index,
                        fingerprint: credential.fingerprint(),
                        derivation,
                        form: *form,
                    });
                }
            }
        }
    }
    None
}

fn report_fallbacks(matched: &Match, config: &VerifierConfig) {
    debug!(
        credential = %matched.fingerprint,
        derivation = %matched.derivation,
        form = %matched.form,
        "init data signature verified"
    );

    if matched.credential_index > 0 {
        warn!(
            credential = %matched.fingerprint,
            credential_index = matched.credential_index,
            "init data verified with a deprecated credential"
        );
    }
    if config.derivations.first() != Some(&matched.derivation) {
        warn!(
            derivation = %matched.derivation,
            "init data verified with a fallback secret derivation"
        );
    }
    if config.canonical_forms.first() != Some(&matched.form) {
        warn!(form = %matched.form, "init data verified with a fallback canonical form");
    }
}

fn decoded_fields(pairs: &[Pair<'_>]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|pair| (pair.key.to_owned(), decode_value(pair.value).into_owned()))
        .collect()
}
