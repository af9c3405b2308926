//! Signed init-data verification for tgauth.
//!
//! This crate verifies that an opaque query string (the "init data" a client
//! hands over on every request) was produced and signed by the issuing
//! platform, and only then decodes the identity claims it carries.
//!
//! # Overview
//!
//! The issuing platform signs a payload by sorting its `key=value` pairs,
//! joining them with newlines into a *data check string*, and computing an
//! HMAC-SHA256 over it with a secret derived from the bot credential. The hex
//! digest travels inside the payload itself (in the `hash` field). Verification
//! recomputes that digest and compares it in constant time.
//!
//! Different client/server pairings have historically disagreed on the exact
//! bytes that were signed, so the verifier tries an ordered list of canonical
//! forms and, for rotation, an ordered list of credentials. The first
//! combination that matches wins.
//!
//! # Usage
//!
//! ```rust
//! use tgauth_verify::credentials::{Credential, CredentialSet};
//! use tgauth_verify::signature::sign_init_data;
//! use tgauth_verify::verify;
//!
//! let credentials = CredentialSet::new(vec![Credential::new("123456:bot-token")]);
//! let signed = sign_init_data(
//!     "user=%7B%22id%22%3A1%7D&auth_date=1700000000",
//!     credentials.primary().unwrap(),
//! );
//!
//! let verified = verify(&signed, &credentials).unwrap();
//! assert_eq!(verified.claims.unwrap().get("id"), Some(&serde_json::json!(1)));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Data check string construction for each canonical form
//! - [`claims`] - Identity claims decoding and principal extraction
//! - [`compare`] - Constant-time digest comparison
//! - [`credentials`] - Credential set, rotation order and fingerprints
//! - [`error`] - Verification failure reasons
//! - [`normalize`] - Unwrapping of transport wrappers around the signed string
//! - [`pairs`] - Pair extraction and signature lookup
//! - [`signature`] - Secret derivation and HMAC-SHA256 signing
//! - [`verify`] - The verification policy tying everything together

pub mod canonical;
pub mod claims;
pub mod compare;
pub mod credentials;
pub mod error;
pub mod normalize;
pub mod pairs;
pub mod signature;
pub mod verify;

pub use canonical::CanonicalForm;
pub use claims::{Claims, ClaimsStatus, Principal};
pub use credentials::{Credential, CredentialFingerprint, CredentialSet};
pub use error::AuthError;
pub use signature::SecretDerivation;
pub use verify::{InitDataVerifier, VerificationResult, VerifiedInitData, VerifierConfig, verify};
