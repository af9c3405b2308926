//! Signing credentials and rotation order.
//!
//! A [`CredentialSet`] is an ordered, immutable list of accepted credentials.
//! The first entry is the primary credential; every other entry is still
//! accepted but deprecated, which lets a credential be rotated without
//! rejecting requests signed under the previous one.
//!
//! Credential values never leave this module in readable form: [`Credential`]
//! has a redacted `Debug` and no `Display`. Logs and responses use the
//! [`CredentialFingerprint`] instead.

use std::fmt;

/// Maximum number of trailing characters exposed by a fingerprint.
const FINGERPRINT_MAX_CHARS: usize = 6;

/// A configured signing secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
}

impl Credential {
    /// Wrap a secret value. Surrounding whitespace is removed.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().trim().to_owned(),
        }
    }

    /// Raw secret bytes, for key derivation only.
    #[must_use]
    pub fn expose_secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Short, non-reversible identifier safe to log.
    #[must_use]
    pub fn fingerprint(&self) -> CredentialFingerprint {
        CredentialFingerprint::of(&self.secret)
    }

    fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// Trailing characters of a credential, used for audit logging.
///
/// At most six characters and at most a quarter of the credential are kept,
/// so short credentials are never exposed in full.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct CredentialFingerprint(String);

impl CredentialFingerprint {
    fn of(secret: &str) -> Self {
        let total = secret.chars().count();
        let keep = FINGERPRINT_MAX_CHARS.min(total / 4);
        let tail: String = secret.chars().skip(total - keep).collect();
        Self(format!("…{tail}"))
    }

    /// The fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, immutable set of accepted credentials. Index 0 is primary.
///
/// # Examples
///
/// ```
/// use tgauth_verify::credentials::{Credential, CredentialSet};
///
/// let set = CredentialSet::from_primary_and_csv(Some("new-token"), "old-token, ,new-token");
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.primary(), Some(&Credential::new("new-token")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    credentials: Vec<Credential>,
}

impl CredentialSet {
    /// Build a set from credentials in priority order.
    ///
    /// Empty credentials and repeated values are dropped; the first occurrence
    /// keeps its position.
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        let mut deduped: Vec<Credential> = Vec::new();
        for credential in credentials {
            if !credential.is_empty() && !deduped.contains(&credential) {
                deduped.push(credential);
            }
        }
        Self {
            credentials: deduped,
        }
    }

    /// Build a set from an optional primary value followed by a
    /// comma-separated list of rotation values.
    pub fn from_primary_and_csv(primary: Option<&str>, rotation_csv: &str) -> Self {
        let rotation = rotation_csv.split(',').map(Credential::new);
        Self::new(primary.map(Credential::new).into_iter().chain(rotation))
    }

    /// The primary credential, if any.
    #[must_use]
    pub fn primary(&self) -> Option<&Credential> {
        self.credentials.first()
    }

    /// Iterate credentials in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }

    /// Number of accepted credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Returns `true` when no credential is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Fingerprints of all credentials, in priority order.
    #[must_use]
    pub fn fingerprints(&self) -> Vec<CredentialFingerprint> {
        self.credentials.iter().map(Credential::fingerprint).collect()
    }
}
