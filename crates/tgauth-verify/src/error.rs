//! Error types for init-data verification.
//!
//! All verification failures are represented by [`AuthError`]. Every variant is
//! terminal: a failed verification is never retried. Problems with the claims
//! payload are not errors at all, they are reported on the successful result
//! through [`ClaimsStatus`](crate::claims::ClaimsStatus).

/// Reasons a signed payload can fail verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Nothing usable was left after unwrapping the input.
    #[error("Missing init data")]
    MissingInput,

    /// None of the accepted signature fields is present in the payload.
    #[error("Missing signature field")]
    MissingSignature,

    /// The verifier was constructed without any credential.
    #[error("No signing credential configured")]
    MissingCredential,

    /// No credential and canonical form combination reproduces the signature.
    #[error("Signature does not match")]
    InvalidSignature,
}

impl AuthError {
    /// Stable, machine-readable reason code for responses and audit logs.
    #[must_use]
    pub fn reason_code(self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::MissingSignature => "missing_signature",
            Self::MissingCredential => "missing_credential",
            Self::InvalidSignature => "invalid_signature",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_expose_distinct_reason_codes() {
        let codes = [
            AuthError::MissingInput.reason_code(),
            AuthError::MissingSignature.reason_code(),
            AuthError::MissingCredential.reason_code(),
            AuthError::InvalidSignature.reason_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(AuthError::InvalidSignature.reason_code(), "invalid_signature");
    }

    #[test]
    fn test_should_not_leak_detail_in_display() {
        assert_eq!(
            AuthError::InvalidSignature.to_string(),
            "Signature does not match"
        );
    }
}
