//! Configuration management for tgauth.
//!
//! All configuration is driven by environment variables and read once at
//! startup. The resulting [`AuthConfig`] is immutable.

use std::str::FromStr;

use serde::Serializer;
use tgauth_http::AuthHttpConfig;
use tgauth_verify::{CanonicalForm, CredentialSet, InitDataVerifier, SecretDerivation, VerifierConfig};
use tracing::debug;

use crate::error::{TgAuthError, TgAuthResult};

/// Global configuration for tgauth.
///
/// Credentials are serialized and debug-printed as fingerprints only.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Bind address for the gateway.
    pub gateway_listen: String,
    /// Log level.
    pub log_level: String,
    /// Accepted credentials, primary first.
    #[serde(serialize_with = "serialize_fingerprints")]
    pub credentials: CredentialSet,
    /// Verification policy settings.
    pub verifier: VerifierConfig,
    /// Longest init data, in bytes, passed on to the verifier.
    pub max_input_bytes: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            credentials: CredentialSet::default(),
            verifier: VerifierConfig::default(),
            max_input_bytes: AuthHttpConfig::default().max_input_bytes,
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`TgAuthError::Config`] when a variable holds an unknown
    /// canonical form or derivation, an empty list, or an invalid number.
    pub fn from_env() -> TgAuthResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`AuthConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TgAuthResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        let primary = lookup("TELEGRAM_BOT_TOKEN");
        let rotation = lookup("TELEGRAM_BOT_TOKENS_CSV").unwrap_or_default();
        config.credentials = CredentialSet::from_primary_and_csv(primary.as_deref(), &rotation);

        if let Some(v) = lookup("AUTH_SIGNATURE_FIELDS") {
            config.verifier.signature_fields =
                parse_list::<String>("AUTH_SIGNATURE_FIELDS", &v)?;
        }
        if let Some(v) = lookup("AUTH_CLAIMS_FIELD") {
            let field = v.trim();
            if field.is_empty() {
                return Err(TgAuthError::Config("AUTH_CLAIMS_FIELD is empty".to_owned()));
            }
            config.verifier.claims_field = field.to_owned();
        }
        if let Some(v) = lookup("AUTH_CANONICAL_FORMS") {
            config.verifier.canonical_forms = parse_list::<CanonicalForm>("AUTH_CANONICAL_FORMS", &v)?;
        }
        if let Some(v) = lookup("AUTH_SECRET_DERIVATIONS") {
            config.verifier.derivations =
                parse_list::<SecretDerivation>("AUTH_SECRET_DERIVATIONS", &v)?;
        }
        if let Some(v) = lookup("AUTH_MAX_INPUT_BYTES") {
            config.max_input_bytes = match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(TgAuthError::Config(format!(
                        "AUTH_MAX_INPUT_BYTES must be a positive integer, got {v:?}"
                    )));
                }
            };
        }

        debug!(
            credentials = config.credentials.len(),
            forms = config.verifier.canonical_forms.len(),
            derivations = config.verifier.derivations.len(),
            "loaded auth configuration"
        );

        Ok(config)
    }

    /// Settings for the verification policy.
    #[must_use]
    pub fn verifier_config(&self) -> VerifierConfig {
        self.verifier.clone()
    }

    /// Accepted credentials, primary first.
    #[must_use]
    pub fn credentials(&self) -> CredentialSet {
        self.credentials.clone()
    }

    /// Build the verifier described by this configuration.
    #[must_use]
    pub fn build_verifier(&self) -> InitDataVerifier {
        InitDataVerifier::new(self.credentials(), self.verifier_config())
    }

    /// HTTP service settings, with the configured init data cap.
    #[must_use]
    pub fn http_config(&self) -> AuthHttpConfig {
        AuthHttpConfig {
            max_input_bytes: self.max_input_bytes,
            ..AuthHttpConfig::default()
        }
    }

    /// Fail unless at least one credential is configured.
    ///
    /// # Errors
    ///
    /// Returns [`TgAuthError::Config`] when the credential set is empty.
    pub fn require_credentials(&self) -> TgAuthResult<()> {
        if self.credentials.is_empty() {
            return Err(TgAuthError::Config(
                "no credential configured: set TELEGRAM_BOT_TOKEN or TELEGRAM_BOT_TOKENS_CSV"
                    .to_owned(),
            ));
        }
        Ok(())
    }
}

/// Parse a comma-separated list, skipping blank entries.
fn parse_list<T>(name: &str, value: &str) -> TgAuthResult<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let items = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<T>()
                .map_err(|e| TgAuthError::Config(format!("{name}: {e}")))
        })
        .collect::<TgAuthResult<Vec<T>>>()?;

    if items.is_empty() {
        return Err(TgAuthError::Config(format!("{name} must list at least one entry")));
    }
    Ok(items)
}

fn serialize_fingerprints<S: Serializer>(
    credentials: &CredentialSet,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(credentials.fingerprints())
}
