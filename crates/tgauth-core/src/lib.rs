//! Configuration and core error types for tgauth.
//!
//! The configuration is read once at startup into an immutable [`AuthConfig`],
//! which then hands the credential set and verifier settings to
//! [`tgauth_verify::InitDataVerifier`].

mod config;
mod error;

pub use config::AuthConfig;
pub use error::{TgAuthError, TgAuthResult};
