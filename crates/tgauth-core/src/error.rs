//! Error types for the tgauth core.

/// Core error type for tgauth infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum TgAuthError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for tgauth operations.
pub type TgAuthResult<T> = Result<T, TgAuthError>;
