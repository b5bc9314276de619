//! Error types

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The embedded database could not be opened or queried
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Secret store error
    #[error("Secret store error: {0}")]
    SecretStore(String),

    /// Obfuscated blob could not be decoded
    #[error("Obfuscation error: {0}")]
    Obfuscation(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
