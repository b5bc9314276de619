//! Error types for GatePass Core

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// GatePass Core errors
///
/// Token verification never produces one of these; rejected tokens are
/// reported through [`crate::token::Verification`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Record store or secret store failure
    #[error("Storage error: {0}")]
    Storage(#[from] gatepass_storage_sqlite::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Config(String),

    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the embedded store could not be opened or queried
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Storage(gatepass_storage_sqlite::Error::StorageUnavailable(_))
        )
    }
}
