use thiserror::Error;

/// Failures of the receipt storage backends.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backend could not be reached or rejected the command.
    #[error("Storage unavailable: {0}")]
    ConnectionError(String),

    /// A stored value or key could not be decoded.
    #[error("Corrupt stored value: {0}")]
    InvalidData(String),

    #[error("Storage error: {0}")]
    Unknown(String),
}
