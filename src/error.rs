use thiserror::Error;

/// Result type for pdcrypt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the pdcrypt library
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid master secret or policy. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Any failure while producing ciphertext. The operation was not performed.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Malformed ciphertext, payload JSON or unknown category
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// HMAC or AEAD tag verification failure
    #[error("Security error: {0}")]
    Security(String),

    /// Errors related to JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors related to I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors reported by a record or file store
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Returns true for integrity failures (tampering or corruption)
    pub fn is_security(&self) -> bool {
        matches!(self, Error::Security(_))
    }

    /// Returns true for malformed-input failures during decryption
    pub fn is_decryption(&self) -> bool {
        matches!(self, Error::Decryption(_))
    }
}
