//! Error types for Secretary core operations.
//!
//! Store and crypto failures surface as `SecretaryError`. The command
//! processor is the boundary where they are turned into tagged responses.

use thiserror::Error;

/// Result type alias for Secretary operations.
pub type Result<T> = std::result::Result<T, SecretaryError>;

/// Core error type for Secretary operations.
#[derive(Debug, Error)]
pub enum SecretaryError {
    /// Authentication failed while decrypting: wrong key or tampered data
    #[error("Decryption failed: incorrect passphrase or corrupted data")]
    IncorrectKey,

    /// Encryption or key derivation error
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// The exchange document is malformed or inconsistent
    #[error("Document error: {0}")]
    Document(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
