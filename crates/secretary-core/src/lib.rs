//! # Secretary Core
//!
//! Core library for Secretary, a passphrase-protected store of secrets
//! driven by a small command language.
//!
//! This crate holds the interpreter and the storage engine, independent of
//! any terminal front end.
//!
//! ## Architecture
//!
//! - **lexer** / **parser**: command language and session state
//! - **command**: the command processor and its tagged responses
//! - **store**: in-memory SQLite store, exchange document, checksum
//! - **crypto**: Argon2id key derivation and AES-256-GCM
//! - **fs**: atomic writes with a single timestamped backup

pub mod command;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod lexer;
pub mod parser;
pub mod store;
pub mod trace;

pub use command::{CommandProcessor, Host, Payload, Response, Severity};
pub use error::{Result, SecretaryError};
pub use parser::{Parser, SessionConfig};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
