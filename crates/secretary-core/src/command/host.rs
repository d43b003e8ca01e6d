//! Callbacks the command processor needs from whoever is driving it.

use crate::crypto::CryptKey;
use crate::error::Result;

/// Interaction with the user, supplied by the console, a GUI or a test.
pub trait Host {
    /// Ask a yes/no question; `false` cancels the operation.
    fn confirm(&mut self, message: &str) -> bool;

    /// Obtain the key for a store being created or read.
    ///
    /// `Ok(None)` means no passphrase, so the store is not encrypted.
    fn acquire_key(&mut self) -> Result<Option<CryptKey>>;

    /// Let the user edit `text`; `Ok(None)` leaves it unchanged.
    fn edit_text(&mut self, text: &str) -> Result<Option<String>> {
        let _ = text;
        Ok(None)
    }
}
