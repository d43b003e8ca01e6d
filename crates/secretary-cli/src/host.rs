//! Terminal implementation of the interpreter's host callbacks.

use std::io::{self, IsTerminal};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use dialoguer::{Confirm, Password};
use secrecy::{ExposeSecret, SecretString};
use secretary_core::crypto::CryptKey;
use secretary_core::{Host, Result, SecretaryError};

pub const PASSPHRASE_ENV: &str = "SECRETARY_PASSPHRASE";

pub struct ConsoleHost {
    interactive: bool,
    editor: Option<String>,
}

impl ConsoleHost {
    pub fn new(editor: Option<String>) -> Self {
        Self {
            interactive: io::stdin().is_terminal() && io::stderr().is_terminal(),
            editor,
        }
    }
}

/// Passphrase from SECRETARY_PASSPHRASE, or a prompt when attached to a terminal.
///
/// An empty answer means the store is not encrypted.
fn read_passphrase(interactive: bool) -> anyhow::Result<Option<SecretString>> {
    if let Ok(value) = std::env::var(PASSPHRASE_ENV) {
        if !value.trim().is_empty() {
            return Ok(Some(SecretString::from(value)));
        }
    }
    if !interactive {
        tracing::warn!("no passphrase available; the database will not be encrypted");
        return Ok(None);
    }
    let passphrase = Password::new()
        .with_prompt("Passphrase (empty for none)")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read passphrase: {}", e))?;
    if passphrase.is_empty() {
        return Ok(None);
    }
    Ok(Some(SecretString::from(passphrase)))
}

/// Open the editor on `text` and return what was saved.
fn edit_in_editor(editor: &str, text: &str) -> anyhow::Result<String> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("System time error: {}", e))?
        .as_nanos();
    let filename = format!("secretary_note_{}_{}.txt", std::process::id(), nanos);
    let path = std::env::temp_dir().join(filename);

    std::fs::write(&path, text)
        .map_err(|e| anyhow::anyhow!("Failed to create temp file: {}", e))?;

    let status = Command::new(editor)
        .arg(&path)
        .status()
        .map_err(|e| anyhow::anyhow!("Failed to launch editor: {}", e))?;
    if !status.success() {
        let _ = std::fs::remove_file(&path);
        return Err(anyhow::anyhow!("Editor exited with failure"));
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read temp file: {}", e))?;
    let _ = std::fs::remove_file(&path);
    Ok(contents.trim_end().to_string())
}

impl Host for ConsoleHost {
    fn confirm(&mut self, message: &str) -> bool {
        if !self.interactive {
            return false;
        }
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .unwrap_or(false)
    }

    fn acquire_key(&mut self) -> Result<Option<CryptKey>> {
        let passphrase = read_passphrase(self.interactive)
            .map_err(|e| SecretaryError::InvalidInput(e.to_string()))?;
        passphrase
            .map(|secret| CryptKey::from_passphrase(secret.expose_secret()))
            .transpose()
    }

    fn edit_text(&mut self, text: &str) -> Result<Option<String>> {
        let Some(editor) = self
            .editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok())
        else {
            return Err(SecretaryError::InvalidInput(
                "$EDITOR is not set; use -note instead".to_string(),
            ));
        };
        let edited =
            edit_in_editor(&editor, text).map_err(|e| SecretaryError::InvalidInput(e.to_string()))?;
        Ok((edited != text.trim_end()).then_some(edited))
    }
}
