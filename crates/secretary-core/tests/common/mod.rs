#![allow(dead_code)]

use std::collections::VecDeque;

use once_cell::sync::Lazy;
use secretary_core::crypto::CryptKey;
use secretary_core::{Host, Result};

pub const PASSPHRASE: &str = "correct horse battery staple";

/// Derived once per test binary; Argon2id is slow in debug builds.
pub static KEY: Lazy<CryptKey> =
    Lazy::new(|| CryptKey::from_passphrase(PASSPHRASE).expect("key derivation should succeed"));

pub static OTHER_KEY: Lazy<CryptKey> =
    Lazy::new(|| CryptKey::from_passphrase("not the passphrase").expect("key derivation should succeed"));

/// Host that supplies a fixed key and answers confirmations from a script.
#[derive(Default)]
pub struct ScriptedHost {
    pub key: Option<CryptKey>,
    pub answers: VecDeque<bool>,
    pub edits: VecDeque<String>,
}

impl ScriptedHost {
    pub fn with_key(key: &CryptKey) -> Self {
        Self {
            key: Some(key.clone()),
            ..Self::default()
        }
    }

    pub fn answering(mut self, answers: &[bool]) -> Self {
        self.answers.extend(answers.iter().copied());
        self
    }
}

impl Host for ScriptedHost {
    fn confirm(&mut self, _message: &str) -> bool {
        self.answers.pop_front().unwrap_or(false)
    }

    fn acquire_key(&mut self) -> Result<Option<CryptKey>> {
        Ok(self.key.clone())
    }

    fn edit_text(&mut self, _text: &str) -> Result<Option<String>> {
        Ok(self.edits.pop_front())
    }
}
