//! Relational store for tags, fields and items.
//!
//! The database lives in an in-memory SQLite connection. On disk it is an
//! exchange document (JSON), encrypted as a whole when a key is configured.
//! Saving goes through [`crate::fs::write_atomic`], so the previous file is
//! always kept as a single timestamped backup.

mod dump;
mod exchange;
mod items;
mod row;
mod schema;
mod types;
mod vocabulary;

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName};

use crate::crypto::CryptKey;
use crate::error::{Result, SecretaryError};

pub use vocabulary::ImportSummary;
pub use exchange::{ExchangeDocument, FieldRecord, FieldValueRecord, ItemRecord, TagRecord};
pub use types::{
    format_timestamp, Deletion, FieldDef, FieldValue, Item, ItemChanges, ItemField, ItemTag,
    NewFieldValue, NewItem, SearchScopes, StoreReport, TableCounts, Tag, Vocabulary,
};

/// An open secrets store bound to a file path.
pub struct Store {
    path: PathBuf,
    conn: Connection,
    key: Option<CryptKey>,
    checksum: String,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("encrypted", &self.key.is_some())
            .field("checksum", &self.checksum)
            .finish()
    }
}

impl Store {
    fn with_connection(path: &Path, key: Option<CryptKey>, conn: Connection) -> Result<Self> {
        let mut store = Self {
            path: path.to_path_buf(),
            conn,
            key,
            checksum: String::new(),
        };
        store.update_counters()?;
        store.checksum = store.checksum()?;
        Ok(store)
    }

    /// Start an empty store for `path`. Nothing is written until [`Store::write`].
    pub fn create(path: &Path, key: Option<CryptKey>) -> Result<Self> {
        if path.exists() {
            return Err(SecretaryError::InvalidInput(format!(
                "database {} already exists",
                path.display()
            )));
        }
        Self::with_connection(path, key, schema::open_empty()?)
    }

    /// Load the store saved at `path`.
    ///
    /// Decryption and decoding happen on a fresh connection; nothing is
    /// returned unless the whole file was read successfully.
    pub fn open(path: &Path, key: Option<CryptKey>) -> Result<Self> {
        if !path.exists() {
            return Err(SecretaryError::NotFound(format!(
                "database {}",
                path.display()
            )));
        }

        let raw = fs::read(path)?;
        let plaintext = match key.as_ref() {
            Some(key) => key.decrypt(&raw)?,
            None => raw,
        };
        let document = ExchangeDocument::from_json(&plaintext)?;
        let store = Self::from_document(path, key, document)?;

        tracing::debug!(path = %path.display(), "database loaded");
        Ok(store)
    }

    /// Build a store from a decoded exchange document.
    pub fn from_document(
        path: &Path,
        key: Option<CryptKey>,
        document: ExchangeDocument,
    ) -> Result<Self> {
        let mut conn = schema::open_empty()?;
        document.populate(&mut conn)?;
        Self::with_connection(path, key, conn)
    }

    /// Persist the store, returning the backup the previous file was moved to.
    pub fn write(&mut self) -> Result<Option<PathBuf>> {
        self.update_counters()?;
        let document = ExchangeDocument::from_store(self)?;
        let plaintext = document.to_json()?;
        let payload = match self.key.as_ref() {
            Some(key) => key.encrypt(&plaintext)?,
            None => plaintext,
        };

        let backup = crate::fs::write_atomic(&self.path, &payload)?;
        self.checksum = self.checksum()?;
        Ok(backup)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> Option<&CryptKey> {
        self.key.as_ref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    /// Checksum recorded at the last create, read or write.
    pub fn recorded_checksum(&self) -> &str {
        &self.checksum
    }

    /// BLAKE3 over the canonical dump of the current state.
    pub fn checksum(&self) -> Result<String> {
        Ok(blake3::hash(self.dump()?.as_bytes()).to_hex().to_string())
    }

    pub fn report(&self) -> Result<StoreReport> {
        self.update_counters()?;
        let report = StoreReport {
            path: self.path.display().to_string(),
            encrypted: self.is_encrypted(),
            counts: self.counts()?,
            recorded_checksum: self.checksum.clone(),
            current_checksum: self.checksum()?,
        };
        if !report.unchanged() {
            tracing::warn!(path = %report.path, "store differs from last saved state");
        }
        Ok(report)
    }

    pub fn counts(&self) -> Result<TableCounts> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?)
        };
        Ok(TableCounts {
            tags: count("tag_table")?,
            fields: count("field_table")?,
            items: count("items")?,
            item_tags: count("item_tags")?,
            item_fields: count("item_fields")?,
        })
    }

    /// Recompute both vocabulary usage counters by scanning the link tables.
    pub fn update_counters(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            UPDATE tag_table SET count =
                (SELECT COUNT(*) FROM item_tags WHERE item_tags.tag_id = tag_table.id);
            UPDATE field_table SET count =
                (SELECT COUNT(*) FROM item_fields WHERE item_fields.field_id = field_table.id);
            "#,
        )?;
        Ok(())
    }

    /// Write the plain exchange document to `path`.
    ///
    /// Field values stay as stored, so sensitive values remain ciphertext.
    pub fn export_document(&self, path: &Path) -> Result<()> {
        self.update_counters()?;
        let json = ExchangeDocument::from_store(self)?.to_json_pretty()?;
        crate::fs::write_atomic(path, &json)?;
        Ok(())
    }

    /// Replace the contents with the exchange document at `path`.
    pub fn import_document(&mut self, path: &Path) -> Result<()> {
        let document = ExchangeDocument::from_json(&fs::read(path)?)?;
        let mut conn = schema::open_empty()?;
        document.populate(&mut conn)?;
        self.conn = conn;
        self.update_counters()
    }

    /// Copy the database to a standalone SQLite file.
    pub fn export_native(&self, path: &Path) -> Result<()> {
        self.update_counters()?;
        self.conn.backup(DatabaseName::Main, path, None)?;
        Ok(())
    }

    /// Replace the contents with a SQLite file produced by [`Store::export_native`].
    pub fn import_native(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(SecretaryError::NotFound(format!("file {}", path.display())));
        }
        let mut conn = Connection::open_in_memory()?;
        conn.restore(DatabaseName::Main, path, None::<fn(Progress)>)?;
        schema::prepare(&conn)?;

        let missing = schema::missing_tables(&conn)?;
        if !missing.is_empty() {
            return Err(SecretaryError::Document(format!(
                "{} is missing tables: {}",
                path.display(),
                missing.join(", ")
            )));
        }

        self.conn = conn;
        self.update_counters()
    }
}
