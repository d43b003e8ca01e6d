//! Tag and field-definition queries.

use std::path::Path;

use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use super::row::{FIELD_COLUMNS, TAG_COLUMNS};
use super::types::{Deletion, FieldDef, Tag, Vocabulary};
use super::Store;
use crate::error::{Result, SecretaryError};

#[derive(Debug, Serialize, Deserialize)]
struct TagCsv {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldCsv {
    name: String,
    #[serde(default)]
    sensitive: bool,
}

/// Result of a vocabulary CSV import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

impl Store {
    pub fn tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tag_table ORDER BY name COLLATE NOCASE",
            TAG_COLUMNS
        ))?;
        let rows = stmt.query_map([], |row| Tag::try_from(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn fields(&self) -> Result<Vec<FieldDef>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM field_table ORDER BY name COLLATE NOCASE",
            FIELD_COLUMNS
        ))?;
        let rows = stmt.query_map([], |row| FieldDef::try_from(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Tags whose name contains `pattern`, ignoring case.
    pub fn search_tags(&self, pattern: &str) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tag_table WHERE instr(fold_case(name), ?) > 0 ORDER BY name COLLATE NOCASE",
            TAG_COLUMNS
        ))?;
        let rows = stmt.query_map([pattern.to_lowercase()], |row| Tag::try_from(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Field definitions whose name contains `pattern`, ignoring case.
    pub fn search_fields(&self, pattern: &str) -> Result<Vec<FieldDef>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM field_table WHERE instr(fold_case(name), ?) > 0 ORDER BY name COLLATE NOCASE",
            FIELD_COLUMNS
        ))?;
        let rows = stmt.query_map([pattern.to_lowercase()], |row| FieldDef::try_from(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn vocabulary_count(&self, vocabulary: Vocabulary) -> Result<i64> {
        Ok(self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", vocabulary.table()),
            [],
            |row| row.get(0),
        )?)
    }

    pub fn vocabulary_contains(&self, vocabulary: Vocabulary, name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT id FROM {} WHERE name = ?", vocabulary.table()),
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM tag_table WHERE name = ?", TAG_COLUMNS),
                [name],
                |row| Tag::try_from(row),
            )
            .optional()?)
    }

    pub fn field_by_name(&self, name: &str) -> Result<Option<FieldDef>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM field_table WHERE name = ?", FIELD_COLUMNS),
                [name],
                |row| FieldDef::try_from(row),
            )
            .optional()?)
    }

    pub fn field_by_id(&self, id: i64) -> Result<Option<FieldDef>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM field_table WHERE id = ?", FIELD_COLUMNS),
                [id],
                |row| FieldDef::try_from(row),
            )
            .optional()?)
    }

    pub fn add_tag(&mut self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO tag_table (name, count) VALUES (?, 0)", [name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn add_field(&mut self, name: &str, sensitive: bool) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO field_table (name, sensitive, count) VALUES (?, ?, 0)",
            (name, sensitive),
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Rename a vocabulary entry; returns the number of rows changed.
    pub fn rename_vocabulary(
        &mut self,
        vocabulary: Vocabulary,
        old_name: &str,
        new_name: &str,
    ) -> Result<usize> {
        Ok(self.conn.execute(
            &format!("UPDATE {} SET name = ? WHERE name = ?", vocabulary.table()),
            (new_name, old_name),
        )?)
    }

    /// Usage count of `name` after recomputing counters, `None` if undefined.
    pub fn usage_count(&self, vocabulary: Vocabulary, name: &str) -> Result<Option<i64>> {
        self.update_counters()?;
        Ok(self
            .conn
            .query_row(
                &format!("SELECT count FROM {} WHERE name = ?", vocabulary.table()),
                [name],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Delete `name` only if nothing links to it.
    pub fn delete_vocabulary(&mut self, vocabulary: Vocabulary, name: &str) -> Result<Deletion> {
        match self.usage_count(vocabulary, name)? {
            None => Ok(Deletion::Missing),
            Some(count) if count > 0 => Ok(Deletion::InUse(count)),
            Some(_) => {
                self.conn.execute(
                    &format!("DELETE FROM {} WHERE name = ?", vocabulary.table()),
                    [name],
                )?;
                Ok(Deletion::Deleted)
            }
        }
    }

    /// Write the vocabulary as CSV (`name` or `name,sensitive`).
    pub fn export_vocabulary(&self, vocabulary: Vocabulary, path: &Path) -> Result<usize> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let written = match vocabulary {
            Vocabulary::Tags => {
                let tags = self.tags()?;
                for tag in &tags {
                    writer.serialize(TagCsv {
                        name: tag.name.clone(),
                    })?;
                }
                tags.len()
            }
            Vocabulary::Fields => {
                let fields = self.fields()?;
                for field in &fields {
                    writer.serialize(FieldCsv {
                        name: field.name.clone(),
                        sensitive: field.sensitive,
                    })?;
                }
                fields.len()
            }
        };
        let bytes = writer
            .into_inner()
            .map_err(|e| SecretaryError::Storage(format!("CSV flush failed: {}", e)))?;
        crate::fs::write_atomic(path, &bytes)?;
        Ok(written)
    }

    /// Add every name from a CSV file that is not already defined.
    pub fn import_vocabulary(&mut self, vocabulary: Vocabulary, path: &Path) -> Result<ImportSummary> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut summary = ImportSummary::default();
        let tx = self.conn.transaction()?;

        match vocabulary {
            Vocabulary::Tags => {
                for record in reader.deserialize::<TagCsv>() {
                    let record = record?;
                    let name = record.name.trim();
                    if name.is_empty() {
                        summary.skipped += 1;
                        continue;
                    }
                    let inserted = tx.execute(
                        "INSERT OR IGNORE INTO tag_table (name, count) VALUES (?, 0)",
                        [name],
                    )?;
                    if inserted == 0 {
                        summary.skipped += 1;
                    } else {
                        summary.imported += 1;
                    }
                }
            }
            Vocabulary::Fields => {
                for record in reader.deserialize::<FieldCsv>() {
                    let record = record?;
                    let name = record.name.trim();
                    if name.is_empty() {
                        summary.skipped += 1;
                        continue;
                    }
                    let inserted = tx.execute(
                        "INSERT OR IGNORE INTO field_table (name, sensitive, count) VALUES (?, ?, 0)",
                        (name, record.sensitive),
                    )?;
                    if inserted == 0 {
                        summary.skipped += 1;
                    } else {
                        summary.imported += 1;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(summary)
    }
}
