//! Record types for the five store tables.

use std::fmt;

use chrono::{DateTime, Local};

/// Defined tag name with its derived usage count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub count: i64,
}

/// Defined field name; values of sensitive fields are stored encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub id: i64,
    pub name: String,
    pub sensitive: bool,
    pub count: i64,
}

/// The atomic secret record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    /// Last-modified time, unix seconds.
    pub timestamp: i64,
    pub note: String,
}

impl Item {
    pub fn modified(&self) -> String {
        format_timestamp(self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTag {
    pub id: i64,
    pub tag_id: i64,
    pub item_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemField {
    pub id: i64,
    pub field_id: i64,
    pub item_id: i64,
    pub value: String,
    pub encrypted: bool,
}

/// A field value joined with its definition, as shown on an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub id: i64,
    pub field_id: i64,
    pub name: String,
    pub value: String,
    pub encrypted: bool,
    pub sensitive: bool,
}

/// A field value ready to be stored; `value` is already ciphertext when
/// `encrypted` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFieldValue {
    pub field_id: i64,
    pub value: String,
    pub encrypted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub timestamp: i64,
    pub note: String,
    pub tag_ids: Vec<i64>,
    pub fields: Vec<NewFieldValue>,
}

/// Edits applied to an existing item in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub note: Option<String>,
    pub add_tag_ids: Vec<i64>,
    pub add_fields: Vec<NewFieldValue>,
    /// Field definitions whose values are removed from the item.
    pub remove_field_ids: Vec<i64>,
    pub timestamp: i64,
}

/// Outcome of a guarded vocabulary delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    InUse(i64),
    Missing,
}

/// The two vocabulary tables share list/search/rename/delete semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    Tags,
    Fields,
}

impl Vocabulary {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Vocabulary::Tags => "tag_table",
            Vocabulary::Fields => "field_table",
        }
    }

    /// Singular noun used in user-facing messages.
    pub fn noun(self) -> &'static str {
        match self {
            Vocabulary::Tags => "tag",
            Vocabulary::Fields => "field",
        }
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// Which parts of an item a cross-field search looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchScopes {
    pub name: bool,
    pub tags: bool,
    pub field_names: bool,
    pub field_values: bool,
    pub note: bool,
}

impl SearchScopes {
    pub fn name_only() -> Self {
        Self {
            name: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.name || self.tags || self.field_names || self.field_values || self.note)
    }

    /// Scopes as given, or name-only when none were requested.
    pub fn or_name_only(self) -> Self {
        if self.is_empty() {
            Self::name_only()
        } else {
            self
        }
    }
}

/// Row counts of every table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub tags: i64,
    pub fields: i64,
    pub items: i64,
    pub item_tags: i64,
    pub item_fields: i64,
}

/// Summary shown by `db report`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReport {
    pub path: String,
    pub encrypted: bool,
    pub counts: TableCounts,
    /// Checksum recorded when the store was created, read or written.
    pub recorded_checksum: String,
    pub current_checksum: String,
}

impl StoreReport {
    pub fn unchanged(&self) -> bool {
        self.recorded_checksum == self.current_checksum
    }
}

pub fn format_timestamp(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%d/%b/%Y %H:%M:%S")
            .to_string(),
        None => timestamp.to_string(),
    }
}
