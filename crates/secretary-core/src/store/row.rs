//! Row conversions for store queries.
//!
//! Column order is fixed by the SELECT lists in this module's consts.

use rusqlite::Row;

use super::types::{FieldDef, FieldValue, Item, ItemField, ItemTag, Tag};

pub(crate) const TAG_COLUMNS: &str = "id, name, count";
pub(crate) const FIELD_COLUMNS: &str = "id, name, sensitive, count";
pub(crate) const ITEM_COLUMNS: &str = "id, name, timestamp, note";

impl TryFrom<&Row<'_>> for Tag {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
            count: row.get(2)?,
        })
    }
}

impl TryFrom<&Row<'_>> for FieldDef {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(FieldDef {
            id: row.get(0)?,
            name: row.get(1)?,
            sensitive: row.get(2)?,
            count: row.get(3)?,
        })
    }
}

impl TryFrom<&Row<'_>> for Item {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Item {
            id: row.get(0)?,
            name: row.get(1)?,
            timestamp: row.get(2)?,
            note: row.get(3)?,
        })
    }
}

impl TryFrom<&Row<'_>> for ItemTag {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ItemTag {
            id: row.get(0)?,
            tag_id: row.get(1)?,
            item_id: row.get(2)?,
        })
    }
}

impl TryFrom<&Row<'_>> for ItemField {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ItemField {
            id: row.get(0)?,
            field_id: row.get(1)?,
            item_id: row.get(2)?,
            value: row.get(3)?,
            encrypted: row.get(4)?,
        })
    }
}

/// Expects `f.id, f.field_id, d.name, f.value, f.encrypted, d.sensitive`.
impl TryFrom<&Row<'_>> for FieldValue {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(FieldValue {
            id: row.get(0)?,
            field_id: row.get(1)?,
            name: row.get(2)?,
            value: row.get(3)?,
            encrypted: row.get(4)?,
            sensitive: row.get(5)?,
        })
    }
}
