//! Relational schema for the in-memory store.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use crate::error::Result;

const SCHEMA: &str = r#"
    CREATE TABLE tag_table (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        count INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE field_table (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        sensitive INTEGER NOT NULL DEFAULT 0,
        count INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        note TEXT NOT NULL DEFAULT ''
    );

    -- Item-Tag links (many-to-many)
    CREATE TABLE item_tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tag_id INTEGER NOT NULL,
        item_id INTEGER NOT NULL,

        UNIQUE (tag_id, item_id),
        FOREIGN KEY (tag_id) REFERENCES tag_table(id),
        FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
    );

    -- Field values attached to items
    CREATE TABLE item_fields (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        field_id INTEGER NOT NULL,
        item_id INTEGER NOT NULL,
        value TEXT NOT NULL,
        encrypted INTEGER NOT NULL DEFAULT 0,

        FOREIGN KEY (field_id) REFERENCES field_table(id),
        FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
    );

    CREATE INDEX item_tags_item ON item_tags (item_id);
    CREATE INDEX item_fields_item ON item_fields (item_id);
"#;

/// Tables every store must contain, in dump order.
pub(crate) const TABLES: [&str; 5] = ["tag_table", "field_table", "items", "item_tags", "item_fields"];

/// Open an empty in-memory database with the store schema.
pub(crate) fn open_empty() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// Per-connection setup: foreign keys and the `fold_case` search function.
///
/// SQLite's `lower()` only folds ASCII, so searches compare both sides
/// through `fold_case`, which applies Rust's Unicode lowercasing.
pub(crate) fn prepare(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )?;
    Ok(())
}

/// Check that a restored database has every store table.
pub(crate) fn missing_tables(conn: &Connection) -> Result<Vec<&'static str>> {
    let mut missing = Vec::new();
    for table in TABLES {
        let found: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table],
            |row| row.get(0),
        )?;
        if found == 0 {
            missing.push(table);
        }
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_all_tables() {
        let conn = open_empty().unwrap();
        assert!(missing_tables(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_fold_case_is_unicode_aware() {
        let conn = open_empty().unwrap();
        let folded: String = conn
            .query_row("SELECT fold_case('ÉLAN Straße')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "élan straße");
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_empty().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
