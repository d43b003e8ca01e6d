//! Canonical text dump of the relational state.
//!
//! One `INSERT` statement per row, tables in a fixed order and rows ordered
//! by id, so equal states always dump to equal text.

use std::fmt::Write;

use rusqlite::types::ValueRef;

use super::schema::TABLES;
use super::Store;
use crate::error::Result;

fn push_value(out: &mut String, value: ValueRef<'_>) {
    match value {
        ValueRef::Null => out.push_str("NULL"),
        ValueRef::Integer(i) => {
            let _ = write!(out, "{}", i);
        }
        ValueRef::Real(f) => {
            let _ = write!(out, "{}", f);
        }
        ValueRef::Text(bytes) => {
            out.push('\'');
            out.push_str(&String::from_utf8_lossy(bytes).replace('\'', "''"));
            out.push('\'');
        }
        ValueRef::Blob(bytes) => {
            out.push_str("X'");
            for byte in bytes {
                let _ = write!(out, "{:02x}", byte);
            }
            out.push('\'');
        }
    }
}

impl Store {
    pub fn dump(&self) -> Result<String> {
        let mut out = String::new();
        for table in TABLES {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT * FROM {} ORDER BY id", table))?;
            let columns = stmt.column_count();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let _ = write!(out, "INSERT INTO \"{}\" VALUES(", table);
                for index in 0..columns {
                    if index > 0 {
                        out.push(',');
                    }
                    push_value(&mut out, row.get_ref(index)?);
                }
                out.push_str(");\n");
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dump_quotes_text() {
        let dir = tempdir().unwrap();
        let mut store = Store::create(&dir.path().join("vault.db"), None).unwrap();
        store.add_tag("joe's").unwrap();

        assert_eq!(
            store.dump().unwrap(),
            "INSERT INTO \"tag_table\" VALUES(1,'joe''s',0);\n"
        );
    }

    #[test]
    fn test_empty_store_dumps_nothing() {
        let dir = tempdir().unwrap();
        let store = Store::create(&dir.path().join("vault.db"), None).unwrap();
        assert!(store.dump().unwrap().is_empty());
    }
}
