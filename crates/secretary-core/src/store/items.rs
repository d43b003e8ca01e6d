//! Items, their tag links and their field values.

use rusqlite::OptionalExtension;

use super::row::ITEM_COLUMNS;
use super::types::{
    FieldValue, Item, ItemChanges, ItemField, ItemTag, NewItem, SearchScopes, Tag,
};
use super::Store;
use crate::error::Result;

const FIELD_VALUE_SELECT: &str = r#"
    SELECT f.id, f.field_id, d.name, f.value, f.encrypted, d.sensitive
    FROM item_fields f
    JOIN field_table d ON d.id = f.field_id
"#;

const ITEM_SEARCH: &str = r#"
    SELECT i.id, i.name, i.timestamp, i.note
    FROM items i
    WHERE (?2 AND instr(fold_case(i.name), ?1) > 0)
       OR (?3 AND EXISTS (
            SELECT 1 FROM item_tags it JOIN tag_table t ON t.id = it.tag_id
            WHERE it.item_id = i.id AND instr(fold_case(t.name), ?1) > 0))
       OR (?4 AND EXISTS (
            SELECT 1 FROM item_fields f JOIN field_table d ON d.id = f.field_id
            WHERE f.item_id = i.id AND instr(fold_case(d.name), ?1) > 0))
       OR (?5 AND EXISTS (
            SELECT 1 FROM item_fields f
            WHERE f.item_id = i.id AND f.encrypted = 0 AND instr(fold_case(f.value), ?1) > 0))
       OR (?6 AND instr(fold_case(i.note), ?1) > 0)
    ORDER BY i.name COLLATE NOCASE, i.id
"#;

impl Store {
    pub fn items(&self) -> Result<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM items ORDER BY name COLLATE NOCASE, id",
            ITEM_COLUMNS
        ))?;
        let rows = stmt.query_map([], |row| Item::try_from(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn item_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?)
    }

    pub fn item(&self, id: i64) -> Result<Option<Item>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS),
                [id],
                |row| Item::try_from(row),
            )
            .optional()?)
    }

    /// Items matching `pattern` in any enabled scope, ignoring case.
    ///
    /// Encrypted field values are never compared.
    pub fn search_items(&self, pattern: &str, scopes: SearchScopes) -> Result<Vec<Item>> {
        let scopes = scopes.or_name_only();
        let mut stmt = self.conn.prepare(ITEM_SEARCH)?;
        let rows = stmt.query_map(
            (
                pattern.to_lowercase(),
                scopes.name,
                scopes.tags,
                scopes.field_names,
                scopes.field_values,
                scopes.note,
            ),
            |row| Item::try_from(row),
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert an item with its tag links and field values.
    pub fn insert_item(&mut self, item: &NewItem) -> Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO items (name, timestamp, note) VALUES (?, ?, ?)",
            (&item.name, item.timestamp, &item.note),
        )?;
        let id = tx.last_insert_rowid();

        for tag_id in &item.tag_ids {
            tx.execute(
                "INSERT OR IGNORE INTO item_tags (tag_id, item_id) VALUES (?, ?)",
                (tag_id, id),
            )?;
        }
        for field in &item.fields {
            tx.execute(
                "INSERT INTO item_fields (field_id, item_id, value, encrypted) VALUES (?, ?, ?, ?)",
                (field.field_id, id, &field.value, field.encrypted),
            )?;
        }

        tx.commit()?;
        Ok(id)
    }

    /// Apply `changes` to item `id`; returns `false` if the item does not exist.
    pub fn update_item(&mut self, id: i64, changes: &ItemChanges) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let touched = tx.execute(
            "UPDATE items SET timestamp = ? WHERE id = ?",
            (changes.timestamp, id),
        )?;
        if touched == 0 {
            return Ok(false);
        }

        if let Some(name) = &changes.name {
            tx.execute("UPDATE items SET name = ? WHERE id = ?", (name, id))?;
        }
        if let Some(note) = &changes.note {
            tx.execute("UPDATE items SET note = ? WHERE id = ?", (note, id))?;
        }
        for field_id in &changes.remove_field_ids {
            tx.execute(
                "DELETE FROM item_fields WHERE item_id = ? AND field_id = ?",
                (id, field_id),
            )?;
        }
        for tag_id in &changes.add_tag_ids {
            tx.execute(
                "INSERT OR IGNORE INTO item_tags (tag_id, item_id) VALUES (?, ?)",
                (tag_id, id),
            )?;
        }
        for field in &changes.add_fields {
            tx.execute(
                "INSERT INTO item_fields (field_id, item_id, value, encrypted) VALUES (?, ?, ?, ?)",
                (field.field_id, id, &field.value, field.encrypted),
            )?;
        }

        tx.commit()?;
        Ok(true)
    }

    pub fn touch_item(&mut self, id: i64, timestamp: i64) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE items SET timestamp = ? WHERE id = ?",
            (timestamp, id),
        )?)
    }

    /// Delete an item; links and values go with it.
    pub fn delete_item(&mut self, id: i64) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM items WHERE id = ?", [id])?)
    }

    /// Duplicate item `id` with `name_prefix` prepended to its name.
    ///
    /// Tag links and field values are copied verbatim, ciphertext included.
    pub fn copy_item(&mut self, id: i64, name_prefix: &str, timestamp: i64) -> Result<Option<i64>> {
        let Some(item) = self.item(id)? else {
            return Ok(None);
        };

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO items (name, timestamp, note) VALUES (?, ?, ?)",
            (format!("{}{}", name_prefix, item.name), timestamp, &item.note),
        )?;
        let copy_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO item_tags (tag_id, item_id) \
             SELECT tag_id, ?1 FROM item_tags WHERE item_id = ?2 ORDER BY id",
            (copy_id, id),
        )?;
        tx.execute(
            "INSERT INTO item_fields (field_id, item_id, value, encrypted) \
             SELECT field_id, ?1, value, encrypted FROM item_fields WHERE item_id = ?2 ORDER BY id",
            (copy_id, id),
        )?;
        tx.commit()?;

        Ok(Some(copy_id))
    }

    /// Tags linked to item `id`, in link order.
    pub fn item_tags(&self, id: i64) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name, t.count FROM item_tags it JOIN tag_table t ON t.id = it.tag_id \
             WHERE it.item_id = ? ORDER BY it.id",
        )?;
        let rows = stmt.query_map([id], |row| Tag::try_from(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Link a tag to an item; returns `false` if it was already linked.
    pub fn link_tag(&mut self, item_id: i64, tag_id: i64) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO item_tags (tag_id, item_id) VALUES (?, ?)",
            (tag_id, item_id),
        )?;
        Ok(inserted > 0)
    }

    pub fn unlink_tag(&mut self, item_id: i64, tag_id: i64) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM item_tags WHERE item_id = ? AND tag_id = ?",
            (item_id, tag_id),
        )?)
    }

    /// Field values of item `id`, in insertion order.
    pub fn item_fields(&self, id: i64) -> Result<Vec<FieldValue>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE f.item_id = ? ORDER BY f.id", FIELD_VALUE_SELECT))?;
        let rows = stmt.query_map([id], |row| FieldValue::try_from(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Field value `value_id`, only if it belongs to item `item_id`.
    pub fn item_field(&self, item_id: i64, value_id: i64) -> Result<Option<FieldValue>> {
        Ok(self
            .conn
            .query_row(
                &format!("{} WHERE f.item_id = ? AND f.id = ?", FIELD_VALUE_SELECT),
                (item_id, value_id),
                |row| FieldValue::try_from(row),
            )
            .optional()?)
    }

    pub fn insert_item_field(
        &mut self,
        item_id: i64,
        field_id: i64,
        value: &str,
        encrypted: bool,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO item_fields (field_id, item_id, value, encrypted) VALUES (?, ?, ?, ?)",
            (field_id, item_id, value, encrypted),
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_item_field(
        &mut self,
        value_id: i64,
        field_id: i64,
        value: &str,
        encrypted: bool,
    ) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE item_fields SET field_id = ?, value = ?, encrypted = ? WHERE id = ?",
            (field_id, value, encrypted, value_id),
        )?)
    }

    pub fn delete_item_field(&mut self, item_id: i64, value_id: i64) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM item_fields WHERE item_id = ? AND id = ?",
            (item_id, value_id),
        )?)
    }

    pub(crate) fn all_item_tags(&self) -> Result<Vec<ItemTag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, tag_id, item_id FROM item_tags ORDER BY id")?;
        let rows = stmt.query_map([], |row| ItemTag::try_from(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub(crate) fn all_item_fields(&self) -> Result<Vec<ItemField>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, field_id, item_id, value, encrypted FROM item_fields ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| ItemField::try_from(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewFieldValue;
    use std::path::Path;
    use tempfile::tempdir;

    fn sample(dir: &Path) -> (Store, i64) {
        let mut store = Store::create(&dir.join("vault.db"), None).unwrap();
        let web = store.add_tag("web").unwrap();
        let user = store.add_field("user", false).unwrap();
        let pin = store.add_field("pin", true).unwrap();
        let id = store
            .insert_item(&NewItem {
                name: "Mail account".to_string(),
                timestamp: 100,
                note: "recovery codes in safe".to_string(),
                tag_ids: vec![web],
                fields: vec![
                    NewFieldValue {
                        field_id: user,
                        value: "joe@example.com".to_string(),
                        encrypted: false,
                    },
                    NewFieldValue {
                        field_id: pin,
                        value: "c2VjcmV0LWpvZQ==".to_string(),
                        encrypted: true,
                    },
                ],
            })
            .unwrap();
        (store, id)
    }

    fn search(store: &Store, pattern: &str, scopes: SearchScopes) -> Vec<String> {
        store
            .search_items(pattern, scopes)
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect()
    }

    #[test]
    fn test_search_defaults_to_name() {
        let dir = tempdir().unwrap();
        let (store, _) = sample(dir.path());

        assert_eq!(search(&store, "MAIL", SearchScopes::default()), ["Mail account"]);
        assert!(search(&store, "recovery", SearchScopes::default()).is_empty());
    }

    #[test]
    fn test_search_scopes() {
        let dir = tempdir().unwrap();
        let (store, _) = sample(dir.path());
        let tags = SearchScopes {
            tags: true,
            ..Default::default()
        };
        let field_names = SearchScopes {
            field_names: true,
            ..Default::default()
        };
        let field_values = SearchScopes {
            field_values: true,
            ..Default::default()
        };
        let note = SearchScopes {
            note: true,
            ..Default::default()
        };

        assert_eq!(search(&store, "we", tags).len(), 1);
        assert_eq!(search(&store, "PIN", field_names).len(), 1);
        assert_eq!(search(&store, "example", field_values).len(), 1);
        assert_eq!(search(&store, "safe", note).len(), 1);
        assert!(search(&store, "safe", tags).is_empty());
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let dir = tempdir().unwrap();
        let (mut store, _) = sample(dir.path());
        store
            .insert_item(&NewItem {
                name: "Élan Bank".to_string(),
                timestamp: 100,
                ..NewItem::default()
            })
            .unwrap();

        assert_eq!(search(&store, "Élan", SearchScopes::default()), ["Élan Bank"]);
        assert_eq!(search(&store, "élan", SearchScopes::default()), ["Élan Bank"]);
        assert_eq!(search(&store, "ÉLAN", SearchScopes::default()), ["Élan Bank"]);
    }

    #[test]
    fn test_search_skips_encrypted_values() {
        let dir = tempdir().unwrap();
        let (store, _) = sample(dir.path());

        let scopes = SearchScopes {
            field_values: true,
            ..Default::default()
        };
        assert!(search(&store, "c2VjcmV0", scopes).is_empty());
    }

    #[test]
    fn test_delete_item_cascades() {
        let dir = tempdir().unwrap();
        let (mut store, id) = sample(dir.path());

        assert_eq!(store.delete_item(id).unwrap(), 1);
        assert!(store.all_item_tags().unwrap().is_empty());
        assert!(store.all_item_fields().unwrap().is_empty());
    }

    #[test]
    fn test_copy_item_is_verbatim() {
        let dir = tempdir().unwrap();
        let (mut store, id) = sample(dir.path());

        let copy = store.copy_item(id, "Copy of ", 200).unwrap().unwrap();
        let item = store.item(copy).unwrap().unwrap();
        assert_eq!(item.name, "Copy of Mail account");
        assert_eq!(item.timestamp, 200);
        assert_eq!(item.note, "recovery codes in safe");

        let strip = |values: Vec<FieldValue>| {
            values
                .into_iter()
                .map(|v| (v.field_id, v.value, v.encrypted))
                .collect::<Vec<_>>()
        };
        assert_eq!(
            strip(store.item_fields(copy).unwrap()),
            strip(store.item_fields(id).unwrap())
        );
        assert_eq!(store.item_tags(copy).unwrap(), store.item_tags(id).unwrap());
        assert!(store.copy_item(999, "Copy of ", 200).unwrap().is_none());
    }

    #[test]
    fn test_link_tag_once() {
        let dir = tempdir().unwrap();
        let (mut store, id) = sample(dir.path());
        let web = store.tag_by_name("web").unwrap().unwrap();

        assert!(!store.link_tag(id, web.id).unwrap());
        assert_eq!(store.unlink_tag(id, web.id).unwrap(), 1);
        assert!(store.link_tag(id, web.id).unwrap());
    }

    #[test]
    fn test_item_field_scoped_to_item() {
        let dir = tempdir().unwrap();
        let (store, id) = sample(dir.path());
        let first = store.item_fields(id).unwrap()[0].id;

        assert!(store.item_field(id, first).unwrap().is_some());
        assert!(store.item_field(id + 1, first).unwrap().is_none());
    }
}
