//! Item commands, including per-item tags and field values.

use super::{now, CommandProcessor, ItemDetail, Payload, Response, MASK};
use crate::crypto::CryptKey;
use crate::error::Result;
use crate::store::{
    FieldDef, FieldValue, ItemChanges, NewFieldValue, NewItem, SearchScopes, Store,
};

const COPY_PREFIX: &str = "Copy of ";

/// `-f NAME VALUE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAssignment {
    pub name: String,
    pub value: String,
}

/// Options gathered from the `item add` / `item update` switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemOptions {
    /// `-n`
    pub name: Option<String>,
    /// `-t`, repeatable
    pub tags: Vec<String>,
    /// `-f`, repeatable
    pub fields: Vec<FieldAssignment>,
    /// `-fd`, repeatable
    pub field_deletes: Vec<String>,
    /// `-note`
    pub note: Option<String>,
    /// `-text`: edit the note in the external editor
    pub edit_note: bool,
}

impl ItemOptions {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.tags.is_empty()
            && self.fields.is_empty()
            && self.field_deletes.is_empty()
            && self.note.is_none()
            && !self.edit_note
    }
}

fn item_missing(id: i64) -> Response {
    Response::error(format!("item {} does not exist", id))
}

/// Store `value` for `field`: encrypted when the field is sensitive and a
/// key is configured, as-is otherwise.
fn seal(key: Option<&CryptKey>, field: &FieldDef, value: &str) -> Result<NewFieldValue> {
    let (value, encrypted) = match key {
        Some(key) if field.sensitive => (key.encrypt_str(value)?, true),
        _ => (value.to_string(), false),
    };
    Ok(NewFieldValue {
        field_id: field.id,
        value,
        encrypted,
    })
}

/// Re-store `current` under definition `target`, optionally with a new value.
///
/// Ciphertext is kept when it already matches the target's sensitivity and
/// the value did not change. Without a key, existing ciphertext cannot be
/// opened and is kept with its encrypted flag.
fn reseal(
    key: Option<&CryptKey>,
    current: &FieldValue,
    target: &FieldDef,
    value: Option<&str>,
) -> Result<NewFieldValue> {
    let keep = || NewFieldValue {
        field_id: target.id,
        value: current.value.clone(),
        encrypted: current.encrypted,
    };

    let plaintext = match (value, current.encrypted) {
        (Some(value), true) if target.sensitive => {
            if let Some(key) = key {
                if key.decrypt_str(&current.value)? == value {
                    return Ok(keep());
                }
            }
            value.to_string()
        }
        (Some(value), _) => value.to_string(),
        (None, false) => current.value.clone(),
        (None, true) if target.sensitive => return Ok(keep()),
        (None, true) => match key {
            Some(key) => key.decrypt_str(&current.value)?,
            None => return Ok(keep()),
        },
    };
    seal(key, target, &plaintext)
}

/// Resolve tag and field names; the first unknown name becomes an error response.
fn resolve(store: &Store, options: &ItemOptions) -> Result<std::result::Result<ItemChanges, Response>> {
    let mut changes = ItemChanges {
        name: options.name.clone(),
        note: options.note.clone(),
        timestamp: now(),
        ..ItemChanges::default()
    };

    for name in &options.tags {
        match store.tag_by_name(name)? {
            Some(tag) => changes.add_tag_ids.push(tag.id),
            None => return Ok(Err(Response::error(format!("tag {} does not exist", name)))),
        }
    }
    for assignment in &options.fields {
        match store.field_by_name(&assignment.name)? {
            Some(field) => changes
                .add_fields
                .push(seal(store.key(), &field, &assignment.value)?),
            None => {
                return Ok(Err(Response::error(format!(
                    "field {} does not exist",
                    assignment.name
                ))))
            }
        }
    }
    for name in &options.field_deletes {
        match store.field_by_name(name)? {
            Some(field) => changes.remove_field_ids.push(field.id),
            None => {
                return Ok(Err(Response::error(format!(
                    "field {} does not exist",
                    name
                ))))
            }
        }
    }
    Ok(Ok(changes))
}

impl CommandProcessor {
    pub fn item_list(&mut self) -> Response {
        self.with_store("cannot list items", |store, _| {
            Ok(Response::ok(Payload::Items(store.items()?)))
        })
    }

    pub fn item_count(&mut self) -> Response {
        self.with_store("cannot count items", |store, _| {
            Ok(Response::ok(Payload::Count(store.item_count()?)))
        })
    }

    pub fn item_search(&mut self, pattern: &str, scopes: SearchScopes) -> Response {
        self.with_store("cannot search items", |store, _| {
            Ok(Response::ok(Payload::Items(
                store.search_items(pattern, scopes)?,
            )))
        })
    }

    /// Select the default item; `None` clears the selection.
    pub fn item_use(&mut self, id: Option<i64>) -> Response {
        self.with_store("cannot select item", |store, _| {
            let Some(id) = id else {
                return Ok(Response::ok(Payload::Selected(None)));
            };
            Ok(match store.item(id)? {
                Some(item) => Response::ok(Payload::Selected(Some(item))),
                None => item_missing(id),
            })
        })
    }

    /// Show an item; encrypted values are decrypted only when `reveal` is set.
    pub fn item_print(&mut self, id: i64, reveal: bool) -> Response {
        self.with_store("cannot print item", |store, _| {
            let Some(item) = store.item(id)? else {
                return Ok(item_missing(id));
            };
            let tags = store
                .item_tags(id)?
                .into_iter()
                .map(|tag| tag.name)
                .collect();

            let mut fields = store.item_fields(id)?;
            let mut revealed = false;
            for value in fields.iter_mut().filter(|value| value.encrypted) {
                match (reveal, store.key()) {
                    (true, Some(key)) => {
                        value.value = key.decrypt_str(&value.value)?;
                        revealed = true;
                    }
                    _ => value.value = MASK.to_string(),
                }
            }

            Ok(Response::ok(Payload::Detail(Box::new(ItemDetail {
                item,
                tags,
                fields,
                revealed,
            }))))
        })
    }

    pub fn item_delete(&mut self, id: i64) -> Response {
        self.with_store("cannot delete item", |store, _| {
            Ok(match store.delete_item(id)? {
                0 => item_missing(id),
                _ => Response::done(format!("item {} deleted", id)),
            })
        })
    }

    pub fn item_copy(&mut self, id: i64) -> Response {
        self.with_store("cannot copy item", |store, _| {
            Ok(match store.copy_item(id, COPY_PREFIX, now())? {
                Some(copy) => Response::done(format!("item {} copied to {}", id, copy)),
                None => item_missing(id),
            })
        })
    }

    pub fn item_add(&mut self, options: ItemOptions) -> Response {
        self.with_store("cannot add item", |store, host| {
            let name = match options.name.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => return Ok(Response::error("item name expected")),
            };
            if !options.field_deletes.is_empty() {
                return Ok(Response::error("unknown item option"));
            }
            let changes = match resolve(store, &options)? {
                Ok(changes) => changes,
                Err(response) => return Ok(response),
            };

            let mut note = options.note.clone().unwrap_or_default();
            if options.edit_note {
                if let Some(edited) = host.edit_text(&note)? {
                    note = edited;
                }
            }

            let id = store.insert_item(&NewItem {
                name,
                timestamp: changes.timestamp,
                note,
                tag_ids: changes.add_tag_ids,
                fields: changes.add_fields,
            })?;
            Ok(Response::done(format!("item {} added", id)))
        })
    }

    pub fn item_update(&mut self, id: i64, options: ItemOptions) -> Response {
        self.with_store("cannot update item", |store, host| {
            if options.is_empty() {
                return Ok(Response::warning("nothing to update"));
            }
            let Some(item) = store.item(id)? else {
                return Ok(item_missing(id));
            };
            let mut changes = match resolve(store, &options)? {
                Ok(changes) => changes,
                Err(response) => return Ok(response),
            };
            if options.edit_note {
                let current = changes.note.clone().unwrap_or(item.note);
                if let Some(edited) = host.edit_text(&current)? {
                    changes.note = Some(edited);
                }
            }

            store.update_item(id, &changes)?;
            Ok(Response::done(format!("item {} updated", id)))
        })
    }

    /// Edit an item's note with the host's editor.
    pub fn item_note(&mut self, id: i64) -> Response {
        self.with_store("cannot edit note", |store, host| {
            let Some(item) = store.item(id)? else {
                return Ok(item_missing(id));
            };
            let Some(note) = host.edit_text(&item.note)? else {
                return Ok(Response::warning("note unchanged"));
            };
            store.update_item(
                id,
                &ItemChanges {
                    note: Some(note),
                    timestamp: now(),
                    ..ItemChanges::default()
                },
            )?;
            Ok(Response::done(format!("note of item {} updated", id)))
        })
    }

    pub fn item_tag_add(&mut self, id: i64, tag: &str) -> Response {
        self.with_store("cannot tag item", |store, _| {
            if store.item(id)?.is_none() {
                return Ok(item_missing(id));
            }
            let Some(found) = store.tag_by_name(tag)? else {
                return Ok(Response::error(format!("tag {} does not exist", tag)));
            };
            if !store.link_tag(id, found.id)? {
                return Ok(Response::error(format!("item {} already has tag {}", id, tag)));
            }
            store.touch_item(id, now())?;
            Ok(Response::done(format!("tag {} added to item {}", tag, id)))
        })
    }

    pub fn item_tag_delete(&mut self, id: i64, tag: &str) -> Response {
        self.with_store("cannot untag item", |store, _| {
            if store.item(id)?.is_none() {
                return Ok(item_missing(id));
            }
            let Some(found) = store.tag_by_name(tag)? else {
                return Ok(Response::error(format!("tag {} does not exist", tag)));
            };
            if store.unlink_tag(id, found.id)? == 0 {
                return Ok(Response::error(format!("item {} has no tag {}", id, tag)));
            }
            store.touch_item(id, now())?;
            Ok(Response::done(format!("tag {} removed from item {}", tag, id)))
        })
    }

    pub fn item_field_add(&mut self, id: i64, field: &str, value: &str) -> Response {
        self.with_store("cannot add field value", |store, _| {
            if store.item(id)?.is_none() {
                return Ok(item_missing(id));
            }
            let Some(definition) = store.field_by_name(field)? else {
                return Ok(Response::error(format!("field {} does not exist", field)));
            };
            let sealed = seal(store.key(), &definition, value)?;
            let value_id =
                store.insert_item_field(id, sealed.field_id, &sealed.value, sealed.encrypted)?;
            store.touch_item(id, now())?;
            Ok(Response::done(format!(
                "field {} added to item {} as {}",
                field, id, value_id
            )))
        })
    }

    /// Change a field value's definition and/or value, keeping the
    /// encrypted flag consistent with the target definition.
    pub fn item_field_update(
        &mut self,
        id: i64,
        value_id: i64,
        field: Option<&str>,
        value: Option<&str>,
    ) -> Response {
        self.with_store("cannot update field value", |store, _| {
            if field.is_none() && value.is_none() {
                return Ok(Response::warning("nothing to update"));
            }
            let Some(current) = store.item_field(id, value_id)? else {
                return Ok(Response::error(format!(
                    "item {} has no field value {}",
                    id, value_id
                )));
            };
            let target = match field {
                Some(name) => store.field_by_name(name)?,
                None => store.field_by_id(current.field_id)?,
            };
            let Some(target) = target else {
                return Ok(Response::error(format!(
                    "field {} does not exist",
                    field.unwrap_or_default()
                )));
            };

            let sealed = reseal(store.key(), &current, &target, value)?;
            store.update_item_field(value_id, sealed.field_id, &sealed.value, sealed.encrypted)?;
            store.touch_item(id, now())?;
            Ok(Response::done(format!(
                "field value {} of item {} updated",
                value_id, id
            )))
        })
    }

    pub fn item_field_delete(&mut self, id: i64, value_id: i64) -> Response {
        self.with_store("cannot delete field value", |store, _| {
            if store.delete_item_field(id, value_id)? == 0 {
                return Ok(Response::error(format!(
                    "item {} has no field value {}",
                    id, value_id
                )));
            }
            store.touch_item(id, now())?;
            Ok(Response::done(format!(
                "field value {} removed from item {}",
                value_id, id
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{processor, QueueHost};
    use super::*;
    use crate::crypto::KEY_LENGTH;

    fn key() -> CryptKey {
        CryptKey::from_bytes([9; KEY_LENGTH])
    }

    fn def(sensitive: bool) -> FieldDef {
        FieldDef {
            id: if sensitive { 2 } else { 1 },
            name: if sensitive { "pin" } else { "user" }.to_string(),
            sensitive,
            count: 0,
        }
    }

    fn stored(key: Option<&CryptKey>, sensitive: bool, plaintext: &str) -> FieldValue {
        let sealed = seal(key, &def(sensitive), plaintext).unwrap();
        FieldValue {
            id: 10,
            field_id: sealed.field_id,
            name: def(sensitive).name,
            value: sealed.value,
            encrypted: sealed.encrypted,
            sensitive,
        }
    }

    #[test]
    fn test_seal_policy() {
        let key = key();
        assert!(seal(Some(&key), &def(true), "1234").unwrap().encrypted);
        assert!(!seal(Some(&key), &def(false), "joe").unwrap().encrypted);
        assert!(!seal(None, &def(true), "1234").unwrap().encrypted);
    }

    #[test]
    fn test_sensitive_to_sensitive_unchanged_keeps_ciphertext() {
        let key = key();
        let current = stored(Some(&key), true, "1234");

        let same = reseal(Some(&key), &current, &def(true), Some("1234")).unwrap();
        assert_eq!(same.value, current.value);

        let changed = reseal(Some(&key), &current, &def(true), Some("9999")).unwrap();
        assert!(changed.encrypted);
        assert_eq!(key.decrypt_str(&changed.value).unwrap(), "9999");
    }

    #[test]
    fn test_plain_to_sensitive_encrypts() {
        let key = key();
        let current = stored(Some(&key), false, "joe");

        let moved = reseal(Some(&key), &current, &def(true), None).unwrap();
        assert!(moved.encrypted);
        assert_eq!(key.decrypt_str(&moved.value).unwrap(), "joe");
    }

    #[test]
    fn test_sensitive_to_plain_decrypts() {
        let key = key();
        let current = stored(Some(&key), true, "1234");

        let moved = reseal(Some(&key), &current, &def(false), None).unwrap();
        assert!(!moved.encrypted);
        assert_eq!(moved.value, "1234");
    }

    #[test]
    fn test_sensitive_to_plain_without_key_keeps_ciphertext() {
        let key = key();
        let current = stored(Some(&key), true, "1234");

        let moved = reseal(None, &current, &def(false), None).unwrap();
        assert!(moved.encrypted);
        assert_eq!(moved.value, current.value);
    }

    #[test]
    fn test_plain_to_plain_as_is() {
        let current = stored(None, false, "joe");
        let moved = reseal(None, &current, &def(false), Some("ann")).unwrap();
        assert_eq!((moved.value.as_str(), moved.encrypted), ("ann", false));
    }

    fn loaded() -> (tempfile::TempDir, CommandProcessor) {
        let dir = tempfile::tempdir().unwrap();
        let mut cp = processor(&[]);
        cp.database_create(&dir.path().join("vault.db"));
        cp.tag_add("web");
        cp.field_add("user", false);
        cp.field_add("pin", true);
        (dir, cp)
    }

    fn add(cp: &mut CommandProcessor, name: &str) -> i64 {
        let response = cp.item_add(ItemOptions {
            name: Some(name.to_string()),
            tags: vec!["web".to_string()],
            fields: vec![FieldAssignment {
                name: "user".to_string(),
                value: "joe".to_string(),
            }],
            ..ItemOptions::default()
        });
        assert!(response.is_ok(), "{}", response);
        cp.store().unwrap().items().unwrap().last().unwrap().id
    }

    #[test]
    fn test_add_rejects_unknown_names() {
        let (_dir, mut cp) = loaded();
        let response = cp.item_add(ItemOptions {
            name: Some("mail".to_string()),
            tags: vec!["nope".to_string()],
            ..ItemOptions::default()
        });
        assert_eq!(response, Response::error("tag nope does not exist"));
        assert_eq!(
            cp.item_add(ItemOptions::default()),
            Response::error("item name expected")
        );
        assert_eq!(cp.item_count().payload, Payload::Count(0));
    }

    #[test]
    fn test_sensitive_without_key_stays_plain() {
        let (_dir, mut cp) = loaded();
        let id = add(&mut cp, "mail");
        assert!(cp.item_field_add(id, "pin", "1234").is_ok());

        match cp.item_print(id, false).payload {
            Payload::Detail(detail) => {
                assert_eq!(detail.tags, vec!["web".to_string()]);
                let pin = detail.fields.iter().find(|v| v.name == "pin").unwrap();
                assert!(!pin.encrypted);
                assert_eq!(pin.value, "1234");
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_update_and_field_changes() {
        let (_dir, mut cp) = loaded();
        let id = add(&mut cp, "mail");

        assert_eq!(
            cp.item_update(id, ItemOptions::default()),
            Response::warning("nothing to update")
        );
        assert!(cp
            .item_update(
                id,
                ItemOptions {
                    name: Some("webmail".to_string()),
                    field_deletes: vec!["user".to_string()],
                    ..ItemOptions::default()
                }
            )
            .is_ok());
        let store = cp.store().unwrap();
        assert_eq!(store.item(id).unwrap().unwrap().name, "webmail");
        assert!(store.item_fields(id).unwrap().is_empty());

        cp.item_field_add(id, "user", "joe");
        let value_id = cp.store().unwrap().item_fields(id).unwrap()[0].id;
        assert!(cp
            .item_field_update(id, value_id, Some("pin"), Some("4321"))
            .is_ok());
        let values = cp.store().unwrap().item_fields(id).unwrap();
        assert_eq!((values[0].name.as_str(), values[0].value.as_str()), ("pin", "4321"));

        assert!(cp.item_field_delete(id, value_id).is_ok());
        assert_eq!(
            cp.item_field_delete(id, value_id).severity,
            crate::command::Severity::Error
        );
    }

    #[test]
    fn test_tags_and_copy() {
        let (_dir, mut cp) = loaded();
        let id = add(&mut cp, "mail");

        assert_eq!(
            cp.item_tag_add(id, "web"),
            Response::error(format!("item {} already has tag web", id))
        );
        assert!(cp.item_tag_delete(id, "web").is_ok());
        assert!(cp.item_tag_add(id, "web").is_ok());

        assert!(cp.item_copy(id).is_ok());
        let items = cp.store().unwrap().items().unwrap();
        let copy = items.iter().find(|item| item.name == "Copy of mail").unwrap();
        assert_eq!(cp.store().unwrap().item_fields(copy.id).unwrap().len(), 1);
        assert_eq!(cp.item_copy(9999), Response::error("item 9999 does not exist"));
    }

    #[test]
    fn test_note_through_editor() {
        let dir = tempfile::tempdir().unwrap();
        let host = QueueHost {
            edits: ["first line".to_string()].into_iter().collect(),
            ..QueueHost::default()
        };
        let mut cp = CommandProcessor::new(Box::new(host), crate::trace::Tracer::default());
        cp.database_create(&dir.path().join("vault.db"));
        let id = add_plain(&mut cp);

        assert!(cp.item_note(id).is_ok());
        assert_eq!(cp.store().unwrap().item(id).unwrap().unwrap().note, "first line");
        assert_eq!(cp.item_note(id), Response::warning("note unchanged"));
    }

    fn add_plain(cp: &mut CommandProcessor) -> i64 {
        cp.item_add(ItemOptions {
            name: Some("plain".to_string()),
            ..ItemOptions::default()
        });
        cp.store().unwrap().items().unwrap()[0].id
    }

    #[test]
    fn test_options_empty() {
        assert!(ItemOptions::default().is_empty());
        assert!(!ItemOptions {
            edit_note: true,
            ..ItemOptions::default()
        }
        .is_empty());
    }
}
