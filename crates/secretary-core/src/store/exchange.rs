//! The exchange document: the JSON form a store is saved, imported and
//! exported as.
//!
//! Items are keyed by id and refer to tags and fields by name. Tag-link ids
//! are not part of the document and are regenerated on load.

use std::collections::{BTreeMap, HashMap};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::Store;
use crate::error::{Result, SecretaryError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeDocument {
    #[serde(default)]
    pub tags: Vec<TagRecord>,
    #[serde(default)]
    pub fields: Vec<FieldRecord>,
    #[serde(default)]
    pub items: BTreeMap<i64, ItemRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    #[serde(rename = "uid")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    #[serde(rename = "uid")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub timestamp: i64,
    #[serde(default)]
    pub note: String,
    /// Tag names, in link order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Field values keyed by their id.
    #[serde(default)]
    pub fields: BTreeMap<i64, FieldValueRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValueRecord {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub encrypted: bool,
}

impl ExchangeDocument {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| SecretaryError::Document(format!("invalid exchange document: {}", e)))
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Snapshot every table of `store`.
    pub fn from_store(store: &Store) -> Result<Self> {
        let tags = store.tags()?;
        let fields = store.fields()?;
        let tag_names: HashMap<i64, &str> =
            tags.iter().map(|tag| (tag.id, tag.name.as_str())).collect();
        let field_names: HashMap<i64, &str> = fields
            .iter()
            .map(|field| (field.id, field.name.as_str()))
            .collect();

        let mut items: BTreeMap<i64, ItemRecord> = store
            .items()?
            .into_iter()
            .map(|item| {
                (
                    item.id,
                    ItemRecord {
                        name: item.name,
                        timestamp: item.timestamp,
                        note: item.note,
                        tags: Vec::new(),
                        fields: BTreeMap::new(),
                    },
                )
            })
            .collect();

        for link in store.all_item_tags()? {
            let name = tag_names.get(&link.tag_id).ok_or_else(|| {
                SecretaryError::Storage(format!("link {} refers to missing tag", link.id))
            })?;
            if let Some(item) = items.get_mut(&link.item_id) {
                item.tags.push((*name).to_string());
            }
        }

        for value in store.all_item_fields()? {
            let name = field_names.get(&value.field_id).ok_or_else(|| {
                SecretaryError::Storage(format!("value {} refers to missing field", value.id))
            })?;
            if let Some(item) = items.get_mut(&value.item_id) {
                item.fields.insert(
                    value.id,
                    FieldValueRecord {
                        name: (*name).to_string(),
                        value: value.value,
                        encrypted: value.encrypted,
                    },
                );
            }
        }

        Ok(Self {
            tags: tags
                .into_iter()
                .map(|tag| TagRecord {
                    id: tag.id,
                    name: tag.name,
                    count: tag.count,
                })
                .collect(),
            fields: fields
                .into_iter()
                .map(|field| FieldRecord {
                    id: field.id,
                    name: field.name,
                    sensitive: field.sensitive,
                    count: field.count,
                })
                .collect(),
            items,
        })
    }

    /// Insert the document into an empty schema, keeping every id.
    pub(crate) fn populate(self, conn: &mut Connection) -> Result<()> {
        let tx = conn.transaction()?;

        let mut tag_ids = HashMap::new();
        for tag in &self.tags {
            tx.execute(
                "INSERT INTO tag_table (id, name, count) VALUES (?, ?, ?)",
                (tag.id, &tag.name, tag.count),
            )
            .map_err(|e| SecretaryError::Document(format!("tag {}: {}", tag.name, e)))?;
            tag_ids.insert(tag.name.as_str(), tag.id);
        }

        let mut field_ids = HashMap::new();
        for field in &self.fields {
            tx.execute(
                "INSERT INTO field_table (id, name, sensitive, count) VALUES (?, ?, ?, ?)",
                (field.id, &field.name, field.sensitive, field.count),
            )
            .map_err(|e| SecretaryError::Document(format!("field {}: {}", field.name, e)))?;
            field_ids.insert(field.name.as_str(), field.id);
        }

        for (id, item) in &self.items {
            tx.execute(
                "INSERT INTO items (id, name, timestamp, note) VALUES (?, ?, ?, ?)",
                (id, &item.name, item.timestamp, &item.note),
            )?;

            for tag in &item.tags {
                let tag_id = tag_ids.get(tag.as_str()).ok_or_else(|| {
                    SecretaryError::Document(format!("item {} refers to unknown tag {}", id, tag))
                })?;
                tx.execute(
                    "INSERT OR IGNORE INTO item_tags (tag_id, item_id) VALUES (?, ?)",
                    (tag_id, id),
                )?;
            }

            for (value_id, value) in &item.fields {
                let field_id = field_ids.get(value.name.as_str()).ok_or_else(|| {
                    SecretaryError::Document(format!(
                        "item {} refers to unknown field {}",
                        id, value.name
                    ))
                })?;
                tx.execute(
                    "INSERT INTO item_fields (id, field_id, item_id, value, encrypted) \
                     VALUES (?, ?, ?, ?, ?)",
                    (value_id, field_id, id, &value.value, value.encrypted),
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}
