use std::path::Path;

use super::{CommandProcessor, Payload, Response};
use crate::store::{Deletion, Vocabulary};

/// Same rule as CSV import: blank names are never defined.
const NAME_EXPECTED: &str = "name expected";

impl CommandProcessor {
    pub fn vocabulary_list(&mut self, vocabulary: Vocabulary) -> Response {
        self.with_store("cannot list vocabulary", |store, _| {
            store.update_counters()?;
            Ok(Response::ok(match vocabulary {
                Vocabulary::Tags => Payload::Tags(store.tags()?),
                Vocabulary::Fields => Payload::Fields(store.fields()?),
            }))
        })
    }

    pub fn vocabulary_count(&mut self, vocabulary: Vocabulary) -> Response {
        self.with_store("cannot count vocabulary", |store, _| {
            Ok(Response::ok(Payload::Count(
                store.vocabulary_count(vocabulary)?,
            )))
        })
    }

    pub fn vocabulary_search(&mut self, vocabulary: Vocabulary, pattern: &str) -> Response {
        self.with_store("cannot search vocabulary", |store, _| {
            store.update_counters()?;
            Ok(Response::ok(match vocabulary {
                Vocabulary::Tags => Payload::Tags(store.search_tags(pattern)?),
                Vocabulary::Fields => Payload::Fields(store.search_fields(pattern)?),
            }))
        })
    }

    pub fn tag_add(&mut self, name: &str) -> Response {
        self.with_store("cannot add tag", |store, _| {
            let name = name.trim();
            if name.is_empty() {
                return Ok(Response::error(NAME_EXPECTED));
            }
            if store.vocabulary_contains(Vocabulary::Tags, name)? {
                return Ok(Response::error(format!("tag {} already exists", name)));
            }
            store.add_tag(name)?;
            Ok(Response::done(format!("tag {} added", name)))
        })
    }

    pub fn field_add(&mut self, name: &str, sensitive: bool) -> Response {
        self.with_store("cannot add field", |store, _| {
            let name = name.trim();
            if name.is_empty() {
                return Ok(Response::error(NAME_EXPECTED));
            }
            if store.vocabulary_contains(Vocabulary::Fields, name)? {
                return Ok(Response::error(format!("field {} already exists", name)));
            }
            store.add_field(name, sensitive)?;
            let kind = if sensitive { "sensitive field" } else { "field" };
            Ok(Response::done(format!("{} {} added", kind, name)))
        })
    }

    pub fn vocabulary_rename(
        &mut self,
        vocabulary: Vocabulary,
        old_name: &str,
        new_name: &str,
    ) -> Response {
        self.with_store("cannot rename", |store, _| {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Ok(Response::error(NAME_EXPECTED));
            }
            if !store.vocabulary_contains(vocabulary, old_name)? {
                return Ok(Response::error(format!(
                    "{} {} does not exist",
                    vocabulary, old_name
                )));
            }
            if store.vocabulary_contains(vocabulary, new_name)? {
                return Ok(Response::error(format!(
                    "{} {} already exists",
                    vocabulary, new_name
                )));
            }
            if store.rename_vocabulary(vocabulary, old_name, new_name)? == 0 {
                return Ok(Response::error(format!(
                    "cannot rename {} {}",
                    vocabulary, old_name
                )));
            }
            Ok(Response::done(format!(
                "{} {} renamed to {}",
                vocabulary, old_name, new_name
            )))
        })
    }

    pub fn vocabulary_delete(&mut self, vocabulary: Vocabulary, name: &str) -> Response {
        self.with_store("cannot delete", |store, _| {
            Ok(match store.delete_vocabulary(vocabulary, name)? {
                Deletion::Deleted => Response::done(format!("{} {} deleted", vocabulary, name)),
                Deletion::InUse(_) => {
                    Response::error(format!("{} {} is being used", vocabulary, name))
                }
                Deletion::Missing => {
                    Response::error(format!("{} {} does not exist", vocabulary, name))
                }
            })
        })
    }

    pub fn vocabulary_import(&mut self, vocabulary: Vocabulary, path: &Path) -> Response {
        self.with_store("cannot import vocabulary", |store, _| {
            if !path.exists() {
                return Ok(Response::error(format!(
                    "file {} does not exist",
                    path.display()
                )));
            }
            let summary = store.import_vocabulary(vocabulary, path)?;
            Ok(Response::done(format!(
                "imported {} {}s, skipped {}",
                summary.imported, vocabulary, summary.skipped
            )))
        })
    }

    pub fn vocabulary_export(&mut self, vocabulary: Vocabulary, path: &Path) -> Response {
        self.with_store("cannot export vocabulary", |store, _| {
            let written = store.export_vocabulary(vocabulary, path)?;
            Ok(Response::done(format!(
                "exported {} {}s to {}",
                written,
                vocabulary,
                path.display()
            )))
        })
    }
}
