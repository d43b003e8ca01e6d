mod common;

use std::fs;

use common::{KEY, OTHER_KEY};
use secretary_core::fs::{list_backups, rotate_backup, stage_temp};
use secretary_core::store::{NewFieldValue, NewItem, Store};
use secretary_core::SecretaryError;
use tempfile::tempdir;

fn populated(path: &std::path::Path) -> (Store, i64) {
    let mut store = Store::create(path, Some(KEY.clone())).expect("create should succeed");
    let web = store.add_tag("web").expect("add tag should succeed");
    let user = store.add_field("user", false).expect("add field should succeed");
    let password = store.add_field("password", true).expect("add field should succeed");

    let sealed = KEY.encrypt_str("hunter2").expect("encrypt should succeed");
    let id = store
        .insert_item(&NewItem {
            name: "mail".to_string(),
            timestamp: 1_695_219_467,
            note: "two-factor on phone".to_string(),
            tag_ids: vec![web],
            fields: vec![
                NewFieldValue {
                    field_id: user,
                    value: "joe".to_string(),
                    encrypted: false,
                },
                NewFieldValue {
                    field_id: password,
                    value: sealed,
                    encrypted: true,
                },
            ],
        })
        .expect("insert should succeed");
    (store, id)
}

#[test]
fn test_write_read_round_trip_with_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let (mut store, id) = populated(&path);
    store.write().expect("write should succeed");

    let on_disk = fs::read(&path).unwrap();
    assert!(serde_json::from_slice::<serde_json::Value>(&on_disk).is_err());

    let reread = Store::open(&path, Some(KEY.clone())).expect("open should succeed");
    assert_eq!(reread.tags().unwrap(), store.tags().unwrap());
    assert_eq!(reread.fields().unwrap(), store.fields().unwrap());
    assert_eq!(reread.item(id).unwrap(), store.item(id).unwrap());
    assert_eq!(reread.item_tags(id).unwrap()[0].name, "web");
    assert_eq!(reread.recorded_checksum(), store.recorded_checksum());

    let values = reread.item_fields(id).unwrap();
    let password = values.iter().find(|v| v.name == "password").unwrap();
    assert!(password.encrypted);
    assert_eq!(KEY.decrypt_str(&password.value).unwrap(), "hunter2");
    assert_eq!(reread.tags().unwrap()[0].count, 1);
}

#[test]
fn test_wrong_key_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let (mut store, _) = populated(&path);
    store.write().unwrap();

    let result = Store::open(&path, Some(OTHER_KEY.clone()));
    assert!(matches!(result, Err(SecretaryError::IncorrectKey)));

    let result = Store::open(&path, None);
    assert!(matches!(result, Err(SecretaryError::Document(_))));
}

#[test]
fn test_single_backup_kept() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let (mut store, _) = populated(&path);

    assert_eq!(store.write().unwrap(), None);
    store.add_tag("bank").unwrap();
    assert!(store.write().unwrap().is_some());
    store.add_tag("home").unwrap();
    let latest = store.write().unwrap().expect("third write should back up");

    assert_eq!(list_backups(&path).unwrap(), vec![latest]);
    assert_eq!(
        Store::open(&path, Some(KEY.clone())).unwrap().tags().unwrap().len(),
        3
    );
}

#[test]
fn test_interrupted_write_leaves_backup_readable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let (mut store, id) = populated(&path);
    store.write().unwrap();

    // Stop after staging and rotation, before the temp file is promoted.
    let temp = stage_temp(&path, b"half-written").unwrap();
    let backup = rotate_backup(&path).unwrap().expect("target should be rotated");
    assert!(!path.exists());
    assert!(temp.exists());

    let recovered = Store::open(&backup, Some(KEY.clone())).expect("backup should open");
    assert_eq!(recovered.item(id).unwrap().unwrap().name, "mail");
}

#[test]
fn test_document_export_keeps_ciphertext() {
    let dir = tempdir().unwrap();
    let (store, _) = populated(&dir.path().join("vault.db"));
    let export = dir.path().join("export.json");
    store.export_document(&export).unwrap();

    let json: serde_json::Value = serde_json::from_slice(&fs::read(&export).unwrap()).unwrap();
    let fields = &json["items"]["1"]["fields"];
    let password = fields
        .as_object()
        .unwrap()
        .values()
        .find(|value| value["name"] == "password")
        .unwrap();
    assert_eq!(password["encrypted"], true);
    assert_ne!(password["value"], "hunter2");
    assert_eq!(json["tags"][0]["uid"], 1);
}

#[test]
fn test_native_export_import() {
    let dir = tempdir().unwrap();
    let (store, id) = populated(&dir.path().join("vault.db"));
    let native = dir.path().join("vault.sqlite");
    store.export_native(&native).unwrap();

    let mut other = Store::create(&dir.path().join("other.db"), None).unwrap();
    other.import_native(&native).unwrap();
    assert_eq!(other.item(id).unwrap(), store.item(id).unwrap());
    assert_eq!(other.dump().unwrap(), store.dump().unwrap());
}
