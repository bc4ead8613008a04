// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem gateway: contract parity with the metadata API and persistence
//! across gateway instances.

#![allow(clippy::unwrap_used)]

use shelf_config_fs::FsMetadataGateway;
use shelf_metadata::{GatewayError, MetadataGateway, MetadataStore};
use shelf_prefs::{SettingsService, UiSettings};

#[tokio::test]
async fn create_fetch_update_delete() {
    let dir = tempfile::tempdir().unwrap();
    let gw = FsMetadataGateway::with_root(dir.path()).unwrap();

    let created = gw.create("ui_settings", "{}").await.unwrap();
    assert_eq!(created.id, 1);
    assert!(dir.path().join("ui_settings.json").exists());

    let updated = gw.update("ui_settings", "[]").await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(gw.fetch("ui_settings").await.unwrap().value, "[]");

    gw.delete("ui_settings").await.unwrap();
    assert!(gw.fetch("ui_settings").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn ids_increase_across_records() {
    let dir = tempfile::tempdir().unwrap();
    let gw = FsMetadataGateway::with_root(dir.path()).unwrap();
    let a = gw.create("a", "1").await.unwrap();
    let b = gw.create("b", "2").await.unwrap();
    assert!(b.id > a.id);
}

#[tokio::test]
async fn create_on_existing_key_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let gw = FsMetadataGateway::with_root(dir.path()).unwrap();
    gw.create("k", "1").await.unwrap();
    assert!(matches!(
        gw.create("k", "2").await,
        Err(GatewayError::Conflict { .. })
    ));
    assert_eq!(gw.fetch("k").await.unwrap().value, "1");
}

#[tokio::test]
async fn missing_key_is_not_found_for_update_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let gw = FsMetadataGateway::with_root(dir.path()).unwrap();
    assert!(gw.update("nope", "1").await.unwrap_err().is_not_found());
    assert!(gw.delete("nope").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn corrupt_record_file_is_reported_and_can_be_recreated() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("k.json"), b"{{{").unwrap();
    let gw = FsMetadataGateway::with_root(dir.path()).unwrap();

    assert!(matches!(gw.fetch("k").await, Err(GatewayError::Corrupt { .. })));

    // Default repair policy: a failed fetch falls back to create.
    let store = MetadataStore::new(gw);
    assert!(store.set("k", &5).await);
    assert_eq!(store.get::<i32>("k").await, Some(5));
}

#[tokio::test]
async fn settings_persist_across_gateway_instances() {
    let dir = tempfile::tempdir().unwrap();

    {
        let gw = FsMetadataGateway::with_root(dir.path()).unwrap();
        let settings = SettingsService::new(MetadataStore::new(gw));
        assert_eq!(settings.load_settings().await, UiSettings::default());
        assert!(settings.update_mass_input_mode(true).await);
    }

    let gw = FsMetadataGateway::with_root(dir.path()).unwrap();
    let settings = SettingsService::new(MetadataStore::new(gw));
    let loaded = settings.load_settings().await;
    assert!(loaded.mass_input_mode);
    assert!(!loaded.dark_mode);
}

#[tokio::test]
async fn corrupt_settings_file_is_repaired_on_load() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ui_settings.json"), b"not json").unwrap();
    let gw = FsMetadataGateway::with_root(dir.path()).unwrap();
    let settings = SettingsService::new(MetadataStore::new(gw));

    assert_eq!(settings.load_settings().await, UiSettings::default());

    let gw = FsMetadataGateway::with_root(dir.path()).unwrap();
    let record = gw.fetch("ui_settings").await.unwrap();
    assert_eq!(record.value, r#"{"darkMode":false,"massInputMode":false}"#);
}
