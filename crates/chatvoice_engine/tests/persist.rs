use std::fs;
use std::time::Duration;

use chatvoice_core::{ExtensionEnabled, SpeechTemplate, StoredValue, TtsRate};
use chatvoice_engine::{
    ensure_dir, load, set_rate, set_speech_template, toggle_enabled, AtomicFileWriter,
    PersistError, PersistentStore,
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn creates_missing_settings_dir() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("profile");
    assert!(!dir.exists());
    ensure_dir(&dir).unwrap();
    assert!(dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("settings.json"));

    writer.write("{}").unwrap();
    writer.write(r#"{"a":1}"#).unwrap();
    assert_eq!(fs::read_to_string(writer.path()).unwrap(), r#"{"a":1}"#);
}

#[test]
fn no_partial_file_when_parent_is_a_file() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();

    let writer = AtomicFileWriter::new(blocker.join("settings.json"));
    assert!(writer.write("{}").is_err());
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");
}

#[tokio::test]
async fn flush_writes_latest_values_and_reopen_restores_them() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");

    let store = PersistentStore::open(&path, Duration::from_secs(60)).unwrap();
    set_rate(store.as_ref(), 1.5).unwrap();
    set_rate(store.as_ref(), 2.0).unwrap();
    set_speech_template(store.as_ref(), Some("%(body)".into())).unwrap();
    assert!(!toggle_enabled(store.as_ref()).unwrap());
    assert!(!path.exists());

    store.flush().await.unwrap();
    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk[TtsRate::KEY]["rate"], 2.0);
    assert_eq!(on_disk[ExtensionEnabled::KEY]["enabled"], false);

    let reopened = PersistentStore::open(&path, Duration::from_secs(60)).unwrap();
    assert_eq!(load::<TtsRate>(reopened.as_ref()).rate, 2.0);
    assert_eq!(
        load::<SpeechTemplate>(reopened.as_ref()).effective(),
        "%(body)"
    );
    assert!(!load::<ExtensionEnabled>(reopened.as_ref()).enabled);
}

#[tokio::test]
async fn burst_of_writes_lands_after_the_window() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    let store = PersistentStore::open(&path, Duration::from_millis(20)).unwrap();

    for rate in [1.1, 1.2, 1.3] {
        set_rate(store.as_ref(), rate).unwrap();
    }
    tokio::time::timeout(Duration::from_secs(5), async {
        while !path.exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("debounced write never happened");

    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let rate = on_disk[TtsRate::KEY]["rate"].as_f64().unwrap();
    assert!((rate - 1.3).abs() < 1e-6);
}

#[tokio::test]
async fn corrupt_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    fs::write(&path, "not json").unwrap();

    let result = PersistentStore::open(&path, Duration::from_millis(20));
    assert!(matches!(result, Err(PersistError::Corrupt { .. })));
}
