//! Contract Test: Config Store Snapshots
//!
//! Requests read an immutable catalog snapshot. Reloading swaps in a
//! complete new catalog; a failed reload keeps the previous one.

mod common;

use common::*;
use iplist_core::store::{backup_path, write_atomically};
use iplist_core::{ConfigStore, Error, FileConfigSource, MemoryConfigSource, RemoteConfigSource};
use std::sync::Arc;

const ONE_APP: &str = r#"{"apps":[{"name":"web","config":[]}]}"#;
const TWO_APPS: &str = r#"{"apps":[{"name":"web","config":[]},{"name":"api","config":[]}]}"#;

#[tokio::test]
async fn reload_swaps_without_touching_held_snapshots() {
    let source = Arc::new(MemoryConfigSource::new(catalog(ONE_APP)));
    let store = ConfigStore::load(Box::new(source.clone())).await.unwrap();

    let before = store.snapshot().await;

    source.replace(catalog(TWO_APPS)).await;
    assert_eq!(store.reload().await.unwrap(), 2);

    assert_eq!(before.app_names(), vec!["web"], "held snapshot is immutable");
    assert_eq!(store.snapshot().await.app_names(), vec!["web", "api"]);
}

#[tokio::test]
async fn failed_reload_keeps_previous_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    write_atomically(&path, ONE_APP.as_bytes()).await.unwrap();

    let store = ConfigStore::load(Box::new(FileConfigSource::new(&path))).await.unwrap();

    tokio::fs::remove_file(&path).await.unwrap();
    let err = store.reload().await.unwrap_err();

    assert!(matches!(err, Error::ConfigLoad(_)));
    assert_eq!(store.snapshot().await.app_names(), vec!["web"]);
}

#[tokio::test]
async fn remote_source_downloads_and_caches() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("iplist_config").join("config.json");
    let blobs = Arc::new(MockBlobStore::new());
    blobs.put("config-bucket", "prod/config.json", ONE_APP.as_bytes());

    let source = RemoteConfigSource::new(
        blobs.clone(),
        "config-bucket",
        "prod/config.json",
        FileConfigSource::new(&cache),
    );
    let store = ConfigStore::load(Box::new(source)).await.unwrap();
    assert_eq!(store.snapshot().await.app_names(), vec!["web"]);
    assert!(cache.exists());

    // A newer remote copy overwrites the cache, keeping a backup
    blobs.put("config-bucket", "prod/config.json", TWO_APPS.as_bytes());
    store.reload().await.unwrap();
    assert_eq!(store.snapshot().await.app_names().len(), 2);
    assert!(backup_path(&cache).exists());
}

#[tokio::test]
async fn remote_source_falls_back_to_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("config.json");
    write_atomically(&cache, ONE_APP.as_bytes()).await.unwrap();

    let blobs = Arc::new(MockBlobStore::new());
    blobs.set_unavailable(true);
    let source = RemoteConfigSource::new(blobs.clone(), "b", "k", FileConfigSource::new(&cache))
        .with_retry_policy(fast_retry_policy());

    let store = ConfigStore::load(Box::new(source)).await.unwrap();
    assert_eq!(store.snapshot().await.app_names(), vec!["web"]);
    // First attempt plus two retries before falling back
    assert_eq!(blobs.fetch_count(), 3);
}

#[tokio::test]
async fn remote_download_is_retried_when_throttled() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("config.json");

    let blobs = Arc::new(MockBlobStore::new());
    blobs.put("b", "k", TWO_APPS.as_bytes());
    blobs.fail_next(2);
    let source = RemoteConfigSource::new(blobs.clone(), "b", "k", FileConfigSource::new(&cache))
        .with_retry_policy(fast_retry_policy());

    let store = ConfigStore::load(Box::new(source)).await.unwrap();
    assert_eq!(store.snapshot().await.app_names(), vec!["web", "api"]);
    assert_eq!(blobs.fetch_count(), 3);
    assert!(cache.exists(), "the downloaded copy is cached");
}

#[tokio::test]
async fn remote_source_without_cache_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = Arc::new(MockBlobStore::new());
    blobs.set_unavailable(true);
    let source = RemoteConfigSource::new(
        blobs,
        "b",
        "k",
        FileConfigSource::new(dir.path().join("absent.json")),
    )
    .with_retry_policy(fast_retry_policy());

    let err = ConfigStore::load(Box::new(source)).await.unwrap_err();
    assert!(matches!(err, Error::ConfigLoad(_)));
}

#[tokio::test]
async fn invalid_remote_document_keeps_cache_intact() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("config.json");
    write_atomically(&cache, ONE_APP.as_bytes()).await.unwrap();

    let blobs = Arc::new(MockBlobStore::new());
    blobs.put("b", "k", b"{\"apps\": [{\"name\": \"\"}]}");
    let source = RemoteConfigSource::new(blobs, "b", "k", FileConfigSource::new(&cache));

    let err = ConfigStore::load(Box::new(source)).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(tokio::fs::read_to_string(&cache).await.unwrap(), ONE_APP);
}
