use super::*;

#[tokio::test]
async fn sets_and_gets_values() {
    let store = SqliteCacheStore::new("sqlite::memory:").await.expect("db");
    store.set("continents", "[\"Asia\"]").await.expect("set");
    assert_eq!(
        store.get("continents").await.expect("get").as_deref(),
        Some("[\"Asia\"]")
    );
    assert_eq!(store.get("missing").await.expect("get"), None);
}

#[tokio::test]
async fn set_overwrites_existing_key() {
    let store = SqliteCacheStore::new("sqlite::memory:").await.expect("db");
    store.set("saved_at", "first").await.expect("set");
    store.set("saved_at", "second").await.expect("overwrite");

    let entry = store.entry("saved_at").await.expect("entry").expect("present");
    assert_eq!(entry.value, "second");
    assert_eq!(store.keys().await.expect("keys"), vec!["saved_at".to_string()]);
}

#[tokio::test]
async fn remove_and_clear_drop_entries() {
    let store = SqliteCacheStore::new("sqlite::memory:").await.expect("db");
    store.set("a", "1").await.expect("set a");
    store.set("b", "2").await.expect("set b");

    store.remove("a").await.expect("remove");
    assert_eq!(store.get("a").await.expect("get"), None);
    assert_eq!(store.get("b").await.expect("get").as_deref(), Some("2"));

    store.clear().await.expect("clear");
    assert!(store.keys().await.expect("keys").is_empty());
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let store = SqliteCacheStore::new("sqlite::memory:").await.expect("db");
    store.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("cache.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let store = SqliteCacheStore::new(&database_url).await.expect("db");
    store.set("k", "v").await.expect("set");
    drop(store);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    let reopened = SqliteCacheStore::new(&database_url).await.expect("reopen");
    assert_eq!(reopened.get("k").await.expect("get").as_deref(), Some("v"));
}

#[tokio::test]
async fn memory_store_behaves_like_a_map() {
    let store = MemoryCacheStore::new();
    assert!(store.is_empty().await);
    store.set("x", "1").await.expect("set");
    store.set("y", "2").await.expect("set");
    assert_eq!(store.len().await, 2);
    store.remove("x").await.expect("remove");
    assert_eq!(store.get("x").await.expect("get"), None);
    store.clear().await.expect("clear");
    assert!(store.is_empty().await);
}

#[test]
fn sqlite_path_ignores_memory_and_non_sqlite_urls() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("postgres://localhost/db"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/cache.db?mode=rwc"),
        Some(PathBuf::from("./data/cache.db"))
    );
}
