use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use copydesk_engine::{
    AtomicDir, FileKvStore, KvStore, MemoryKvStore, SessionStore,
    StoreError,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn creates_missing_store_dir() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("state").join("nested");
    let opened = AtomicDir::open(&dir).unwrap();
    assert!(dir.is_dir());
    assert_eq!(opened.root(), dir.as_path());
}

#[test]
fn atomic_write_replaces_existing_content() {
    let temp = TempDir::new().unwrap();
    let dir = AtomicDir::open(temp.path()).unwrap();

    let first = dir.replace_file("cache.ron", "one").unwrap();
    let second = dir.replace_file("cache.ron", "two").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "two");
    // Only the target remains; temp files were renamed away.
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn file_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let not_a_dir = temp.path().join("plain");
    fs::write(&not_a_dir, "x").unwrap();

    assert!(matches!(FileKvStore::open(&not_a_dir), Err(StoreError::Dir(_))));
    assert_eq!(fs::read_to_string(&not_a_dir).unwrap(), "x");
}

#[test]
fn file_store_round_trips_and_removes() {
    let temp = TempDir::new().unwrap();
    let store = FileKvStore::open(temp.path().join("kv")).unwrap();

    assert_eq!(store.load("missing").unwrap(), None);
    store.save("greeting", "hello").unwrap();
    store.save("greeting", "hello again").unwrap();
    assert_eq!(store.load("greeting").unwrap().as_deref(), Some("hello again"));
    assert!(temp.path().join("kv").join("greeting.ron").is_file());

    store.remove("greeting").unwrap();
    store.remove("greeting").unwrap();
    assert_eq!(store.load("greeting").unwrap(), None);
    assert!(matches!(store.load("../etc"), Err(StoreError::InvalidKey(_))));
}

#[test]
fn memory_store_behaves_like_file_store() {
    let store = MemoryKvStore::new();
    assert_eq!(store.load("k").unwrap(), None);
    store.save("k", "v").unwrap();
    assert_eq!(store.load("k").unwrap().as_deref(), Some("v"));
    store.remove("k").unwrap();
    assert_eq!(store.load("k").unwrap(), None);
}

#[test]
fn session_store_loads_at_open_and_persists_on_mutation() {
    let temp = TempDir::new().unwrap();
    let backend: Arc<dyn KvStore> = Arc::new(FileKvStore::open(temp.path()).unwrap());

    let mut session: SessionStore<BTreeMap<String, u32>> =
        SessionStore::open(backend.clone(), "counters").unwrap();
    assert!(session.get().is_empty());
    session
        .update(|counters| {
            counters.insert("drafts".to_string(), 2);
        })
        .unwrap();

    let reopened: SessionStore<BTreeMap<String, u32>> =
        SessionStore::open(backend.clone(), "counters").unwrap();
    assert_eq!(reopened.get().get("drafts"), Some(&2));

    session.clear().unwrap();
    assert_eq!(backend.load("counters").unwrap(), None);
}

#[test]
fn unreadable_session_value_falls_back_to_default() {
    let backend: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    backend.save("counters", "this is not ron {").unwrap();

    let mut session: SessionStore<Vec<String>> = SessionStore::open(backend.clone(), "counters").unwrap();
    assert!(session.get().is_empty());
    session.replace(vec!["fresh".to_string()]).unwrap();

    let reopened: SessionStore<Vec<String>> = SessionStore::open(backend, "counters").unwrap();
    assert_eq!(reopened.get(), &vec!["fresh".to_string()]);
}
