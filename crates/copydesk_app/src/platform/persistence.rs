use std::path::Path;
use std::sync::Arc;

use copydesk_core::{CacheEntry, FingerprintKey};
use copydesk_engine::{FileKvStore, KvStore, SessionStore, StoreError};
use copydesk_logging::{desk_info, desk_warn};
use serde::{Deserialize, Serialize};

pub(crate) const CACHE_KEY: &str = "result-cache";

/// Results are kept as JSON text inside the RON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PersistedEntry {
    key: FingerprintKey,
    result: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub(crate) struct PersistedCache {
    entries: Vec<PersistedEntry>,
}

pub(crate) type CacheStore = SessionStore<PersistedCache>;

pub(crate) fn open_cache(dir: &Path) -> Result<CacheStore, StoreError> {
    let backend: Arc<dyn KvStore> = Arc::new(FileKvStore::open(dir)?);
    SessionStore::open(backend, CACHE_KEY)
}

pub(crate) fn cached_entries(store: &CacheStore) -> Vec<CacheEntry> {
    let entries: Vec<CacheEntry> = store
        .get()
        .entries
        .iter()
        .filter_map(|entry| match serde_json::from_str(&entry.result) {
            Ok(result) => Some(CacheEntry {
                key: entry.key.clone(),
                result,
            }),
            Err(err) => {
                desk_warn!("dropping cached result {}: {}", entry.key, err);
                None
            }
        })
        .collect();
    desk_info!("loaded {} cached results", entries.len());
    entries
}

pub(crate) fn save_entries(store: &mut CacheStore, entries: &[CacheEntry]) -> Result<(), StoreError> {
    let persisted = entries
        .iter()
        .map(|entry| PersistedEntry {
            key: entry.key.clone(),
            result: entry.result.to_string(),
        })
        .collect();
    store.replace(PersistedCache { entries: persisted })
}
