use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{FingerprintKey, Payload};

/// One cached result, as persisted between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: FingerprintKey,
    pub result: Payload,
}

/// Volatile store of completed results, consulted before dispatching an
/// identical request. Entries are idempotent, so the last write wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultCache {
    entries: HashMap<FingerprintKey, Payload>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &FingerprintKey) -> Option<&Payload> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: FingerprintKey, result: Payload) {
        self.entries.insert(key, result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key, so snapshots are deterministic.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self
            .entries
            .iter()
            .map(|(key, result)| CacheEntry {
                key: key.clone(),
                result: result.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    pub fn restore(&mut self, entries: Vec<CacheEntry>) {
        for entry in entries {
            self.entries.insert(entry.key, entry.result);
        }
    }
}
