use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use copydesk_logging::{desk_debug, desk_warn};
use ron::ser::PrettyConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store directory missing or not writable: {0}")]
    Dir(String),
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
    #[error("could not encode value: {0}")]
    Encode(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A directory whose files are only ever swapped in whole.
#[derive(Debug, Clone)]
pub struct AtomicDir {
    root: PathBuf,
}

impl AtomicDir {
    /// Creates `root` if needed and checks that files can be staged in it.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let unusable = |err: io::Error| StoreError::Dir(format!("{}: {err}", root.display()));
        fs::create_dir_all(&root).map_err(unusable)?;
        tempfile::tempfile_in(&root).map_err(unusable)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stages `content` next to `name` and renames it into place. Readers see
    /// the previous bytes or the new ones, never a partial write.
    pub fn replace_file(&self, name: &str, content: &str) -> Result<PathBuf, StoreError> {
        let target = self.root.join(name);
        let mut staged = NamedTempFile::new_in(&self.root)?;
        staged.write_all(content.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&target).map_err(|err| StoreError::Io(err.error))?;
        Ok(target)
    }
}

/// String key-value persistence shared by the session stores.
pub trait KvStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// One `{key}.ron` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: AtomicDir,
}

impl FileKvStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self {
            dir: AtomicDir::open(dir)?,
        })
    }

    fn filename(key: &str) -> Result<String, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(format!("{key}.ron"))
        } else {
            Err(StoreError::InvalidKey(key.to_string()))
        }
    }
}

impl KvStore for FileKvStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.dir.root().join(Self::filename(key)?);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.dir.replace_file(&Self::filename(key)?, value)?;
        desk_debug!("saved {} ({} bytes)", path.display(), value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.dir.root().join(Self::filename(key)?);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// A typed value bound to one store key: loaded when the session opens and
/// written back on every mutation.
pub struct SessionStore<T> {
    store: Arc<dyn KvStore>,
    key: String,
    value: T,
}

impl<T> SessionStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Loads the stored value, falling back to `T::default()` when the key is
    /// absent or its content no longer decodes.
    pub fn open(store: Arc<dyn KvStore>, key: impl Into<String>) -> Result<Self, StoreError> {
        let key = key.into();
        let value = match store.load(&key)? {
            Some(text) => ron::from_str(&text).unwrap_or_else(|err| {
                desk_warn!("discarding unreadable session value {}: {}", key, err);
                T::default()
            }),
            None => T::default(),
        };
        Ok(Self { store, key, value })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn update(&mut self, mutate: impl FnOnce(&mut T)) -> Result<(), StoreError> {
        mutate(&mut self.value);
        self.persist()
    }

    pub fn replace(&mut self, value: T) -> Result<(), StoreError> {
        self.value = value;
        self.persist()
    }

    /// Resets to the default value and deletes the stored copy.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.value = T::default();
        self.store.remove(&self.key)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let text = ron::ser::to_string_pretty(&self.value, PrettyConfig::default())
            .map_err(|err| StoreError::Encode(err.to_string()))?;
        self.store.save(&self.key, &text)
    }
}
