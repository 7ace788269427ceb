use crate::StorageError;
use std::{
    collections::HashMap,
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

/// Key/value storage that lives as long as the host session.
pub trait SessionStorage: Debug + Send + Sync {
    /// Read a value. `Ok(None)` when the key does not exist.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing the previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Check that the storage can round trip a value.
pub fn can_use_session_storage(storage: &dyn SessionStorage) -> bool {
    const PROBE_KEY: &str = "AI_storage_probe";
    let marker = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos().to_string())
        .unwrap_or_else(|_| "0".into());
    let round_trip = storage
        .set_item(PROBE_KEY, &marker)
        .and_then(|()| storage.get_item(PROBE_KEY));
    let removed = storage.remove_item(PROBE_KEY).is_ok();
    matches!(round_trip, Ok(Some(value)) if value == marker) && removed
}

/// Process-lifetime [`SessionStorage`].
#[derive(Debug, Default)]
pub struct InMemorySessionStorage {
    items: Mutex<HashMap<String, String>>,
}

impl InMemorySessionStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStorage for InMemorySessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items().remove(key);
        Ok(())
    }
}

/// [`SessionStorage`] keeping one file per key in a directory, so buffered telemetry
/// survives a restart of the host process.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    dir: PathBuf,
}

impl FileSessionStorage {
    /// Use `dir` for storage. The directory is created if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            || key.starts_with('.')
        {
            return Err(StorageError::Write {
                key: key.into(),
                reason: "key is not usable as a file name".into(),
            });
        }
        Ok(self.dir.join(key))
    }
}

impl SessionStorage for FileSessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Read {
                key: key.into(),
                reason: err.to_string(),
            }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Temporary file, then rename over the slot.
        let path = self.path(key)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
