//! Persistent storage for conversation history.
//!
//! The whole history is kept as one JSON array under a single key of a
//! key-value storage. Every write replaces the previous snapshot; there is no
//! append log. Reading is forgiving: a missing or corrupt blob is an empty
//! history, and malformed elements inside an otherwise valid array are
//! skipped so the rest of the history survives.

use super::models::{HistoryError, Record};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Default key under which the history blob is stored.
pub const DEFAULT_STORAGE_KEY: &str = "chat-history";

/// Errors reported by a [`KeyValueStorage`] backend.
#[derive(Debug)]
pub enum StorageError {
    /// Underlying file I/O failed.
    Io(std::io::Error),

    /// The write would exceed the storage quota.
    QuotaExceeded {
        /// Bytes the storage would hold after the write.
        requested: usize,
        /// Maximum bytes the storage accepts.
        limit: usize,
    },

    /// The key cannot be used with this backend.
    InvalidKey(String),

    /// The backend is temporarily unusable (for example a poisoned lock).
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "Storage I/O error: {}", err),
            StorageError::QuotaExceeded { requested, limit } => write!(
                f,
                "Storage quota exceeded: {} bytes requested (limit: {})",
                requested, limit
            ),
            StorageError::InvalidKey(key) => write!(f, "Invalid storage key: {:?}", key),
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

/// A string key-value storage, modelled on browser local storage.
///
/// Methods take `&self`; backends that need mutation use interior
/// mutability, the same way a storage handle is shared in a browser.
pub trait KeyValueStorage {
    /// Reads the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes `key`. Deleting an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed storage: one `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary file that is renamed over the target, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates a storage rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a storage in the default per-user location.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the home directory cannot be determined.
    pub fn in_default_location() -> Result<Self, StorageError> {
        Ok(Self::new(default_storage_dir()?))
    }

    /// The directory holding the storage files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let temp_path = path.with_extension("json.tmp");
        let mut temp_file = File::create(&temp_path)?;
        temp_file.write_all(value.as_bytes())?;
        temp_file.flush()?;
        temp_file.sync_all()?;
        drop(temp_file);

        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryInner {
    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

/// In-process storage with an optional byte quota.
///
/// Clones share the same underlying map, so a test can keep a handle while
/// the coordinator owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    /// Creates an empty storage without a quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty storage that rejects writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        let storage = Self::new();
        // A fresh mutex cannot be poisoned.
        let _ = storage.set_quota(Some(quota_bytes));
        storage
    }

    /// Changes the quota. `None` removes it.
    pub fn set_quota(&self, quota_bytes: Option<usize>) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        inner.quota_bytes = quota_bytes;
        Ok(())
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        if let Some(limit) = inner.quota_bytes {
            let requested = inner.used_bytes_without(key) + key.len() + value.len();
            if requested > limit {
                return Err(StorageError::QuotaExceeded { requested, limit });
            }
        }
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        inner.entries.remove(key);
        Ok(())
    }
}

/// Reads and writes the history snapshot under one storage key.
#[derive(Debug, Clone)]
pub struct RecordStore<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> RecordStore<S> {
    /// Creates a store using [`DEFAULT_STORAGE_KEY`].
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    /// Creates a store using a custom key.
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The storage key holding the snapshot.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The backing storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Loads all records from storage.
    ///
    /// Never fails: an absent key, an unreadable storage or a corrupt blob
    /// all yield an empty history. Problems are logged at warn level.
    pub fn load(&self) -> Vec<Record> {
        let blob = match self.storage.get(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Could not read history from {:?}: {}", self.key, e);
                return Vec::new();
            }
        };

        match decode_records(&blob) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Discarding history stored under {:?}: {}", self.key, e);
                Vec::new()
            }
        }
    }

    /// Writes `records` as the new snapshot, replacing the previous one.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::SerializationError` if encoding fails and
    /// `HistoryError::PersistenceWriteFailure` if the storage rejects the write.
    pub fn persist(&self, records: &[Record]) -> Result<(), HistoryError> {
        let blob = encode_records(records)?;
        self.storage
            .set(&self.key, &blob)
            .map_err(HistoryError::PersistenceWriteFailure)?;
        log::debug!("Persisted {} history entries", records.len());
        Ok(())
    }

    /// Removes the snapshot key entirely.
    pub fn clear(&self) -> Result<(), HistoryError> {
        self.storage
            .remove(&self.key)
            .map_err(HistoryError::PersistenceWriteFailure)
    }
}

/// Encodes records as a JSON array.
pub fn encode_records(records: &[Record]) -> Result<String, HistoryError> {
    serde_json::to_string(records).map_err(HistoryError::SerializationError)
}

/// Decodes a JSON array of records.
///
/// A blank blob is an empty history. Elements that are not valid records,
/// records with a blank prompt, and repeated ids are skipped with a warning.
///
/// # Errors
///
/// Returns `HistoryError::CorruptPersistedData` if the blob is not a JSON array.
pub fn decode_records(blob: &str) -> Result<Vec<Record>, HistoryError> {
    if blob.trim().is_empty() {
        return Ok(Vec::new());
    }

    let values: Vec<serde_json::Value> =
        serde_json::from_str(blob).map_err(HistoryError::CorruptPersistedData)?;

    let mut records = Vec::with_capacity(values.len());
    let mut seen = HashSet::with_capacity(values.len());
    let mut skipped = 0usize;

    for (index, value) in values.into_iter().enumerate() {
        let record = match serde_json::from_value::<Record>(value) {
            Ok(record) => record,
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping malformed history entry at index {}: {}", index, e);
                continue;
            }
        };

        if let Err(e) = record.validate() {
            skipped += 1;
            log::warn!("Skipping history entry at index {}: {}", index, e);
            continue;
        }

        if !seen.insert(record.id.clone()) {
            skipped += 1;
            log::warn!("Skipping duplicate history entry id {:?}", record.id);
            continue;
        }

        records.push(record);
    }

    if skipped > 0 && skipped > records.len() {
        log::warn!(
            "History has significant corruption ({} skipped entries, {} valid entries)",
            skipped,
            records.len()
        );
    }

    Ok(records)
}

/// Gets the default storage directory.
///
/// Returns `~/.config/chat-history` on Unix-like systems, or the equivalent
/// under `AppData/Roaming` on Windows.
pub fn default_storage_dir() -> Result<PathBuf, StorageError> {
    let config_dir = if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config")
    } else if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        PathBuf::from(user_profile).join("AppData").join("Roaming")
    } else {
        return Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        )));
    };

    Ok(config_dir.join("chat-history"))
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
