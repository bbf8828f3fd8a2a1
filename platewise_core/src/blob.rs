//! Keyed blob persistence with file locking.
//!
//! Each collection is stored as an independent JSON blob under a fixed key.
//! Loading is fail-soft: a missing, unreadable or undecodable blob is
//! reported as absent and the caller starts from an empty collection.

use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

pub const DAILY_ENTRIES_KEY: &str = "dailyEntries";
pub const SAVED_FOOD_ITEMS_KEY: &str = "savedFoodItems";
pub const WEIGHT_ENTRIES_KEY: &str = "weightEntries";
pub const USER_SETTINGS_KEY: &str = "userSettings";

/// Storage backend holding one string blob per key
pub trait BlobStore {
    /// Returns `None` when the blob is absent or cannot be read
    fn load(&self, key: &str) -> Option<String>;

    fn save(&mut self, key: &str, contents: &str) -> Result<()>;
}

/// Decode the blob under `key`, falling back to `T::default()`
pub fn load_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: BlobStore + ?Sized,
{
    let Some(contents) = store.load(key) else {
        tracing::debug!("No blob stored for {}, starting empty", key);
        return T::default();
    };

    match serde_json::from_str::<T>(&contents) {
        Ok(value) => {
            tracing::debug!("Loaded blob {}", key);
            value
        }
        Err(e) => {
            tracing::warn!("Failed to decode blob {}: {}. Starting empty.", key, e);
            T::default()
        }
    }
}

/// Encode `value` as JSON and store it under `key`
pub fn save_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: BlobStore + ?Sized,
{
    let contents = serde_json::to_string(value)?;
    store.save(key, &contents)
}

/// One `<key>.json` file per blob inside a data directory
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for JsonFileStore {
    /// Read a blob with shared locking
    fn load(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open {:?}: {}. Treating as absent.", path, e);
                return None;
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock {:?}: {}. Treating as absent.", path, e);
            return None;
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read = reader.read_to_string(&mut contents);
        let _ = file.unlock();

        match read {
            Ok(_) => Some(contents),
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}. Treating as absent.", path, e);
                None
            }
        }
    }

    /// Atomically replace a blob: temp file, fsync, rename
    fn save(&mut self, key: &str, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved blob {} to {:?}", key, path);
        Ok(())
    }
}

/// Blobs held in memory only
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw blob, bypassing encoding
    pub fn insert(&mut self, key: impl Into<String>, contents: impl Into<String>) {
        self.blobs.insert(key.into(), contents.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(String::as_str)
    }
}

impl BlobStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.blobs.get(key).cloned()
    }

    fn save(&mut self, key: &str, contents: &str) -> Result<()> {
        self.blobs.insert(key.to_string(), contents.to_string());
        Ok(())
    }
}
