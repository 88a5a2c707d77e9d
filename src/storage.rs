use crate::paths::AppPaths;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(not(target_os = "android"))]
use fs2::FileExt;

/// A named-slot string store, the shape of a platform preferences file.
pub trait KeyValueStore {
    fn get(&self, slot: &str) -> Result<Option<String>>;
    fn put(&mut self, slot: &str, value: &str) -> Result<()>;
}

/// One JSON file per namespace, holding a flat `slot -> string` object.
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Opens `<data dir>/<namespace>.json`. The file is created on first write.
    pub fn open(namespace: &str) -> Result<Self> {
        Ok(Self {
            path: AppPaths::get_prefs_path(namespace)?,
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Helper to get a sidecar lock file path (e.g., "Reminders.json.lock")
    #[cfg(not(target_os = "android"))]
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Execute a closure while holding an exclusive lock on the sidecar file.
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        #[cfg(target_os = "android")]
        {
            let _ = file_path;
            f()
        }

        #[cfg(not(target_os = "android"))]
        {
            let lock_path = Self::get_lock_path(file_path);
            let file = fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)
                .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;

            file.lock_exclusive()?;
            let result = f();
            FileExt::unlock(&file)?;
            result
        }
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    fn read_slots(path: &Path) -> Result<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(path)?;
        let slots = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt preferences file: {:?}", path))?;
        Ok(slots)
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, slot: &str) -> Result<Option<String>> {
        Self::with_lock(&self.path, || {
            Ok(Self::read_slots(&self.path)?.remove(slot))
        })
    }

    fn put(&mut self, slot: &str, value: &str) -> Result<()> {
        let path = self.path.clone();
        Self::with_lock(&path, || {
            let mut slots = Self::read_slots(&path)?;
            slots.insert(slot.to_string(), value.to_string());
            let json = serde_json::to_string_pretty(&slots)?;
            Self::atomic_write(&path, json)
        })
    }
}

/// Volatile store, also counts writes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: HashMap<String, String>,
    writes: usize,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(slot: &str, value: &str) -> Self {
        let mut store = Self::default();
        store.slots.insert(slot.to_string(), value.to_string());
        store
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Makes every subsequent `put` fail.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, slot: &str) -> Result<Option<String>> {
        Ok(self.slots.get(slot).cloned())
    }

    fn put(&mut self, slot: &str, value: &str) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("write to slot '{}' rejected", slot);
        }
        self.slots.insert(slot.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_storage_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::at(dir.path().join("Reminders.json"));
        assert_eq!(storage.get("reminders_list").unwrap(), None);
    }

    #[test]
    fn test_local_storage_put_then_get_keeps_other_slots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Reminders.json");
        let mut storage = LocalStorage::at(&path);

        storage.put("reminders_list", "[]").unwrap();
        storage.put("other", "x").unwrap();
        storage.put("reminders_list", "[1]").unwrap();

        let reopened = LocalStorage::at(&path);
        assert_eq!(reopened.get("reminders_list").unwrap().as_deref(), Some("[1]"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_local_storage_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Reminders.json");
        fs::write(&path, "{not json").unwrap();
        let storage = LocalStorage::at(&path);
        assert!(storage.get("reminders_list").is_err());
    }

    #[test]
    fn test_memory_storage_counts_writes() {
        let mut storage = MemoryStorage::new();
        storage.put("a", "1").unwrap();
        storage.put("a", "2").unwrap();
        assert_eq!(storage.writes(), 2);
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("2"));

        storage.set_fail_writes(true);
        assert!(storage.put("a", "3").is_err());
        assert_eq!(storage.writes(), 2);
    }
}
