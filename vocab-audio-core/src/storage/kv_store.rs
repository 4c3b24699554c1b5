use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::models::error::AudioError;
use crate::traits::store::KeyValueStore;

/// In-memory store. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AudioError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), AudioError> {
        self.entries.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), AudioError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// One file per key under a directory.
///
/// Keys are percent-encoded into flat file names, so `recording/w1` becomes
/// `recording%2Fw1` and no key can escape the directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, AudioError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| AudioError::StorageError(format!("failed to create directory: {}", e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
                name.push(byte as char);
            } else {
                name.push_str(&format!("%{:02X}", byte));
            }
        }
        // "." and ".." are valid encodings of themselves; keep them off the filesystem.
        if name.chars().all(|c| c == '.') {
            name = name.replace('.', "%2E");
        }
        self.root.join(name)
    }
}

impl KeyValueStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AudioError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AudioError::StorageError(format!("failed to read {}: {}", key, e))),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), AudioError> {
        fs::write(self.path_for(key), value)
            .map_err(|e| AudioError::StorageError(format!("failed to write {}: {}", key, e)))
    }

    fn clear(&self, key: &str) -> Result<(), AudioError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AudioError::StorageError(format!("failed to remove {}: {}", key, e))),
        }
    }
}

/// Primary store with a best-effort secondary.
///
/// Writes go to the primary and, when it fails, to the secondary. Reads
/// consult the secondary when the primary misses or errors.
pub struct FallbackStore<P: KeyValueStore, S: KeyValueStore> {
    primary: P,
    secondary: S,
}

impl<P: KeyValueStore, S: KeyValueStore> FallbackStore<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: KeyValueStore, S: KeyValueStore> KeyValueStore for FallbackStore<P, S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AudioError> {
        match self.primary.get(key) {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => self.secondary.get(key),
            Err(e) => {
                log::warn!("Primary store read failed for {}, trying secondary: {}", key, e);
                self.secondary.get(key)
            }
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), AudioError> {
        match self.primary.set(key, value) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("Primary store write failed for {}, using secondary: {}", key, e);
                self.secondary.set(key, value)
            }
        }
    }

    fn clear(&self, key: &str) -> Result<(), AudioError> {
        let primary = self.primary.clear(key);
        let secondary = self.secondary.clear(key);
        match (primary, secondary) {
            (Err(e), Err(_)) => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _: &str) -> Result<Option<Vec<u8>>, AudioError> {
            Err(AudioError::StorageError("offline".into()))
        }
        fn set(&self, _: &str, _: &[u8]) -> Result<(), AudioError> {
            Err(AudioError::StorageError("offline".into()))
        }
        fn clear(&self, _: &str) -> Result<(), AudioError> {
            Err(AudioError::StorageError("offline".into()))
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vocab_audio_store_{}_{}", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        store.clear("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.clear("missing").unwrap();
    }

    #[test]
    fn directory_store_round_trip() {
        let dir = temp_dir("roundtrip");
        let store = DirectoryStore::open(&dir).unwrap();

        store.set("recording/w1", b"RIFF").unwrap();
        assert_eq!(store.get("recording/w1").unwrap(), Some(b"RIFF".to_vec()));
        assert!(dir.join("recording%2Fw1").exists());

        store.clear("recording/w1").unwrap();
        assert_eq!(store.get("recording/w1").unwrap(), None);
        store.clear("recording/w1").unwrap();

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn directory_store_keeps_keys_inside_root() {
        let dir = temp_dir("escape");
        let store = DirectoryStore::open(&dir).unwrap();
        store.set("../outside", b"x").unwrap();
        store.set("..", b"y").unwrap();
        assert_eq!(store.get("..").unwrap(), Some(b"y".to_vec()));
        for entry in fs::read_dir(&dir).unwrap() {
            assert_eq!(entry.unwrap().path().parent().unwrap(), dir.as_path());
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn fallback_writes_to_secondary_when_primary_fails() {
        let store = FallbackStore::new(BrokenStore, MemoryStore::new());
        store.set("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        store.clear("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn fallback_reads_secondary_on_miss() {
        let secondary = MemoryStore::new();
        secondary.set("k", b"old").unwrap();
        let store = FallbackStore::new(MemoryStore::new(), secondary);
        assert_eq!(store.get("k").unwrap(), Some(b"old".to_vec()));

        store.set("k", b"new").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn fallback_fails_when_both_fail() {
        let store = FallbackStore::new(BrokenStore, BrokenStore);
        assert!(store.set("k", b"v").is_err());
        assert!(store.clear("k").is_err());
    }
}
