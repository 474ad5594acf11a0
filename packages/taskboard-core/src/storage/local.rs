/// Local filesystem record store.
///
/// Each collection key maps to `<dir>/<key>.json` with:
/// - Atomic writes (write to .tmp, fsync, rename, fsync directory)
/// - Mutex-serialized writes within the process
/// - Keys restricted to `[A-Za-z0-9_-]` so they can never escape `dir`

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{RecordStore, StorageError};

pub struct LocalStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        log::debug!("[taskboard.storage] Opened local store at {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
    fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        // fsync directory for rename durability
        if let Some(dir) = path.parent() {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    }
}

impl RecordStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        Self::atomic_write(&path, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RecordStoreExt;
    use tempfile::TempDir;

    #[test]
    fn test_get_missing_key() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::open(tmp.path()).unwrap();
        assert_eq!(store.get("boards").unwrap(), None);
    }

    #[test]
    fn test_set_get_remove() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::open(tmp.path()).unwrap();

        store.set("boards", "[]").unwrap();
        assert_eq!(store.get("boards").unwrap().as_deref(), Some("[]"));
        assert!(tmp.path().join("boards.json").exists());
        assert!(!tmp.path().join("boards.json.tmp").exists());

        store.remove("boards").unwrap();
        assert_eq!(store.get("boards").unwrap(), None);
        store.remove("boards").unwrap();
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::open(tmp.path()).unwrap();
        store.write_collection("users", &["a", "b"]).unwrap();
        store.write_collection("users", &["c"]).unwrap();
        let users: Vec<String> = store.read_collection("users").unwrap();
        assert_eq!(users, vec!["c"]);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::open(tmp.path()).unwrap();
        assert!(matches!(store.set("../escape", "x"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(store.get(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = LocalStore::open(tmp.path()).unwrap();
            store.write_record("selectedBoardId", &"b42").unwrap();
        }
        let store = LocalStore::open(tmp.path()).unwrap();
        let selected: Option<String> = store.read_record("selectedBoardId").unwrap();
        assert_eq!(selected.as_deref(), Some("b42"));
    }

    #[test]
    fn test_open_creates_nested_dir() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        let store = LocalStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }
}
