//! File-backed cache store.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CacheStore;

/// Durable store keeping one file per key under a directory.
///
/// Values are written as-is; the engine stores JSON text, so the files
/// stay inspectable with ordinary tools.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|error| Error::storage(format!("create {}: {error}", dir.display())))?;
        Ok(Self { dir })
    }

    /// The directory holding the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // keys become file names, so anything path-like is flattened
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        fs::write(&path, value)
            .map_err(|error| Error::storage(format!("write {}: {error}", path.display())))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(Error::storage(format!(
                "remove {}: {error}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_and_remove() {
        let tmp = tempdir().unwrap();
        let mut store = FileStore::open(tmp.path()).unwrap();

        assert_eq!(store.get("pembelian_data"), None);
        store.set("pembelian_data", "[{\"id\":1}]").unwrap();
        assert_eq!(
            store.get("pembelian_data").as_deref(),
            Some("[{\"id\":1}]")
        );

        store.remove("pembelian_data").unwrap();
        assert_eq!(store.get("pembelian_data"), None);
        store.remove("pembelian_data").unwrap();
    }

    #[test]
    fn test_values_survive_reopen() {
        let tmp = tempdir().unwrap();
        {
            let mut store = FileStore::open(tmp.path()).unwrap();
            store.set("last_user_email", "a@b.c").unwrap();
        }
        let store = FileStore::open(tmp.path()).unwrap();
        assert_eq!(store.get("last_user_email").as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_path_like_keys_are_flattened() {
        let tmp = tempdir().unwrap();
        let mut store = FileStore::open(tmp.path()).unwrap();
        store.set("../escape", "x").unwrap();

        // lands inside the store directory, not outside it
        assert!(store.get("../escape").is_some());
        assert!(!tmp.path().parent().unwrap().join("escape.json").exists());
    }
}
