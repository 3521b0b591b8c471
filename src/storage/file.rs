use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::{KeyValueStore, StorageError};

/// Key-value store kept as one JSON object in a file.
///
/// The file is re-read on every access so that two processes sharing it
/// see each other's writes (last write wins).
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str(&text) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Store file is corrupt, treating as empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write beside the target and rename so a crash never leaves half a file
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));
        assert_eq!(store.get("invoiceData").unwrap(), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut store = FileStore::new(&path);
        store.set("invoiceData", "{\"notes\":\"x\"}").unwrap();
        store.set("other", "kept").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("invoiceData").unwrap().as_deref(), Some("{\"notes\":\"x\"}"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn delete_only_removes_one_key() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("store.json"));
        store.set("invoiceData", "a").unwrap();
        store.set("other", "b").unwrap();

        store.delete("invoiceData").unwrap();
        store.delete("invoiceData").unwrap();

        assert_eq!(store.get("invoiceData").unwrap(), None);
        assert_eq!(store.get("other").unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn corrupt_file_reads_empty_and_is_replaced_on_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "garbage").unwrap();

        let mut store = FileStore::new(&path);
        assert_eq!(store.get("invoiceData").unwrap(), None);

        store.set("invoiceData", "fresh").unwrap();
        assert_eq!(store.get("invoiceData").unwrap().as_deref(), Some("fresh"));
    }
}
