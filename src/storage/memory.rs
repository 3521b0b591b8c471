use std::collections::HashMap;
use std::io;

use super::{KeyValueStore, StorageError};

/// In-process store. `fail_writes` simulates a full or disabled storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    pub fail_writes: bool,
}

impl MemoryStore {
    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "quota exceeded").into());
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.entries.remove(key);
        Ok(())
    }
}
