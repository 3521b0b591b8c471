mod file;
#[cfg(test)]
mod memory;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::InvoiceSnapshot;

pub use file::FileStore;
#[cfg(test)]
pub use memory::MemoryStore;

/// The single key the invoice lives under.
pub const STORAGE_KEY: &str = "invoiceData";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode stored data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Local key-value storage, in the shape of a browser's `localStorage`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;
}

/// One-way mirror of the invoice into a key-value store.
///
/// This is the only type that touches the store. None of its operations
/// fail: write errors are logged and the in-memory invoice stays
/// authoritative, unreadable data loads as an empty invoice.
pub struct InvoiceMirror<S> {
    store: S,
}

impl<S: KeyValueStore> InvoiceMirror<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn save(&mut self, snapshot: &InvoiceSnapshot) {
        let result = serde_json::to_string(snapshot)
            .map_err(StorageError::from)
            .and_then(|text| self.store.set(STORAGE_KEY, &text));

        match result {
            Ok(()) => debug!(items = snapshot.items.len(), "Invoice saved"),
            Err(err) => warn!(error = %err, "Failed to save invoice, keeping in-memory copy"),
        }
    }

    pub fn load(&self) -> InvoiceSnapshot {
        let text = match self.store.get(STORAGE_KEY) {
            Ok(Some(text)) => text,
            Ok(None) => return InvoiceSnapshot::default(),
            Err(err) => {
                warn!(error = %err, "Failed to read saved invoice");
                return InvoiceSnapshot::default();
            }
        };

        match serde_json::from_str(&text) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "Saved invoice is malformed, starting empty");
                InvoiceSnapshot::default()
            }
        }
    }

    pub fn clear(&mut self) {
        if let Err(err) = self.store.delete(STORAGE_KEY) {
            warn!(error = %err, "Failed to delete saved invoice");
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
