use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{error, info};

use crate::domain::ErrorLogEntry;
use crate::store::{append_record, DocumentStore};

/// Best-effort writer for the execution error log.
#[derive(Clone)]
pub struct ErrorLog {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl ErrorLog {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Append an entry. A failed write is only reported on the console.
    pub fn record(&self, message: &str, details: Option<Map<String, Value>>) {
        let entry = ErrorLogEntry::new(message, details);

        match append_record(self.store.as_ref(), &self.collection, &entry) {
            Ok(_) => info!(collection = %self.collection, "Error '{}' saved to the error log", message),
            Err(e) => {
                error!("Failed to save error log entry: {}", e);
                error!("Original error that could not be saved: {}", message);
            }
        }
    }
}
