use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A diagnostic entry for the execution error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub message: String,
    pub details: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorLogEntry {
    /// Missing details are stored as an empty object, never omitted.
    pub fn new(message: impl Into<String>, details: Option<Map<String, Value>>) -> Self {
        Self {
            message: message.into(),
            details: details.unwrap_or_default(),
            timestamp: Utc::now(),
        }
    }
}
