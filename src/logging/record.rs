use std::panic::Location;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::Level;

/// A single log event on its way to handlers.
#[derive(Debug, Clone)]
pub struct Record {
    pub level: Level,
    pub logger: String,
    pub message: String,
    /// `file:line` of the call site.
    pub location: String,
    pub timestamp: DateTime<Utc>,
    /// Per-record keys, rendered after the formatter's bound keys.
    pub extra: Map<String, Value>,
}

impl Record {
    #[track_caller]
    pub fn new(level: Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        let caller = Location::caller();
        Self {
            level,
            logger: logger.into(),
            message: message.into(),
            location: format!("{}:{}", caller.file(), caller.line()),
            timestamp: Utc::now(),
            extra: Map::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
