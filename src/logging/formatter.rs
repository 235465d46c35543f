use std::fmt;

use chrono::SecondsFormat;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::Record;

/// Renders a record into one line of output (without the trailing newline).
pub trait Formatter: Send + Sync + fmt::Debug {
    fn format(&self, record: &Record) -> String;
}

/// `LEVEL:logger:message`, used by handlers that have no formatter set.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainFormatter;

impl Formatter for PlainFormatter {
    fn format(&self, record: &Record) -> String {
        format!("{}:{}:{}", record.level, record.logger, record.message)
    }
}

/// JSON formatter carrying the keys bound to a service.
///
/// Every handler copied from a logger shares the same instance, so keys
/// appended later show up in all of their records.
#[derive(Debug)]
pub struct PowertoolsFormatter {
    keys: RwLock<Map<String, Value>>,
}

impl PowertoolsFormatter {
    pub fn new(service: impl Into<String>) -> Self {
        let mut keys = Map::new();
        keys.insert("service".to_string(), Value::String(service.into()));
        Self {
            keys: RwLock::new(keys),
        }
    }

    /// Adds or overwrites keys. `null` values remove the key instead.
    pub fn append_keys<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut bound = self.keys.write();
        for (key, value) in keys {
            let key = key.into();
            if value.is_null() {
                bound.remove(&key);
            } else {
                bound.insert(key, value);
            }
        }
    }

    pub fn remove_keys<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut bound = self.keys.write();
        for key in keys {
            bound.remove(key.as_ref());
        }
    }

    /// Drops every bound key except `service`.
    pub fn clear_keys(&self) {
        self.keys.write().retain(|key, _| key == "service");
    }

    pub fn keys(&self) -> Map<String, Value> {
        self.keys.read().clone()
    }

    pub fn service(&self) -> Option<String> {
        self.keys
            .read()
            .get("service")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

impl Formatter for PowertoolsFormatter {
    fn format(&self, record: &Record) -> String {
        let mut out = self.keys.read().clone();
        for (key, value) in &record.extra {
            if !value.is_null() {
                out.insert(key.clone(), value.clone());
            }
        }
        // record fields win over keys of the same name
        out.insert("level".into(), record.level.as_str().into());
        out.insert("location".into(), record.location.clone().into());
        out.insert("message".into(), record.message.clone().into());
        out.insert(
            "timestamp".into(),
            record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        );
        Value::Object(out).to_string()
    }
}
