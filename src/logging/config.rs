use std::env;

use super::Level;

pub const SERVICE_NAME_ENV: &str = "POWERTOOLS_SERVICE_NAME";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const SAMPLE_RATE_ENV: &str = "POWERTOOLS_LOGGER_SAMPLE_RATE";
pub const LOG_EVENT_ENV: &str = "POWERTOOLS_LOGGER_LOG_EVENT";

pub const DEFAULT_SERVICE: &str = "service_undefined";

/// Settings a [`Logger`](super::Logger) starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    pub service: String,
    pub level: Level,
    /// Probability in `0.0..=1.0` of switching a new logger to DEBUG.
    pub sample_rate: f64,
    /// Whether the incoming event is logged by `log_incoming_event`.
    pub log_event: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            level: Level::Info,
            sample_rate: 0.0,
            log_event: false,
        }
    }
}

impl LoggerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unparseable values keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let service = lookup(SERVICE_NAME_ENV)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.service);

        let level = match lookup(LOG_LEVEL_ENV) {
            Some(raw) => raw.parse::<Level>().unwrap_or_else(|err| {
                tracing::warn!(%err, "ignoring {LOG_LEVEL_ENV}");
                defaults.level
            }),
            None => defaults.level,
        };

        let sample_rate = match lookup(SAMPLE_RATE_ENV) {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(rate) if (0.0..=1.0).contains(&rate) => rate,
                _ => {
                    tracing::warn!(value = %raw, "ignoring {SAMPLE_RATE_ENV}, expected a number between 0 and 1");
                    defaults.sample_rate
                }
            },
            None => defaults.sample_rate,
        };

        let log_event = lookup(LOG_EVENT_ENV)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(defaults.log_event);

        Self {
            service,
            level,
            sample_rate,
            log_event,
        }
    }
}
