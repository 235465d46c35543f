use std::fmt;
use std::str::FromStr;

use crate::AppError;

/// Severity of a log record. `NotSet` on a logger defers to its ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Level {
    #[default]
    NotSet = 0,
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::NotSet => "NOTSET",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Level::NotSet),
            10 => Some(Level::Debug),
            20 => Some(Level::Info),
            30 => Some(Level::Warning),
            40 => Some(Level::Error),
            50 => Some(Level::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts names in any case (`warn` and `fatal` as aliases) or the
/// numeric values.
impl FromStr for Level {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(value) = s.parse::<u8>() {
            return Level::from_value(value).ok_or_else(|| AppError::InvalidLevel(s.to_string()));
        }
        match s.to_ascii_uppercase().as_str() {
            "NOTSET" => Ok(Level::NotSet),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            _ => Err(AppError::InvalidLevel(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warning,
            tracing::Level::INFO => Level::Info,
            _ => Level::Debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("50".parse::<Level>().unwrap(), Level::Critical);
        assert!(matches!("loud".parse::<Level>(), Err(AppError::InvalidLevel(_))));
        assert!("15".parse::<Level>().is_err());
    }

    #[test]
    fn ordering_follows_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Critical > Level::Error);
        assert_eq!(Level::Warning.to_string(), "WARNING");
    }
}
