//! Utilities for AWS Lambda functions: typed views over AWS Config rule
//! events and a structured JSON logger whose configuration can be copied
//! onto other registered loggers.

pub mod data_classes;
pub mod logging;

pub use data_classes::aws_config_event::{AwsConfigEvent, InvokingEvent};
pub use logging::{copy_config_to_registered_loggers, CopyConfig, Level, Logger};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("missing key '{0}'")]
    MissingKey(String),
    #[error("malformed payload at '{key}': {source}")]
    MalformedPayload {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("value at '{key}' is not {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("unknown log level '{0}'")]
    InvalidLevel(String),
}
