//! Structured JSON logging with a hierarchical logger registry.
//!
//! A [`Logger`] renders records through a shared [`PowertoolsFormatter`].
//! [`copy_config_to_registered_loggers`] hands its handler and level to the
//! other loggers of a [`LoggerRegistry`], so output produced through them,
//! including `tracing` events bridged by [`RegistryLayer`], ends up in the
//! same JSON shape.

pub mod config;
pub mod formatter;
pub mod handler;
pub mod layer;
pub mod level;
pub mod logger;
pub mod record;
pub mod registry;
pub mod utils;

pub use config::LoggerConfig;
pub use formatter::{Formatter, PlainFormatter, PowertoolsFormatter};
pub use handler::Handler;
pub use layer::RegistryLayer;
pub use level::Level;
pub use logger::{Logger, LoggerBuilder};
pub use record::Record;
pub use registry::{global, LoggerRegistry, RegisteredLogger, Registry};
pub use utils::{copy_config_to_registered_loggers, CopyConfig, PACKAGE_LOGGER};
