//! Read-only wrappers over Lambda event payloads.

pub mod aws_config_event;
pub mod common;

pub use common::DictWrapper;
