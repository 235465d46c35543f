use std::error::Error as StdError;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lambda_runtime::Context;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::config::LoggerConfig;
use super::registry::{global, LoggerRegistry, RegisteredLogger};
use super::{Formatter, Handler, Level, PowertoolsFormatter, Record};

static COLD_START: AtomicBool = AtomicBool::new(true);

/// Structured JSON logger scoped to a service.
///
/// The service logger owns the entry named after the service and a single
/// stream handler. Child loggers (`service.<name>`) have no handler of their
/// own and propagate to it. Both share one [`PowertoolsFormatter`], so keys
/// appended through either show up in every record of the service.
#[derive(Debug, Clone)]
pub struct Logger {
    service: String,
    entry: Arc<RegisteredLogger>,
    service_entry: Arc<RegisteredLogger>,
    formatter: Arc<PowertoolsFormatter>,
    child: bool,
    log_event: bool,
}

pub struct LoggerBuilder<'a> {
    config: LoggerConfig,
    child: Option<String>,
    handler: Option<Handler>,
    registry: Option<&'a dyn LoggerRegistry>,
}

impl Logger {
    /// Builder seeded from the environment.
    pub fn builder<'a>() -> LoggerBuilder<'a> {
        LoggerBuilder::from_config(LoggerConfig::from_env())
    }

    pub fn name(&self) -> &str {
        self.entry.name()
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn is_child(&self) -> bool {
        self.child
    }

    pub fn parent_name(&self) -> Option<String> {
        self.entry.parent().map(|p| p.name().to_string())
    }

    pub fn registered_logger(&self) -> &Arc<RegisteredLogger> {
        &self.entry
    }

    pub fn formatter(&self) -> Arc<PowertoolsFormatter> {
        self.formatter.clone()
    }

    /// The stream handler of the service, shared by child loggers.
    pub fn handler(&self) -> Option<Handler> {
        self.service_entry.handlers().into_iter().next()
    }

    pub fn level(&self) -> Level {
        self.entry.effective_level()
    }

    pub fn set_level(&self, level: Level) {
        self.service_entry.set_level(level);
    }

    pub fn append_keys<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.formatter.append_keys(keys);
    }

    pub fn remove_keys<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.formatter.remove_keys(keys);
    }

    /// Appends `keys`, or replaces every bound key when `append` is false.
    pub fn structure_logs<I, K>(&self, append: bool, keys: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        if !append {
            self.formatter.clear_keys();
        }
        self.formatter.append_keys(keys);
    }

    /// Binds the invocation's function metadata and cold start flag.
    pub fn inject_lambda_context(&self, ctx: &Context) {
        let cold_start = COLD_START.swap(false, Ordering::SeqCst);
        self.append_keys([
            ("function_name", json!(ctx.env_config.function_name)),
            ("function_memory_size", json!(ctx.env_config.memory)),
            ("function_arn", json!(ctx.invoked_function_arn)),
            ("function_request_id", json!(ctx.request_id)),
            ("cold_start", json!(cold_start)),
            ("xray_trace_id", json!(ctx.xray_trace_id)),
        ]);
    }

    /// Logs `event` at INFO when `POWERTOOLS_LOGGER_LOG_EVENT` is enabled.
    #[track_caller]
    pub fn log_incoming_event<T: Serialize>(&self, event: &T) {
        if !self.log_event {
            return;
        }
        let event = serde_json::to_value(event).unwrap_or_else(|err| json!(err.to_string()));
        let record = Record::new(Level::Info, self.name(), "incoming event").with_extra("event", event);
        self.entry.log(&record);
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl fmt::Display) {
        self.entry.log(&Record::new(level, self.name(), message.to_string()));
    }

    /// Logs `message` with extra keys for this record only.
    #[track_caller]
    pub fn log_with(&self, level: Level, message: impl fmt::Display, extra: Map<String, Value>) {
        let mut record = Record::new(level, self.name(), message.to_string());
        record.extra = extra;
        self.entry.log(&record);
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    #[track_caller]
    pub fn warning(&self, message: impl fmt::Display) {
        self.log(Level::Warning, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message);
    }

    #[track_caller]
    pub fn critical(&self, message: impl fmt::Display) {
        self.log(Level::Critical, message);
    }

    /// ERROR record carrying the error chain under `exception`.
    #[track_caller]
    pub fn exception(&self, message: impl fmt::Display, err: &(dyn StdError + 'static)) {
        let mut chain = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }
        let record = Record::new(Level::Error, self.name(), message.to_string())
            .with_extra("exception", chain);
        self.entry.log(&record);
    }
}

impl<'a> LoggerBuilder<'a> {
    pub fn from_config(config: LoggerConfig) -> Self {
        Self {
            config,
            child: None,
            handler: None,
            registry: None,
        }
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.config.service = service.into();
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.config.level = level;
        self
    }

    pub fn sample_rate(mut self, rate: f64) -> Self {
        self.config.sample_rate = rate;
        self
    }

    pub fn log_event(mut self, log_event: bool) -> Self {
        self.config.log_event = log_event;
        self
    }

    /// Makes this a child logger named `service.<name>`.
    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.child = Some(name.into());
        self
    }

    /// Output stream; defaults to stdout.
    pub fn writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.handler = Some(Handler::stream(writer));
        self
    }

    pub fn registry(mut self, registry: &'a dyn LoggerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Logger {
        let registry: &dyn LoggerRegistry = match self.registry {
            Some(registry) => registry,
            None => global(),
        };
        let LoggerConfig {
            service,
            level,
            sample_rate,
            log_event,
        } = self.config;

        let service_entry = registry.get_or_create(&service);
        let formatter = service_entry.structured_formatter();
        if sample_rate > 0.0 {
            formatter.append_keys([("sampling_rate", json!(sample_rate))]);
        }

        let entry = match &self.child {
            Some(name) => registry.get_or_create(&format!("{service}.{name}")),
            None => {
                let handler = self
                    .handler
                    .unwrap_or_else(Handler::stdout)
                    .with_formatter(formatter.clone() as Arc<dyn Formatter>);
                service_entry.set_handlers(vec![handler]);
                service_entry.set_propagate(false);
                let sampled = sample_rate > 0.0 && fastrand::f64() <= sample_rate;
                service_entry.set_level(if sampled { Level::Debug } else { level });
                service_entry.clone()
            }
        };

        Logger {
            service,
            entry,
            service_entry,
            formatter,
            child: self.child.is_some(),
            log_event,
        }
    }
}
