use std::fmt;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::registry::LoggerRegistry;
use super::utils::PACKAGE_LOGGER;
use super::{Level, Record};

/// Routes `tracing` events into registry loggers named after their target,
/// with `::` turned into `.` (`hyper::client` logs through `hyper.client`).
///
/// Events from this crate are left to other layers; they may be emitted
/// while a handler is writing.
pub struct RegistryLayer<R> {
    registry: R,
}

impl<R> RegistryLayer<R>
where
    R: LoggerRegistry + 'static,
{
    pub fn new(registry: R) -> Self {
        Self { registry }
    }
}

pub fn logger_name_for_target(target: &str) -> String {
    target.replace("::", ".")
}

impl<S, R> Layer<S> for RegistryLayer<R>
where
    S: Subscriber,
    R: LoggerRegistry + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if target == PACKAGE_LOGGER || target.starts_with("powertools_lambda::") {
            return;
        }

        let logger = self.registry.get_or_create(&logger_name_for_target(target));
        let level = Level::from(*metadata.level());
        if !logger.is_enabled_for(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let location = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => format!("{file}:{line}"),
            _ => metadata.module_path().unwrap_or(target).to_string(),
        };
        let mut record = Record::new(level, logger.name(), visitor.message).with_location(location);
        record.extra = visitor.fields;
        logger.log(&record);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Map<String, Value>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.into());
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{value:?}").into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::registry::Registry;
    use crate::logging::{Handler, PowertoolsFormatter};
    use parking_lot::Mutex;
    use std::io::{self, Write};
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn target_names_become_dotted() {
        assert_eq!(logger_name_for_target("hyper::client::pool"), "hyper.client.pool");
    }

    #[test]
    fn events_reach_the_logger_named_after_their_target() {
        let registry = Arc::new(Registry::new());
        let buffer = Buffer::default();
        let formatter = Arc::new(PowertoolsFormatter::new("svc"));
        let dependency = registry.get_or_create("dependency");
        dependency.set_handlers(vec![Handler::stream(buffer.clone()).with_formatter(formatter)]);
        dependency.set_level(Level::Info);

        let subscriber = tracing_subscriber::registry().with(RegistryLayer::new(registry.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "dependency::pool", size = 4, "pool ready");
            tracing::debug!(target: "dependency::pool", "filtered out");
        });

        let out = String::from_utf8(buffer.0.lock().clone()).unwrap();
        let lines: Vec<Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["message"], "pool ready");
        assert_eq!(lines[0]["level"], "INFO");
        assert_eq!(lines[0]["size"], 4);
        assert!(registry.names().contains(&"dependency.pool".to_string()));
    }
}
