use std::collections::HashSet;

use super::registry::{LoggerRegistry, RegisteredLogger};
use super::{Handler, Level, Logger};

/// Loggers owned by this crate; never reconfigured.
pub const PACKAGE_LOGGER: &str = "powertools_lambda";

/// Which loggers [`copy_config_to_registered_loggers`] touches, and at what level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopyConfig {
    /// Only these names are candidates when set.
    pub include: Option<HashSet<String>>,
    /// Skipped even when also included.
    pub exclude: Option<HashSet<String>>,
    /// Defaults to the source logger's level.
    pub log_level: Option<Level>,
}

impl CopyConfig {
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }
}

/// Gives every selected logger in `registry` a copy of `source`'s handler
/// and its level, dropping whatever handlers they had so records are not
/// written twice. Running it again with the same arguments changes nothing.
pub fn copy_config_to_registered_loggers(
    registry: &dyn LoggerRegistry,
    source: &Logger,
    options: &CopyConfig,
) {
    let Some(handler) = source.handler() else {
        tracing::warn!(source = source.name(), "source logger has no handler, nothing to copy");
        return;
    };
    let level = options.log_level.unwrap_or_else(|| source.level());

    for name in find_registered_loggers(registry, source, options) {
        // include names that were never registered are skipped here
        if let Some(logger) = registry.get(&name) {
            configure_logger(&logger, &handler, level);
            tracing::debug!(logger = %name, %level, "logger reconfigured");
        }
    }
}

fn find_registered_loggers(
    registry: &dyn LoggerRegistry,
    source: &Logger,
    options: &CopyConfig,
) -> Vec<String> {
    let mut names = registry.names();
    if let Some(include) = &options.include {
        names.retain(|name| include.contains(name));
    }
    if let Some(exclude) = &options.exclude {
        names.retain(|name| !exclude.contains(name));
    }
    // the source's service and its children keep propagating to the service entry
    let service_children = format!("{}.", source.service());
    names.retain(|name| {
        name != source.name()
            && name != source.service()
            && !name.starts_with(&service_children)
            && !is_package_logger(name)
    });
    names
}

fn is_package_logger(name: &str) -> bool {
    name == PACKAGE_LOGGER
        || name
            .strip_prefix(PACKAGE_LOGGER)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn configure_logger(logger: &RegisteredLogger, handler: &Handler, level: Level) {
    logger.set_handlers(vec![handler.clone()]);
    logger.set_level(level);
    logger.set_propagate(false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::config::LoggerConfig;
    use crate::logging::registry::Registry;
    use crate::logging::LoggerBuilder;

    fn source(registry: &Registry) -> Logger {
        LoggerBuilder::from_config(LoggerConfig::default())
            .service("svc")
            .registry(registry)
            .writer(std::io::sink())
            .build()
    }

    #[test]
    fn reserved_names_are_never_candidates() {
        let registry = Registry::new();
        let source = source(&registry);
        for name in ["powertools_lambda", "powertools_lambda.logging", "powertools_lambdax", "app"] {
            registry.get_or_create(name);
        }

        let names = find_registered_loggers(&registry, &source, &CopyConfig::default());
        assert_eq!(names, vec!["app".to_string(), "powertools_lambdax".to_string()]);
    }

    #[test]
    fn include_and_exclude_filters() {
        let registry = Registry::new();
        let source = source(&registry);
        for name in ["a", "b", "c"] {
            registry.get_or_create(name);
        }

        let options = CopyConfig::default().include(["a", "b", "svc", "ghost"]).exclude(["a"]);
        assert_eq!(find_registered_loggers(&registry, &source, &options), vec!["b".to_string()]);
    }

    #[test]
    fn child_source_skips_its_service_entry() {
        let registry = Registry::new();
        let parent = source(&registry);
        let child = LoggerBuilder::from_config(LoggerConfig::default())
            .service("svc")
            .child("worker")
            .registry(&registry)
            .build();
        registry.get_or_create("other");

        copy_config_to_registered_loggers(&registry, &child, &CopyConfig::default());

        assert_eq!(registry.get("other").unwrap().handlers().len(), 1);
        assert_eq!(registry.get("svc.worker").unwrap().handlers().len(), 0);
        assert_eq!(parent.registered_logger().handlers().len(), 1);
    }

    #[test]
    fn source_without_handler_changes_nothing() {
        let registry = Registry::new();
        let orphan_child = LoggerBuilder::from_config(LoggerConfig::default())
            .service("svc")
            .child("worker")
            .registry(&registry)
            .build();
        let target = registry.get_or_create("target");
        assert!(orphan_child.handler().is_none());

        copy_config_to_registered_loggers(&registry, &orphan_child, &CopyConfig::default());

        assert!(target.handlers().is_empty());
        assert_eq!(target.level(), Level::NotSet);
        assert!(target.propagate());
    }

    #[test]
    fn service_children_are_never_candidates() {
        let registry = Registry::new();
        let parent = source(&registry);
        registry.get_or_create("svc.worker");
        registry.get_or_create("svcx");

        let names = find_registered_loggers(&registry, &parent, &CopyConfig::default());
        assert_eq!(names, vec!["svcx".to_string()]);
    }

    #[test]
    fn sets_level_and_stops_propagation() {
        let registry = Registry::new();
        let source = source(&registry);
        let target = registry.get_or_create("target");

        copy_config_to_registered_loggers(
            &registry,
            &source,
            &CopyConfig::default().log_level(Level::Error),
        );

        assert_eq!(target.level(), Level::Error);
        assert!(!target.propagate());
        assert_eq!(source.level(), Level::Info);
    }
}
