//! Named loggers arranged in a dotted hierarchy (`a.b` is a child of `a`).
//!
//! The registry is reached through [`LoggerRegistry`] so tests can work on a
//! private [`Registry`] while production code uses [`global`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;

use super::{Handler, Level, PowertoolsFormatter, Record};

pub const ROOT_LOGGER: &str = "";

#[derive(Debug)]
struct LoggerState {
    handlers: Vec<Handler>,
    level: Level,
    propagate: bool,
}

pub struct RegisteredLogger {
    name: String,
    state: RwLock<LoggerState>,
    parent: RwLock<Option<Arc<RegisteredLogger>>>,
    structured_formatter: OnceCell<Arc<PowertoolsFormatter>>,
}

impl RegisteredLogger {
    fn new(name: &str, level: Level, parent: Option<Arc<RegisteredLogger>>) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(LoggerState {
                handlers: Vec::new(),
                level,
                propagate: true,
            }),
            parent: RwLock::new(parent),
            structured_formatter: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handlers(&self) -> Vec<Handler> {
        self.state.read().handlers.clone()
    }

    pub fn add_handler(&self, handler: Handler) {
        self.state.write().handlers.push(handler);
    }

    /// Replaces the whole handler list.
    pub fn set_handlers(&self, handlers: Vec<Handler>) {
        self.state.write().handlers = handlers;
    }

    pub fn level(&self) -> Level {
        self.state.read().level
    }

    pub fn set_level(&self, level: Level) {
        self.state.write().level = level;
    }

    pub fn propagate(&self) -> bool {
        self.state.read().propagate
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.state.write().propagate = propagate;
    }

    pub fn parent(&self) -> Option<Arc<RegisteredLogger>> {
        self.parent.read().clone()
    }

    /// First level set on this logger or an ancestor.
    pub fn effective_level(&self) -> Level {
        let level = self.level();
        if level != Level::NotSet {
            return level;
        }
        let mut next = self.parent();
        while let Some(logger) = next {
            let level = logger.level();
            if level != Level::NotSet {
                return level;
            }
            next = logger.parent();
        }
        Level::NotSet
    }

    pub fn is_enabled_for(&self, level: Level) -> bool {
        level >= self.effective_level()
    }

    /// Formatter shared by every structured logger of the service this
    /// entry is named after, created on first use.
    pub fn structured_formatter(&self) -> Arc<PowertoolsFormatter> {
        self.structured_formatter
            .get_or_init(|| Arc::new(PowertoolsFormatter::new(self.name.clone())))
            .clone()
    }

    /// Sends `record` to this logger's handlers and, while `propagate` is
    /// set, to those of each ancestor.
    pub fn log(&self, record: &Record) {
        if !self.is_enabled_for(record.level) {
            return;
        }
        for handler in self.handlers() {
            handler.handle(record);
        }
        if !self.propagate() {
            return;
        }
        let mut next = self.parent();
        while let Some(logger) = next {
            for handler in logger.handlers() {
                handler.handle(record);
            }
            if !logger.propagate() {
                break;
            }
            next = logger.parent();
        }
    }
}

impl fmt::Debug for RegisteredLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("RegisteredLogger")
            .field("name", &self.name)
            .field("level", &state.level)
            .field("propagate", &state.propagate)
            .field("handlers", &state.handlers.len())
            .finish()
    }
}

/// Enumeration and lookup of named loggers.
pub trait LoggerRegistry: Send + Sync {
    /// Names of every registered logger, root excluded.
    fn names(&self) -> Vec<String>;

    fn get(&self, name: &str) -> Option<Arc<RegisteredLogger>>;

    fn get_or_create(&self, name: &str) -> Arc<RegisteredLogger>;

    fn root(&self) -> Arc<RegisteredLogger>;
}

impl<T: LoggerRegistry + ?Sized> LoggerRegistry for Arc<T> {
    fn names(&self) -> Vec<String> {
        (**self).names()
    }

    fn get(&self, name: &str) -> Option<Arc<RegisteredLogger>> {
        (**self).get(name)
    }

    fn get_or_create(&self, name: &str) -> Arc<RegisteredLogger> {
        (**self).get_or_create(name)
    }

    fn root(&self) -> Arc<RegisteredLogger> {
        (**self).root()
    }
}

impl<T: LoggerRegistry + ?Sized> LoggerRegistry for &T {
    fn names(&self) -> Vec<String> {
        (**self).names()
    }

    fn get(&self, name: &str) -> Option<Arc<RegisteredLogger>> {
        (**self).get(name)
    }

    fn get_or_create(&self, name: &str) -> Arc<RegisteredLogger> {
        (**self).get_or_create(name)
    }

    fn root(&self) -> Arc<RegisteredLogger> {
        (**self).root()
    }
}

#[derive(Debug)]
pub struct Registry {
    root: Arc<RegisteredLogger>,
    loggers: RwLock<BTreeMap<String, Arc<RegisteredLogger>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            root: Arc::new(RegisteredLogger::new(ROOT_LOGGER, Level::Warning, None)),
            loggers: RwLock::new(BTreeMap::new()),
        }
    }

    fn nearest_ancestor(
        &self,
        loggers: &BTreeMap<String, Arc<RegisteredLogger>>,
        name: &str,
    ) -> Arc<RegisteredLogger> {
        let mut prefix = name;
        while let Some(dot) = prefix.rfind('.') {
            prefix = &prefix[..dot];
            if let Some(logger) = loggers.get(prefix) {
                return logger.clone();
            }
        }
        self.root.clone()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerRegistry for Registry {
    fn names(&self) -> Vec<String> {
        self.loggers.read().keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<Arc<RegisteredLogger>> {
        if name == ROOT_LOGGER {
            return Some(self.root.clone());
        }
        self.loggers.read().get(name).cloned()
    }

    fn get_or_create(&self, name: &str) -> Arc<RegisteredLogger> {
        if let Some(logger) = self.get(name) {
            return logger;
        }
        let mut loggers = self.loggers.write();
        if let Some(logger) = loggers.get(name) {
            return logger.clone();
        }

        let parent = self.nearest_ancestor(&loggers, name);
        let logger = Arc::new(RegisteredLogger::new(name, Level::NotSet, Some(parent)));

        // Descendants created earlier may point past the new entry.
        let prefix = format!("{name}.");
        for (child_name, child) in loggers.range(prefix.clone()..) {
            if !child_name.starts_with(&prefix) {
                break;
            }
            let mut parent = child.parent.write();
            let skips_new_entry = parent
                .as_ref()
                .map_or(true, |p| p.name.len() < name.len());
            if skips_new_entry {
                *parent = Some(logger.clone());
            }
        }

        loggers.insert(name.to_string(), logger.clone());
        logger
    }

    fn root(&self) -> Arc<RegisteredLogger> {
        self.root.clone()
    }
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// The process-wide registry.
pub fn global() -> &'static Registry {
    &GLOBAL
}
