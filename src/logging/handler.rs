use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Formatter, Level, PlainFormatter, Record};

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

#[derive(Clone)]
enum Sink {
    Stream(SharedWriter),
    Stdout,
    Null,
}

/// Destination of formatted records.
///
/// Cloning is shallow: the clone writes to the same stream and renders with
/// the same formatter instance.
#[derive(Clone)]
pub struct Handler {
    sink: Sink,
    formatter: Option<Arc<dyn Formatter>>,
    level: Level,
}

impl Handler {
    pub fn stream(writer: impl Write + Send + 'static) -> Self {
        Self::with_sink(Sink::Stream(Arc::new(Mutex::new(Box::new(writer)))))
    }

    pub fn stdout() -> Self {
        Self::with_sink(Sink::Stdout)
    }

    /// Discards everything it receives.
    pub fn null() -> Self {
        Self::with_sink(Sink::Null)
    }

    fn with_sink(sink: Sink) -> Self {
        Self {
            sink,
            formatter: None,
            level: Level::NotSet,
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn formatter(&self) -> Option<&Arc<dyn Formatter>> {
        self.formatter.as_ref()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn is_null(&self) -> bool {
        matches!(self.sink, Sink::Null)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.sink, Sink::Stream(_) | Sink::Stdout)
    }

    /// Formats and writes `record` if it passes the handler's level.
    /// Write failures never reach the caller.
    pub fn handle(&self, record: &Record) {
        if record.level < self.level || self.is_null() {
            return;
        }
        let line = match &self.formatter {
            Some(formatter) => formatter.format(record),
            None => PlainFormatter.format(record),
        };
        if let Err(err) = self.emit(&line) {
            tracing::warn!(logger = %record.logger, error = %err, "failed to write log record");
        }
    }

    fn emit(&self, line: &str) -> io::Result<()> {
        match &self.sink {
            Sink::Stream(writer) => {
                let mut writer = writer.lock();
                writeln!(writer, "{line}")?;
                writer.flush()
            }
            Sink::Stdout => {
                let mut out = io::stdout().lock();
                writeln!(out, "{line}")
            }
            Sink::Null => Ok(()),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sink = match self.sink {
            Sink::Stream(_) => "stream",
            Sink::Stdout => "stdout",
            Sink::Null => "null",
        };
        f.debug_struct("Handler")
            .field("sink", &sink)
            .field("formatter", &self.formatter)
            .field("level", &self.level)
            .finish()
    }
}
