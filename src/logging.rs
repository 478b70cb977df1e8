//! Injected diagnostics.
//!
//! The engine never prints. Every diagnostic goes through the [`Logger`]
//! carried by [`Config`](crate::Config), which forwards a level plus
//! preformatted arguments to a [`LogSink`]. The default sink hands records to
//! `tracing`; hosts that want something else implement [`LogSink`].

use std::fmt;
use std::sync::Arc;

use tracing::Level;

/// Destination for diagnostic records.
pub trait LogSink: Send + Sync {
    /// Receive one record.
    fn log(&self, level: Level, args: fmt::Arguments<'_>);
}

/// Forwards records to the `tracing` macros under target `pollws`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        match level {
            Level::ERROR => tracing::error!(target: "pollws", "{}", args),
            Level::WARN => tracing::warn!(target: "pollws", "{}", args),
            Level::INFO => tracing::info!(target: "pollws", "{}", args),
            Level::DEBUG => tracing::debug!(target: "pollws", "{}", args),
            _ => tracing::trace!(target: "pollws", "{}", args),
        }
    }
}

/// Sink that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl LogSink for DiscardSink {
    fn log(&self, _level: Level, _args: fmt::Arguments<'_>) {}
}

/// Cheap, clonable handle to a [`LogSink`].
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Wrap a custom sink.
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Share an existing sink (useful when the caller keeps a handle to it).
    pub fn from_arc(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Logger backed by [`TracingSink`].
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    /// Logger that discards everything.
    #[must_use]
    pub fn discard() -> Self {
        Self::new(DiscardSink)
    }

    /// Emit one record.
    #[inline]
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.sink.log(level, args);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logger")
    }
}

/// `log_event!(logger, LEVEL, "fmt", args..)`
macro_rules! log_event {
    ($logger:expr, $level:ident, $($arg:tt)+) => {
        $logger.log(::tracing::Level::$level, format_args!($($arg)+))
    };
}

pub(crate) use log_event;
