use std::fmt;

use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Debug,
    Warn,
    Error,
}

impl LogLevel {
    pub const fn label(self) -> &'static str {
        match self {
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Warn => "Warning",
            LogLevel::Error => "Error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub type LogSink = Box<dyn FnMut(LogLevel, &str)>;

/// Drops DEBUG lines before they reach the wrapped sink, leaving other levels untouched.
pub fn without_debug(mut sink: impl FnMut(LogLevel, &str) + 'static) -> LogSink {
    Box::new(move |level, message| {
        if level != LogLevel::Debug {
            sink(level, message);
        }
    })
}

/// Mirrors every loop diagnostic into `tracing` and, when registered, the host sink.
#[derive(Default)]
pub(crate) struct LoopLogger {
    sink: Option<LogSink>,
}

impl LoopLogger {
    pub(crate) fn set_sink(&mut self, sink: LogSink) {
        self.sink = Some(sink);
    }

    pub(crate) fn log(&mut self, level: LogLevel, title: &str, message: impl fmt::Display) {
        let line = format!("{title}:  {message}");
        match level {
            LogLevel::Info => info!(target: "engine::loop", "{line}"),
            LogLevel::Debug => debug!(target: "engine::loop", "{line}"),
            LogLevel::Warn => warn!(target: "engine::loop", "{line}"),
            LogLevel::Error => error!(target: "engine::loop", "{line}"),
        }
        if let Some(sink) = self.sink.as_mut() {
            sink(level, &line);
        }
    }
}

impl fmt::Debug for LoopLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopLogger")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
