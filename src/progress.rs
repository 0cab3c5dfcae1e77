// src/progress.rs
//! The outward progress channel of a sync run.
//!
//! The engine reports human-readable lines at fixed points: inventory fetch
//! start and count, reconciliation counts, every entity's write result, and
//! run completion or failure. Per-entity failures are only visible here and
//! in the returned outcomes, never as a run-level error.

use std::fmt;

/// Severity of a progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Receives progress lines from a run.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, level: LogLevel, message: &str);

    fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message);
    }
}

/// Any `Fn(LogLevel, &str)` closure is a sink.
impl<F> ProgressSink for F
where
    F: Fn(LogLevel, &str) + Send + Sync,
{
    fn emit(&self, level: LogLevel, message: &str) {
        self(level, message)
    }
}

/// Forwards progress lines to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => log::info!(target: "clipsync::progress", "{}", message),
            LogLevel::Warn => log::warn!(target: "clipsync::progress", "{}", message),
            LogLevel::Error => log::error!(target: "clipsync::progress", "{}", message),
        }
    }
}
