// Logging module - subscriber setup and in-memory diagnostics capture
//
// Everything goes to stderr through the fmt layer, optionally mirrored to a
// rotating JSON file. Warnings and errors are also captured in a bounded
// buffer so a render run can report what went wrong once it finishes.

use crate::config::{LogRotation, LoggingConfig};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Maximum number of log entries to keep in memory
const MAX_LOG_ENTRIES: usize = 1000;

/// A single log entry captured from tracing
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
}

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<&Level> for LogLevel {
    fn from(level: &Level) -> Self {
        match *level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            Level::DEBUG => LogLevel::Debug,
            Level::TRACE => LogLevel::Trace,
        }
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:5} {}: {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.level.as_str(),
            self.target,
            self.message
        )
    }
}

/// In-memory log buffer with bounded size (ring buffer)
#[derive(Clone, Default)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES))),
        }
    }

    // A panic while holding the lock leaves plain data behind; keep using it
    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a log entry, dropping the oldest when full
    pub fn add(&self, entry: LogEntry) {
        let mut entries = self.lock();
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// All entries, most recent last
    pub fn get_all(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.lock().iter().filter(|e| e.level == level).count()
    }

    /// One-line tally such as "1 error, 2 warnings", or None when nothing
    /// was captured
    pub fn summary(&self) -> Option<String> {
        let errors = self.count(LogLevel::Error);
        let warnings = self.count(LogLevel::Warn);
        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(plural(errors, "error"));
        }
        if warnings > 0 {
            parts.push(plural(warnings, "warning"));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Diagnostics layer
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing layer that copies events at or above `min_level` into a buffer
pub struct DiagnosticsLayer {
    buffer: LogBuffer,
    min_level: LogLevel,
}

impl DiagnosticsLayer {
    /// Capture warnings and errors
    pub fn new(buffer: LogBuffer) -> Self {
        Self::with_level(buffer, LogLevel::Warn)
    }

    pub fn with_level(buffer: LogBuffer, min_level: LogLevel) -> Self {
        Self { buffer, min_level }
    }
}

impl<S> Layer<S> for DiagnosticsLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = LogLevel::from(metadata.level());
        // Error < Warn < ... so "at or above" is "less or equal"
        if level > self.min_level {
            return;
        }

        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));

        self.buffer.add(LogEntry {
            timestamp: Utc::now(),
            level,
            target: metadata.target().to_string(),
            message,
        });
    }
}

/// Visitor to extract the message from a tracing event
struct MessageVisitor<'a>(&'a mut String);

impl<'a> tracing::field::Visit for MessageVisitor<'a> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            *self.0 = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{:?}", value);
            // Remove the quotes that Debug adds
            if self.0.len() >= 2 && self.0.starts_with('"') && self.0.ends_with('"') {
                *self.0 = self.0[1..self.0.len() - 1].to_string();
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriber setup
// ─────────────────────────────────────────────────────────────────────────────

/// Install the global subscriber
///
/// Precedence: RUST_LOG env var > config file > default "info".
/// The returned guard flushes the file writer on drop and must outlive
/// the program's logging.
pub fn init(config: &LoggingConfig, diagnostics: LogBuffer) -> Option<WorkerGuard> {
    let default_filter = format!("chapel={}", config.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(DiagnosticsLayer::new(diagnostics))
        .with(stderr);

    if !config.file_enabled {
        registry.init();
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(&config.file_dir) {
        eprintln!(
            "Warning: Could not create log directory {:?}: {}",
            config.file_dir, e
        );
        registry.init();
        return None;
    }

    let file_appender = match config.file_rotation {
        LogRotation::Hourly => {
            tracing_appender::rolling::hourly(&config.file_dir, &config.file_prefix)
        }
        LogRotation::Daily => tracing_appender::rolling::daily(&config.file_dir, &config.file_prefix),
        LogRotation::Never => tracing_appender::rolling::never(&config.file_dir, &config.file_prefix),
    };

    // Writes happen on a background thread; JSON for structured parsing
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    registry
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::registry::Registry;

    fn capture(layer: DiagnosticsLayer, f: impl FnOnce()) {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_captures_warnings_and_errors_only() {
        let buffer = LogBuffer::new();
        capture(DiagnosticsLayer::new(buffer.clone()), || {
            tracing::info!("mounted home-page");
            tracing::warn!("Fetch failed for {}: {}", "pages/home", "HTTP 500");
            tracing::error!("could not write page");
        });

        let entries = buffer.get_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert_eq!(entries[0].message, "Fetch failed for pages/home: HTTP 500");
        assert_eq!(entries[1].level, LogLevel::Error);
        assert_eq!(buffer.summary().as_deref(), Some("1 error, 1 warning"));
    }

    #[test]
    fn test_with_level_widens_capture() {
        let buffer = LogBuffer::new();
        capture(DiagnosticsLayer::with_level(buffer.clone(), LogLevel::Debug), || {
            tracing::debug!("render queued");
            tracing::trace!("not captured");
        });
        assert_eq!(buffer.count(LogLevel::Debug), 1);
        assert_eq!(buffer.get_all().len(), 1);
    }

    #[test]
    fn test_buffer_is_bounded() {
        let buffer = LogBuffer::new();
        for i in 0..MAX_LOG_ENTRIES + 5 {
            buffer.add(LogEntry {
                timestamp: Utc::now(),
                level: LogLevel::Warn,
                target: "chapel".to_string(),
                message: i.to_string(),
            });
        }
        let entries = buffer.get_all();
        assert_eq!(entries.len(), MAX_LOG_ENTRIES);
        assert_eq!(entries[0].message, "5");
        assert_eq!(buffer.summary().as_deref(), Some("1000 warnings"));
    }

    #[test]
    fn test_empty_buffer_has_no_summary() {
        let buffer = LogBuffer::new();
        capture(DiagnosticsLayer::new(buffer.clone()), || {
            tracing::info!("rendered 6 page(s)");
        });
        assert!(buffer.get_all().is_empty());
        assert_eq!(buffer.summary(), None);
    }

    #[test]
    fn test_entry_display() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Error,
            target: "chapel::site".to_string(),
            message: "boom".to_string(),
        };
        assert!(entry.to_string().ends_with("ERROR chapel::site: boom"));
    }
}
