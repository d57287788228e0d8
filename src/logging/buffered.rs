//! In-memory logger that records every message instead of printing it.
use std::sync::Mutex;

use super::types::{LayerEntry, LayerStatus, Log};

/// A single captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// A stage header entry.
    Stage(String),
    /// An informational entry.
    Info(String),
    /// A debug entry.
    Debug(String),
    /// A warning entry.
    Warn(String),
    /// An error entry.
    Error(String),
    /// A dry-run entry.
    DryRun(String),
}

impl LogEntry {
    /// The message text regardless of level.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Stage(m)
            | Self::Info(m)
            | Self::Debug(m)
            | Self::Warn(m)
            | Self::Error(m)
            | Self::DryRun(m) => m,
        }
    }
}

/// Implement the display methods of [`Log`] by pushing each message into
/// `self.entries` as the corresponding [`LogEntry`] variant.
macro_rules! buffer_log_methods {
    ($($method:ident => $variant:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                if let Ok(mut guard) = self.entries.lock() {
                    guard.push(LogEntry::$variant(msg.to_string()));
                }
            }
        )+
    };
}

/// Logger that captures output in memory.
///
/// Used wherever the caller needs to inspect what a run reported, e.g. to
/// assert that a malformed directive was flagged.
#[derive(Debug, Default)]
pub struct BufferedLog {
    entries: Mutex<Vec<LogEntry>>,
    layers: Mutex<Vec<LayerEntry>>,
}

impl BufferedLog {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured entries in emission order.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// All recorded layer results in order.
    #[must_use]
    pub fn layer_entries(&self) -> Vec<LayerEntry> {
        self.layers.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Captured error messages.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Error(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Captured warning messages.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Warn(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Return `true` if any captured message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.message().contains(needle))
    }
}

impl Log for BufferedLog {
    buffer_log_methods!(
        stage => Stage,
        info => Info,
        debug => Debug,
        warn => Warn,
        error => Error,
        dry_run => DryRun,
    );

    fn record_layer(&self, name: &str, status: LayerStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.layers.lock() {
            guard.push(LayerEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn captures_messages_in_order() {
        let log = BufferedLog::new();
        log.stage("Layer: shell");
        log.info("Symlinking a -> b");
        log.warn("careful");
        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], LogEntry::Stage("Layer: shell".to_string()));
        assert_eq!(entries[2].message(), "careful");
    }

    #[test]
    fn errors_and_warnings_are_filtered_by_level() {
        let log = BufferedLog::new();
        log.error("boom");
        log.warn("hmm");
        log.info("fine");
        assert_eq!(log.errors(), vec!["boom"]);
        assert_eq!(log.warnings(), vec!["hmm"]);
        assert!(log.contains("fin"));
        assert!(!log.contains("absent"));
    }

    #[test]
    fn records_layers() {
        let log = BufferedLog::new();
        log.record_layer("shell", LayerStatus::Installed, None);
        assert_eq!(log.layer_entries()[0].name, "shell");
    }
}
