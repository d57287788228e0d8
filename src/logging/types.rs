//! Core logging types: layer entries, status, and the [`Log`] trait.
use crate::exec::OutputStream;

/// Layer result for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntry {
    /// Layer identifier as written in the manifest or a `depends` directive.
    pub name: String,
    /// Final status of the layer.
    pub status: LayerStatus,
    /// Optional detail message (e.g., skip reason or failure count).
    pub message: Option<String>,
}

/// Status of a processed layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerStatus {
    /// Every directive of the layer completed.
    Installed,
    /// The layer has no directive file and was not installed.
    Skipped,
    /// The layer was walked in dry-run mode; nothing was changed.
    DryRun,
    /// The layer was installed but one or more directives failed or were malformed.
    Failed,
}

/// Abstraction over logging backends.
///
/// Both [`Logger`](super::logger::Logger) (tracing output) and
/// [`BufferedLog`](super::buffered::BufferedLog) (in-memory capture)
/// implement this trait, so engine code logs without knowing where the
/// output goes.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a layer result for the summary.
    fn record_layer(&self, name: &str, status: LayerStatus, message: Option<&str>);

    /// Log one line printed by an install script.  Standard error lines are
    /// warnings.
    fn script_output(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => self.info(line),
            OutputStream::Stderr => self.warn(line),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn layer_status_equality() {
        assert_eq!(LayerStatus::Installed, LayerStatus::Installed);
        assert_ne!(LayerStatus::Installed, LayerStatus::Failed);
        assert_ne!(LayerStatus::Skipped, LayerStatus::DryRun);
    }
}
