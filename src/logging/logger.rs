//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{LayerEntry, LayerStatus, Log};
use super::utils::{DRY_RUN_TARGET, SCRIPT_TARGET, STAGE_TARGET, log_file_path};
use crate::exec::OutputStream;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// Messages go through [`tracing`]; the subscriber installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) renders them on the
/// console and appends them to `$XDG_CACHE_HOME/caravan/<command>.log`.
#[derive(Debug)]
pub struct Logger {
    layers: Mutex<Vec<LayerEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary; the file
    /// itself is owned by the tracing file layer.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            layers: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return a clone of all recorded layer entries.
    #[must_use]
    pub fn layer_entries(&self) -> Vec<LayerEntry> {
        self.layers.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Log a line of install script output.
    pub fn script_output(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => tracing::info!(target: SCRIPT_TARGET, "{line}"),
            OutputStream::Stderr => tracing::warn!(target: SCRIPT_TARGET, "{line}"),
        }
    }

    /// Record a layer result for the summary.
    pub fn record_layer(&self, name: &str, status: LayerStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.layers.lock() {
            guard.push(LayerEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of failed layers.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.layers.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|l| l.status == LayerStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded layers.
    pub fn print_summary(&self) {
        let layers = match self.layers.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if layers.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut installed = 0u32;
        let mut skipped = 0u32;
        let mut dry_run = 0u32;
        let mut failed = 0u32;

        for layer in &layers {
            let (icon, color) = match layer.status {
                LayerStatus::Installed => {
                    installed += 1;
                    ("✓", "\x1b[32m")
                }
                LayerStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                LayerStatus::DryRun => {
                    dry_run += 1;
                    ("~", "\x1b[37m")
                }
                LayerStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = layer
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", layer.name));
        }

        let total = installed + skipped + dry_run + failed;
        self.info(&format!(
            "{total} layers: \x1b[32m{installed} installed\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_layer(&self, name: &str, status: LayerStatus, message: Option<&str>) {
        self.record_layer(name, status, message);
    }

    fn script_output(&self, stream: OutputStream, line: &str) {
        self.script_output(stream, line);
    }
}
