//! State shared by every layer installed in one run.
use std::sync::Arc;

use crate::config::Config;
use crate::error::ExitReason;
use crate::exec::Executor;
use crate::logging::Log;
use crate::resources::conflict::{ConflictPrompter, ConflictResolver};

use super::tracker::LayerTracker;

/// Counts of non-fatal problems seen during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Malformed directive lines and unreadable directive arguments.
    pub parse_errors: usize,
    /// Link sources the user declined to create.
    pub aborted_creations: usize,
    /// Link or run directives that failed.
    pub failed_directives: usize,
}

impl RunReport {
    /// Exit reason for a run that reached the end of the manifest.
    ///
    /// Parse errors take precedence over declined creations, which take
    /// precedence over failed directives.
    ///
    /// # Examples
    ///
    /// ```
    /// use caravan::error::ExitReason;
    /// use caravan::layers::context::RunReport;
    ///
    /// let report = RunReport { parse_errors: 0, aborted_creations: 1, failed_directives: 2 };
    /// assert_eq!(report.exit_reason(), ExitReason::CreationAborted);
    /// assert_eq!(RunReport::default().exit_reason(), ExitReason::Success);
    /// ```
    #[must_use]
    pub const fn exit_reason(&self) -> ExitReason {
        if self.parse_errors > 0 {
            ExitReason::ParseError
        } else if self.aborted_creations > 0 {
            ExitReason::CreationAborted
        } else if self.failed_directives > 0 {
            ExitReason::DirectiveFailed
        } else {
            ExitReason::Success
        }
    }
}

/// Shared context for one install run.
pub struct RunContext {
    /// Resolved run configuration.
    pub config: Config,
    /// Logger for output and layer recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Source of answers for interactive questions.
    pub prompter: Arc<dyn ConflictPrompter>,
    /// Conflict decisions, including the sticky choice.
    pub conflicts: ConflictResolver,
    /// Visit state and install order of layers.
    pub layers: LayerTracker,
    /// Non-fatal problem counts.
    pub report: RunReport,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .field("log", &"<dyn Log>")
            .field("executor", &self.executor)
            .field("prompter", &"<dyn ConflictPrompter>")
            .field("conflicts", &self.conflicts)
            .field("layers", &self.layers)
            .field("report", &self.report)
            .finish()
    }
}

impl RunContext {
    /// Create a context with no layers visited and no sticky choice.
    #[must_use]
    pub fn new(
        config: Config,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        prompter: Arc<dyn ConflictPrompter>,
    ) -> Self {
        Self {
            config,
            log,
            executor,
            prompter,
            conflicts: ConflictResolver::new(),
            layers: LayerTracker::new(),
            report: RunReport::default(),
        }
    }

    /// Whether the layer named `layer` has been installed in this run.
    #[must_use]
    pub fn is_installed(&self, layer: &str) -> bool {
        self.layers.is_installed(&self.config.layer_dir(layer))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::RecordingExecutor;
    use crate::logging::BufferedLog;
    use crate::resources::conflict::ScriptedPrompter;
    use std::path::PathBuf;

    #[test]
    fn exit_reason_priority() {
        let all = RunReport {
            parse_errors: 1,
            aborted_creations: 1,
            failed_directives: 1,
        };
        assert_eq!(all.exit_reason(), ExitReason::ParseError);
        let failed = RunReport {
            failed_directives: 3,
            ..RunReport::default()
        };
        assert_eq!(failed.exit_reason(), ExitReason::DirectiveFailed);
    }

    #[test]
    fn debug_hides_trait_objects() {
        let ctx = RunContext::new(
            Config::new(PathBuf::from("/work")),
            Arc::new(BufferedLog::new()),
            Arc::new(RecordingExecutor::new()),
            Arc::new(ScriptedPrompter::new()),
        );
        let debug = format!("{ctx:?}");
        assert!(debug.contains("<dyn Log>"));
        assert!(debug.contains("/work"));
    }
}
