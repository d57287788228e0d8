//! Per-run layer bookkeeping: visit state, cycle detection, install order.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::LayerError;

/// Visit state of a layer within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerState {
    /// Not reached yet.
    #[default]
    Unvisited,
    /// Currently being installed; reaching it again means a cycle.
    InProgress,
    /// Installed earlier in this run.
    Done,
}

/// Tracks which layers have been installed and which are in progress.
///
/// Layers are keyed by their resolved directory, so two spellings of the same
/// path are one layer.  The name a layer was first reached by is what
/// [`installed`](Self::installed) and cycle messages show.
#[derive(Debug, Default)]
pub struct LayerTracker {
    states: HashMap<PathBuf, LayerState>,
    stack: Vec<(PathBuf, String)>,
    installed: Vec<String>,
}

impl LayerTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of the layer at `dir`.
    #[must_use]
    pub fn state(&self, dir: &Path) -> LayerState {
        self.states.get(dir).copied().unwrap_or_default()
    }

    /// Whether the layer at `dir` finished installing in this run.
    #[must_use]
    pub fn is_installed(&self, dir: &Path) -> bool {
        self.state(dir) == LayerState::Done
    }

    /// Mark the layer at `dir`, reached as `name`, as in progress.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::DependencyCycle`] with the cycle path if the
    /// layer is already in progress.
    pub fn begin(&mut self, dir: &Path, name: &str) -> Result<(), LayerError> {
        if self.state(dir) == LayerState::InProgress {
            let start = self
                .stack
                .iter()
                .position(|(d, _)| d == dir)
                .unwrap_or_default();
            let mut path: Vec<&str> = self
                .stack
                .iter()
                .skip(start)
                .map(|(_, n)| n.as_str())
                .collect();
            path.push(name);
            return Err(LayerError::DependencyCycle(path.join(" → ")));
        }
        self.states.insert(dir.to_path_buf(), LayerState::InProgress);
        self.stack.push((dir.to_path_buf(), name.to_string()));
        Ok(())
    }

    /// Mark the layer at `dir` as installed and append it to the install
    /// order under the name it was begun with.
    pub fn finish(&mut self, dir: &Path) {
        let name = self
            .stack
            .iter()
            .rposition(|(d, _)| d == dir)
            .map(|pos| self.stack.remove(pos).1);
        if self.states.insert(dir.to_path_buf(), LayerState::Done) != Some(LayerState::Done)
            && let Some(name) = name
        {
            self.installed.push(name);
        }
    }

    /// Layers installed so far, in completion order.
    #[must_use]
    pub fn installed(&self) -> &[String] {
        &self.installed
    }
}
