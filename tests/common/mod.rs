// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed layer tree and a fluent builder so
// each integration test can set up an isolated root without repeating
// filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use caravan::config::Config;
use caravan::exec::RecordingExecutor;
use caravan::layers::context::RunContext;
use caravan::logging::BufferedLog;
use caravan::resources::conflict::ScriptedPrompter;

/// An isolated layer tree backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct IntegrationTestContext {
    /// Temporary directory acting as the root.
    pub root: tempfile::TempDir,
    /// Captured log output of the last context built.
    pub log: Arc<BufferedLog>,
    /// Executor standing in for `sh` and `sudo`.
    pub executor: Arc<RecordingExecutor>,
}

impl IntegrationTestContext {
    /// Create an empty root.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
            log: Arc::new(BufferedLog::new()),
            executor: Arc::new(RecordingExecutor::new()),
        }
    }

    /// Path to the root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Absolute path of `rel` under the root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Write the manifest listing `layers`.
    pub fn with_manifest(self, layers: &[&str]) -> Self {
        let mut content = layers.join("\n");
        content.push('\n');
        std::fs::write(self.path("caravan.layers"), content).expect("write manifest");
        self
    }

    /// Create layer `name` with the given directive file content.
    pub fn with_layer(self, name: &str, directives: &str) -> Self {
        let dir = self.path(name);
        std::fs::create_dir_all(&dir).expect("create layer dir");
        std::fs::write(dir.join("caravan"), directives).expect("write directive file");
        self
    }

    /// Write a file at `rel`, creating parent directories.
    pub fn with_file(self, rel: &str, content: &str) -> Self {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        std::fs::write(path, content).expect("write file");
        self
    }

    /// Write an executable shell script at `rel`.
    pub fn with_script(self, rel: &str, body: &str) -> Self {
        let this = self.with_file(rel, &format!("#!/bin/sh\n{body}\n"));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            std::fs::set_permissions(this.path(rel), std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");
        }
        this
    }

    /// Build a run context over this root answering prompts from `prompter`.
    pub fn context(&self, prompter: &Arc<ScriptedPrompter>) -> RunContext {
        RunContext::new(
            Config::new(self.root_path().to_path_buf()),
            self.log.clone(),
            self.executor.clone(),
            prompter.clone(),
        )
    }

    /// Build a run context that executes scripts for real.
    pub fn system_context(&self, prompter: &Arc<ScriptedPrompter>) -> RunContext {
        RunContext::new(
            Config::new(self.root_path().to_path_buf()),
            self.log.clone(),
            Arc::new(caravan::exec::SystemExecutor),
            prompter.clone(),
        )
    }

    /// Whether `rel` is a symlink.
    pub fn is_link(&self, rel: &str) -> bool {
        self.path(rel)
            .symlink_metadata()
            .is_ok_and(|m| m.is_symlink())
    }

    /// Entries of the backup directory.
    pub fn backups(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.path("backups")).map_or_else(
            |_| Vec::new(),
            |entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        )
    }
}

/// A prompter with no queued answers; any prompt fails.
pub fn no_prompts() -> Arc<ScriptedPrompter> {
    Arc::new(ScriptedPrompter::new())
}
