//! Symlink resource.
use anyhow::Result;
use std::path::{Path, PathBuf};

use super::fs::LinkMethod;
use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// A link from a destination path back to a source inside a layer.
#[derive(Debug, Clone)]
pub struct SymlinkResource<'a> {
    /// The file or directory the link points to.
    pub source: PathBuf,
    /// Where the link is created.
    pub target: PathBuf,
    executor: &'a dyn Executor,
}

impl<'a> SymlinkResource<'a> {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf, executor: &'a dyn Executor) -> Self {
        Self {
            source,
            target,
            executor,
        }
    }
}

impl Resource for SymlinkResource<'_> {
    fn description(&self) -> String {
        format!("{} -> {}", self.target.display(), self.source.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.source.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }

        let Ok(meta) = self.target.symlink_metadata() else {
            return Ok(ResourceState::Missing);
        };

        if same_file(&self.source, &self.target) {
            return Ok(ResourceState::Correct);
        }

        let current = if meta.is_symlink() {
            std::fs::read_link(&self.target).map_or_else(
                |_| "unreadable link".to_string(),
                |existing| format!("points to {}", existing.display()),
            )
        } else if meta.is_dir() {
            "target is a directory".to_string()
        } else {
            "target is a regular file".to_string()
        };
        Ok(ResourceState::Incorrect { current })
    }

    fn apply(&self) -> Result<ResourceChange> {
        Ok(
            match super::fs::link_at(&self.source, &self.target, self.executor)? {
                LinkMethod::Direct => ResourceChange::Applied,
                LinkMethod::Elevated => ResourceChange::Elevated,
            },
        )
    }
}

/// Whether `a` and `b` resolve to the same file-system object.
///
/// Both paths are followed through symlinks; a dangling path is never the
/// same as anything.
#[must_use]
pub fn same_file(a: &Path, b: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt as _;
        match (std::fs::metadata(a), std::fs::metadata(b)) {
            (Ok(x), Ok(y)) => x.dev() == y.dev() && x.ino() == y.ino(),
            _ => false,
        }
    }
    #[cfg(not(unix))]
    {
        match (dunce::canonicalize(a), dunce::canonicalize(b)) {
            (Ok(x), Ok(y)) => x == y,
            _ => false,
        }
    }
}
