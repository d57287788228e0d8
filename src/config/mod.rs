//! Run configuration, layers manifest and directive file parsing.
pub mod directives;
pub mod manifest;
pub mod paths;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Default manifest file name, relative to the root directory.
pub const MANIFEST_FILE: &str = "caravan.layers";

/// Directive file name inside every layer directory.
pub const DIRECTIVE_FILE: &str = "caravan";

/// Default backup directory name, relative to the working directory.
pub const BACKUP_DIR: &str = "backups";

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory that layer identifiers and relative link destinations are
    /// resolved against.
    pub root: PathBuf,
    /// Path to the layers manifest.
    pub manifest: PathBuf,
    /// Directory that conflicting destinations are moved into.
    pub backup_dir: PathBuf,
    /// Report actions without prompting or mutating anything.
    pub dry_run: bool,
}

impl Config {
    /// Configuration rooted at `root` with default manifest and backup locations.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            manifest: root.join(MANIFEST_FILE),
            backup_dir: root.join(BACKUP_DIR),
            root,
            dry_run: false,
        }
    }

    /// Build the configuration from command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let root = resolve_root(cli.root.as_deref(), &cwd);
        let manifest = cli.manifest.as_ref().map_or_else(
            || root.join(MANIFEST_FILE),
            |m| paths::resolve(&cwd, &m.to_string_lossy()),
        );
        let backup_dir = cli.backup_dir.as_ref().map_or_else(
            || cwd.join(BACKUP_DIR),
            |b| paths::resolve(&cwd, &b.to_string_lossy()),
        );
        Ok(Self {
            root,
            manifest,
            backup_dir,
            dry_run: cli.dry_run,
        })
    }

    /// Directory of `layer`.
    #[must_use]
    pub fn layer_dir(&self, layer: &str) -> PathBuf {
        paths::resolve(&self.root, layer)
    }

    /// Directive file of `layer`.
    #[must_use]
    pub fn directive_file(&self, layer: &str) -> PathBuf {
        self.layer_dir(layer).join(DIRECTIVE_FILE)
    }
}

/// Resolve the root directory: explicit `--root`, then `CARAVAN_ROOT`, then `cwd`.
fn resolve_root(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(root) = explicit {
        return paths::resolve(cwd, &root.to_string_lossy());
    }
    if let Ok(root) = std::env::var("CARAVAN_ROOT") {
        return paths::resolve(cwd, &root);
    }
    cwd.to_path_buf()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_file_names() {
        let config = Config::new(PathBuf::from("/work"));
        assert_eq!(config.manifest, PathBuf::from("/work/caravan.layers"));
        assert_eq!(config.backup_dir, PathBuf::from("/work/backups"));
        assert!(!config.dry_run);
    }

    #[test]
    fn directive_file_lives_inside_layer() {
        let config = Config::new(PathBuf::from("/work"));
        assert_eq!(
            config.directive_file("shell"),
            PathBuf::from("/work/shell/caravan")
        );
        assert_eq!(
            config.directive_file("/abs/layer"),
            PathBuf::from("/abs/layer/caravan")
        );
    }

    #[test]
    fn explicit_root_wins() {
        let root = resolve_root(Some(Path::new("conf")), Path::new("/work"));
        assert_eq!(root, PathBuf::from("/work/conf"));
    }

    #[test]
    fn from_cli_resolves_overrides_against_cwd() {
        let cli = Cli {
            run: false,
            link: true,
            verbose: false,
            dry_run: true,
            root: Some(PathBuf::from("/dots")),
            manifest: Some(PathBuf::from("/dots/custom.layers")),
            backup_dir: Some(PathBuf::from("/tmp/caravan-backups")),
        };
        let config = Config::from_cli(&cli).unwrap();
        assert_eq!(config.root, PathBuf::from("/dots"));
        assert_eq!(config.manifest, PathBuf::from("/dots/custom.layers"));
        assert_eq!(config.backup_dir, PathBuf::from("/tmp/caravan-backups"));
        assert!(config.dry_run);
    }
}
