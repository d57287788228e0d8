//! Filesystem mutations applied to link destinations: remove, back up, link.
use anyhow::{Context as _, Result};
use std::io;
use std::path::{Path, PathBuf};

use super::ResourceChange;
use super::helpers::fs::{copy_dir_recursive, create_symlink, occupied};
use crate::error::ResourceError;
use crate::exec::Executor;

/// How a link was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMethod {
    /// Created directly by this process.
    Direct,
    /// Created by retrying through `sudo ln -s`.
    Elevated,
}

/// Remove whatever exists at `path`.
///
/// Symlinks are removed without following them (a link to a directory never
/// deletes the directory's contents); directories are removed recursively.
///
/// # Errors
///
/// Returns an error if the entry exists but cannot be removed.
pub fn remove_at(path: &Path) -> Result<ResourceChange> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(ResourceChange::Skipped {
            reason: format!("{} does not exist", path.display()),
        });
    };
    if meta.is_symlink() {
        remove_link(path).with_context(|| format!("removing link {}", path.display()))?;
    } else if meta.is_dir() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("removing directory {}", path.display()))?;
    } else if meta.is_file() {
        std::fs::remove_file(path).with_context(|| format!("removing file {}", path.display()))?;
    } else {
        return Ok(ResourceChange::Skipped {
            reason: format!("{} is not a link, directory or regular file", path.display()),
        });
    }
    Ok(ResourceChange::Applied)
}

/// Move `path` into `backup_root` under a fresh `<name>_<id>_backup` name.
///
/// The backup directory is created on demand.  Names are regenerated until
/// one is free, so repeated backups of the same base name never overwrite
/// each other.  When a rename crosses filesystems the entry is copied and
/// the original removed.
///
/// # Errors
///
/// Returns an error if the backup directory cannot be created or the entry
/// cannot be moved.
pub fn backup_at(path: &Path, backup_root: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(backup_root)
        .with_context(|| format!("creating backup directory {}", backup_root.display()))?;

    let base = path
        .file_name()
        .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().into_owned());
    let mut dest = backup_root.join(backup_name(&base));
    while occupied(&dest) {
        dest = backup_root.join(backup_name(&base));
    }

    move_entry(path, &dest)
        .with_context(|| format!("backing up {} to {}", path.display(), dest.display()))?;
    Ok(dest)
}

/// A backup file name for `base`: `<base>_<5 hex chars>_backup`.
///
/// # Examples
///
/// ```
/// use caravan::resources::fs::backup_name;
///
/// let name = backup_name(".zshrc");
/// assert!(name.starts_with(".zshrc_"));
/// assert!(name.ends_with("_backup"));
/// assert_eq!(name.len(), ".zshrc_".len() + 5 + "_backup".len());
/// ```
#[must_use]
pub fn backup_name(base: &str) -> String {
    let id: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(5)
        .collect();
    format!("{base}_{id}_backup")
}

/// Create a symlink at `target` pointing to `source`.
///
/// Missing parent directories of `target` are created.  If either step fails
/// for lack of permission and `sudo` is available, the link (and its parent
/// directory, when missing) is created through `sudo` instead.
///
/// # Errors
///
/// Returns an error if the link cannot be created, including when elevation
/// is needed but `sudo` is not installed.
pub fn link_at(source: &Path, target: &Path, executor: &dyn Executor) -> Result<LinkMethod> {
    let direct = target
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| create_symlink(source, target));
    match direct {
        Ok(()) => Ok(LinkMethod::Direct),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            link_elevated(source, target, executor)?;
            Ok(LinkMethod::Elevated)
        }
        Err(e) => Err(e).with_context(|| format!("create link: {}", target.display())),
    }
}

fn link_elevated(source: &Path, target: &Path, executor: &dyn Executor) -> Result<()> {
    if !executor.which("sudo") {
        return Err(ResourceError::Symlink(format!(
            "permission denied creating {} and sudo is not available",
            target.display()
        ))
        .into());
    }
    if let Some(parent) = target.parent()
        && !parent.is_dir()
    {
        executor
            .run("sudo", &["mkdir", "-p", &parent.to_string_lossy()])
            .with_context(|| format!("create directory with sudo: {}", parent.display()))?;
    }
    executor
        .run(
            "sudo",
            &["ln", "-s", &source.to_string_lossy(), &target.to_string_lossy()],
        )
        .with_context(|| format!("create link with sudo: {}", target.display()))?;
    Ok(())
}

fn remove_link(path: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        // Directory symlinks and junctions are removed with remove_dir on Windows.
        if std::fs::remove_file(path).is_ok() {
            return Ok(());
        }
        std::fs::remove_dir(path)
    }
    #[cfg(not(windows))]
    {
        std::fs::remove_file(path)
    }
}

fn move_entry(from: &Path, to: &Path) -> Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
        Err(e) => Err(e.into()),
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> Result<()> {
    let meta = from.symlink_metadata()?;
    if meta.is_symlink() {
        let link = std::fs::read_link(from)?;
        create_symlink(&link, to)?;
        remove_link(from)?;
    } else if meta.is_dir() {
        copy_dir_recursive(from, to)?;
        std::fs::remove_dir_all(from)?;
    } else {
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)?;
    }
    Ok(())
}
