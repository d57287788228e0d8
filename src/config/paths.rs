//! Path expansion for layer identifiers and link arguments.
use std::path::{Component, Path, PathBuf};

/// Expand `~` and `$VAR`/`${VAR}` in `raw`.
///
/// Unknown variables are left untouched, as is a leading `~` when `HOME`
/// is unset.
///
/// # Examples
///
/// ```
/// use caravan::config::paths::expand;
///
/// assert_eq!(expand("/etc/$CARAVAN_SURELY_UNSET_VAR"), "/etc/$CARAVAN_SURELY_UNSET_VAR");
/// ```
#[must_use]
pub fn expand(raw: &str) -> String {
    shellexpand::full_with_context_no_errors(
        raw,
        || std::env::var("HOME").ok(),
        |var| std::env::var(var).ok(),
    )
    .into_owned()
}

/// Expand `raw`, anchor it at `base` when relative, and normalise `.`/`..`.
///
/// # Examples
///
/// ```
/// use caravan::config::paths::resolve;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(resolve(Path::new("/work"), "shell/../editor"), PathBuf::from("/work/editor"));
/// assert_eq!(resolve(Path::new("/work"), "/etc/hosts"), PathBuf::from("/etc/hosts"));
/// ```
#[must_use]
pub fn resolve(base: &Path, raw: &str) -> PathBuf {
    let expanded = PathBuf::from(expand(raw));
    if expanded.is_absolute() {
        normalize(&expanded)
    } else {
        normalize(&base.join(expanded))
    }
}

/// Lexically remove `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_variable() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        assert_eq!(expand("$HOME/.zshrc"), format!("{home}/.zshrc"));
        assert_eq!(expand("${HOME}/.zshrc"), format!("{home}/.zshrc"));
    }

    #[test]
    fn expand_tilde() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        assert_eq!(expand("~/.zshrc"), format!("{home}/.zshrc"));
    }

    #[test]
    fn expand_leaves_unknown_variables() {
        assert_eq!(
            expand("/x/$CARAVAN_TEST_UNKNOWN_VAR_12345/y"),
            "/x/$CARAVAN_TEST_UNKNOWN_VAR_12345/y"
        );
    }

    #[test]
    fn resolve_relative_against_base() {
        assert_eq!(
            resolve(Path::new("/work"), "shell/zshrc"),
            PathBuf::from("/work/shell/zshrc")
        );
    }

    #[test]
    fn resolve_keeps_absolute() {
        assert_eq!(
            resolve(Path::new("/work"), "/home/u/.zshrc"),
            PathBuf::from("/home/u/.zshrc")
        );
    }

    #[test]
    fn resolve_normalizes_dots() {
        assert_eq!(
            resolve(Path::new("/work"), "./shell/./../editor/vimrc"),
            PathBuf::from("/work/editor/vimrc")
        );
    }

    #[test]
    fn normalize_does_not_escape_root() {
        assert_eq!(normalize(Path::new("/../etc")), PathBuf::from("/etc"));
    }
}
