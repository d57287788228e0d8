//! Output channels, log file location and clock helpers.
use std::path::PathBuf;

/// Tracing target of stage headers (`Layer: shell`, `Summary`).
pub(super) const STAGE_TARGET: &str = "caravan::stage";

/// Tracing target of dry-run previews.
pub(super) const DRY_RUN_TARGET: &str = "caravan::dry_run";

/// Tracing target of lines printed by install scripts.
pub(super) const SCRIPT_TARGET: &str = "caravan::script";

/// `chrono` format of the per-line log file timestamp.
pub(super) const CLOCK: &str = "%H:%M:%S";

/// `chrono` format of the run header timestamp.
pub(super) const DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";

/// How an event is rendered, chosen by its tracing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Channel {
    /// Section header.
    Stage,
    /// Would-be action in a dry run.
    DryRun,
    /// Install script output, shown inside the `>>>>`/`<<<<` frame.
    Script,
    /// Everything else.
    General,
}

impl Channel {
    pub(super) fn of(target: &str) -> Self {
        match target {
            STAGE_TARGET => Self::Stage,
            DRY_RUN_TARGET => Self::DryRun,
            SCRIPT_TARGET => Self::Script,
            _ => Self::General,
        }
    }
}

/// Drop terminal escape sequences, which install scripts often print, so the
/// log file stays plain text.
///
/// CSI sequences (`ESC [ ... final`) are removed whole; any other escape
/// swallows the character that follows it.
pub(super) fn strip_ansi(s: &str) -> String {
    #[derive(Clone, Copy)]
    enum Scan {
        Text,
        Escape,
        Csi,
    }

    let mut out = String::with_capacity(s.len());
    let mut scan = Scan::Text;
    for c in s.chars() {
        scan = match (scan, c) {
            (Scan::Text, '\x1b') => Scan::Escape,
            (Scan::Text, c) => {
                out.push(c);
                Scan::Text
            }
            (Scan::Escape, '[') => Scan::Csi,
            (Scan::Escape, _) | (Scan::Csi, '@'..='~') => Scan::Text,
            (Scan::Csi, _) => Scan::Csi,
        };
    }
    out
}

/// Directory of the caravan log: `$XDG_CACHE_HOME/caravan`, else
/// `$HOME/.cache/caravan`, else `.cache/caravan`.  `var` looks up an
/// environment variable.
fn log_dir_with(var: impl Fn(&str) -> Option<String>) -> PathBuf {
    var("XDG_CACHE_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| var("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("caravan")
}

/// Path of the log file for `command`, creating its directory.
///
/// Returns `None` when the directory cannot be created; the run then logs to
/// the console only.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let dir = log_dir_with(|name| std::env::var(name).ok());
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// The current UTC time in `format`.
pub(super) fn utc_now(format: &str) -> String {
    chrono::Utc::now().format(format).to_string()
}
