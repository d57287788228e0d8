//! Install script execution.
use anyhow::Result;
use std::path::Path;

use crate::error::ResourceError;
use crate::exec::Executor;
use crate::logging::Log;

/// Outcome of a `run` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptRun {
    /// The script exited zero.
    Succeeded,
    /// The script was not run because it is missing or not executable.
    NotExecutable,
}

/// Run the install script at `path` through `sh` on the caller's terminal.
///
/// The script inherits stdin, so it may prompt.  Its output is logged line
/// by line as it runs, between `>>>>` and `<<<<` markers.  A script that is
/// missing or lacks the executable bit is reported and skipped.
///
/// # Errors
///
/// Returns [`ResourceError::ScriptFailed`] if the script exits non-zero, and
/// any error from spawning the shell.
pub fn run_install_script(
    path: &Path,
    executor: &dyn Executor,
    log: &dyn Log,
) -> Result<ScriptRun> {
    let display = path.display().to_string();
    if path.symlink_metadata().is_err() {
        log.error(&ResourceError::NotFound(display).to_string());
        return Ok(ScriptRun::NotExecutable);
    }
    if !is_executable(path) {
        log.error(&ResourceError::NotExecutable(display).to_string());
        return Ok(ScriptRun::NotExecutable);
    }

    log.info(&format!("Running {display}:"));
    log.info(">>>>");
    let result = executor.run_attached(
        "sh",
        &["-c", "exec \"$0\"", &display],
        &mut |stream, line| log.script_output(stream, line),
    )?;
    log.info("<<<<");

    if result.success {
        Ok(ScriptRun::Succeeded)
    } else {
        Err(ResourceError::ScriptFailed {
            path: display,
            code: result.code.unwrap_or(-1),
        }
        .into())
    }
}

/// Whether `path` is a regular file with an executable bit set.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::{ExecResult, RecordingExecutor};
    use crate::logging::{BufferedLog, LogEntry};
    use std::path::PathBuf;

    fn script(dir: &Path, mode: u32) -> PathBuf {
        let path = dir.join("install.sh");
        std::fs::write(&path, "#!/bin/sh\necho hi\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        }
        #[cfg(not(unix))]
        let _ = mode;
        path
    }

    #[test]
    fn runs_through_sh_and_frames_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(dir.path(), 0o755);
        let executor = RecordingExecutor::new().with_response(ExecResult {
            stdout: "installing\ndone\n".to_string(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        });
        let log = BufferedLog::new();

        let run = run_install_script(&path, &executor, &log).unwrap();

        assert_eq!(run, ScriptRun::Succeeded);
        assert_eq!(
            executor.calls()[0],
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "exec \"$0\"".to_string(),
                path.display().to_string(),
            ]
        );
        let infos: Vec<String> = log
            .entries()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Info(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(infos[1..], [">>>>", "installing", "done", "<<<<"]);
    }

    #[test]
    fn non_zero_exit_is_script_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(dir.path(), 0o755);
        let executor = RecordingExecutor::new().with_response(ExecResult {
            stdout: String::new(),
            stderr: "boom\n".to_string(),
            success: false,
            code: Some(3),
        });
        let log = BufferedLog::new();

        let err = run_install_script(&path, &executor, &log).unwrap_err();

        assert!(
            matches!(
                err.downcast_ref::<ResourceError>(),
                Some(ResourceError::ScriptFailed { code: 3, .. })
            ),
            "unexpected {err:#}"
        );
        assert_eq!(log.warnings(), vec!["boom".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_script_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(dir.path(), 0o644);
        let executor = RecordingExecutor::new();
        let log = BufferedLog::new();

        let run = run_install_script(&path, &executor, &log).unwrap();

        assert_eq!(run, ScriptRun::NotExecutable);
        assert!(executor.calls().is_empty());
        assert!(log.contains("not executable"));
    }

    #[test]
    fn missing_script_is_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let executor = RecordingExecutor::new();
        let log = BufferedLog::new();

        let run = run_install_script(&dir.path().join("nope.sh"), &executor, &log).unwrap();

        assert_eq!(run, ScriptRun::NotExecutable);
        assert!(executor.calls().is_empty());
        assert!(log.contains("File not found"));
    }

    #[cfg(unix)]
    #[test]
    fn script_output_is_logged_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("install.sh");
        std::fs::write(&path, "#!/bin/sh\necho fetching\necho slow >&2\necho done\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt as _;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let log = BufferedLog::new();

        let run = run_install_script(&path, &crate::exec::SystemExecutor, &log).unwrap();

        assert_eq!(run, ScriptRun::Succeeded);
        let messages: Vec<String> = log
            .entries()
            .iter()
            .map(|e| e.message().to_string())
            .collect();
        let open = messages.iter().position(|m| m == ">>>>").unwrap();
        let close = messages.iter().position(|m| m == "<<<<").unwrap();
        let framed = &messages[open + 1..close];
        assert!(framed.contains(&"fetching".to_string()));
        assert!(framed.contains(&"done".to_string()));
        assert_eq!(log.warnings(), vec!["slow".to_string()]);
    }

    #[test]
    fn directory_is_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_executable(dir.path()));
    }
}
