//! Child process execution behind an injectable [`Executor`].
use anyhow::{Context, Result, bail};
use std::io::{BufRead as _, BufReader, Read};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Which output stream of a child process a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Abstraction over process execution so install scripts and elevated
/// retries can be exercised without spawning real processes.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command and return its output. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command, allowing failure (returns result without bailing).
    ///
    /// # Errors
    ///
    /// Returns an error only if the process cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command attached to the terminal: stdin is inherited so the
    /// child can prompt, and every output line is handed to `on_line` as it
    /// is produced.  The returned result also carries the collected output.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process cannot be spawned or waited on.
    fn run_attached(
        &self,
        program: &str,
        args: &[&str],
        on_line: &mut dyn FnMut(OutputStream, &str),
    ) -> Result<ExecResult>;

    /// Check if a program is available on PATH.
    fn which(&self, program: &str) -> bool;
}

/// Production [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        execute_checked(cmd, program)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;

        Ok(ExecResult::from(output))
    }

    fn run_attached(
        &self,
        program: &str,
        args: &[&str],
        on_line: &mut dyn FnMut(OutputStream, &str),
    ) -> Result<ExecResult> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute: {program}"))?;

        let (tx, rx) = mpsc::channel();
        let readers = [
            child
                .stdout
                .take()
                .map(|out| forward_lines(out, OutputStream::Stdout, tx.clone())),
            child
                .stderr
                .take()
                .map(|err| forward_lines(err, OutputStream::Stderr, tx.clone())),
        ];
        drop(tx);

        let mut stdout = String::new();
        let mut stderr = String::new();
        for (stream, line) in rx {
            on_line(stream, &line);
            let collected = match stream {
                OutputStream::Stdout => &mut stdout,
                OutputStream::Stderr => &mut stderr,
            };
            collected.push_str(&line);
            collected.push('\n');
        }
        for reader in readers.into_iter().flatten() {
            reader.join().ok();
        }

        let status = child
            .wait()
            .with_context(|| format!("failed to wait for: {program}"))?;
        Ok(ExecResult {
            stdout,
            stderr,
            success: status.success(),
            code: status.code(),
        })
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Send each line read from `reader` down `tx`, tagged with `stream`, until
/// the pipe closes.
fn forward_lines<R: Read + Send + 'static>(
    reader: R,
    stream: OutputStream,
    tx: mpsc::Sender<(OutputStream, String)>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for chunk in BufReader::new(reader).split(b'\n').map_while(std::result::Result::ok) {
            let line = String::from_utf8_lossy(&chunk);
            if tx
                .send((stream, line.trim_end_matches('\r').to_string()))
                .is_err()
            {
                break;
            }
        }
    })
}

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, label: &str) -> Result<ExecResult> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    let result = ExecResult::from(output);
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

/// Test double that records every invocation and replays queued results.
///
/// When the queue is empty, calls succeed with empty output.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: std::sync::Mutex<Vec<Vec<String>>>,
    responses: std::sync::Mutex<std::collections::VecDeque<ExecResult>>,
    which_result: bool,
}

impl RecordingExecutor {
    /// Create an executor whose `which` reports every program as present.
    #[must_use]
    pub fn new() -> Self {
        Self {
            which_result: true,
            ..Self::default()
        }
    }

    /// Set the value returned by [`Executor::which`].
    #[must_use]
    pub const fn with_which(mut self, found: bool) -> Self {
        self.which_result = found;
        self
    }

    /// Queue a result for the next call.
    #[must_use]
    pub fn with_response(self, result: ExecResult) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(result);
        self
    }

    /// Every call made so far, as `[program, args...]`.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn record(&self, program: &str, args: &[&str]) -> ExecResult {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().map(ToString::to_string));
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(call);
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or(ExecResult {
                stdout: String::new(),
                stderr: String::new(),
                success: true,
                code: Some(0),
            })
    }
}

impl Executor for RecordingExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.record(program, args);
        if !result.success {
            bail!(
                "{program} failed (exit {}): {}",
                result.code.unwrap_or(-1),
                result.stderr.trim()
            );
        }
        Ok(result)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Ok(self.record(program, args))
    }

    fn run_attached(
        &self,
        program: &str,
        args: &[&str],
        on_line: &mut dyn FnMut(OutputStream, &str),
    ) -> Result<ExecResult> {
        let result = self.record(program, args);
        for line in result.stdout.lines() {
            on_line(OutputStream::Stdout, line);
        }
        for line in result.stderr.lines() {
            on_line(OutputStream::Stderr, line);
        }
        Ok(result)
    }

    fn which(&self, _program: &str) -> bool {
        self.which_result
    }
}
