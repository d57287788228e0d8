//! Domain-specific error types for the caravan engine.
//!
//! Internal modules return [`anyhow::Result`] and attach the typed errors
//! below as the root cause; the CLI boundary walks the error chain with
//! [`ExitReason::from_error`] to pick the process exit code.
//!
//! # Error kinds
//!
//! ```text
//! ManifestError    caravan.layers loading       (fatal, exit 2 or 1)
//! LayerError       cycles, unreadable files     (fatal, exit 5 or 1)
//! DirectiveError   malformed directive lines    (counted, exit 3)
//! ResourceError    links, scripts, backups      (counted, exit 6)
//! ```

use std::process::ExitCode;

use thiserror::Error;

/// Errors that arise while loading the layers manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file does not exist.
    #[error("manifest not found: {0}")]
    NotFound(String),

    /// The manifest exists but could not be read.
    #[error("IO error reading manifest {path}: {source}")]
    Io {
        /// Path to the manifest.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors found while parsing a layer's directive file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    /// A content line appeared before any `kind:` header.
    #[error("line {line}: '{content}' appears before any directive header")]
    OutsideSection {
        /// 1-based line number.
        line: usize,
        /// The offending (trimmed) line.
        content: String,
    },

    /// A directive received the wrong number of arguments.
    #[error("the {kind} directive takes {expected}, got '{argument}'")]
    Arity {
        /// Directive kind (`link`, `run`, `depends`).
        kind: String,
        /// Human-readable expectation, e.g. "two arguments, a source and destination".
        expected: &'static str,
        /// The raw argument text.
        argument: String,
    },
}

/// Errors that arise while resolving the layer graph.
#[derive(Error, Debug)]
pub enum LayerError {
    /// A layer was reached again while it was still being installed.
    #[error("Layer dependency cycle detected: {0}")]
    DependencyCycle(String),

    /// The directive file exists but could not be read.
    #[error("IO error reading directive file {path}: {source}")]
    Io {
        /// Path to the directive file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise from resource operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Creating a symlink failed.
    #[error("Symlink error: {0}")]
    Symlink(String),

    /// An install script lacks the executable bit.
    #[error("Install file not executable: {0}")]
    NotExecutable(String),

    /// An install script ran but exited non-zero.
    #[error("Install script {path} exited with {code}")]
    ScriptFailed {
        /// Absolute path of the script.
        path: String,
        /// Exit code, or -1 when terminated by a signal.
        code: i32,
    },

    /// A required file was not found.
    #[error("File not found: {0}")]
    NotFound(String),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ExitReason {
    /// The run completed and every directive succeeded.
    Success = 0,
    /// Unexpected failure (I/O error, unreadable file, ...).
    Failure = 1,
    /// `caravan.layers` does not exist.
    ManifestMissing = 2,
    /// At least one directive file contained a malformed line.
    ParseError = 3,
    /// The user declined to create a missing link source.
    CreationAborted = 4,
    /// The layer dependency graph contains a cycle.
    DependencyCycle = 5,
    /// At least one link or run directive failed.
    DirectiveFailed = 6,
    /// The run was interrupted (Ctrl-C).
    Interrupted = 130,
}

impl ExitReason {
    /// Classify a fatal error by walking its cause chain.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        err.chain()
            .find_map(|cause| {
                if let Some(ManifestError::NotFound(_)) = cause.downcast_ref::<ManifestError>() {
                    return Some(Self::ManifestMissing);
                }
                if let Some(LayerError::DependencyCycle(_)) = cause.downcast_ref::<LayerError>() {
                    return Some(Self::DependencyCycle);
                }
                None
            })
            .unwrap_or(Self::Failure)
    }

    /// Numeric exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitReason> for ExitCode {
    fn from(reason: ExitReason) -> Self {
        Self::from(reason.code())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::Context as _;
    use std::io;

    // -----------------------------------------------------------------------
    // Display
    // -----------------------------------------------------------------------

    #[test]
    fn manifest_not_found_display() {
        let e = ManifestError::NotFound("/work/caravan.layers".to_string());
        assert_eq!(e.to_string(), "manifest not found: /work/caravan.layers");
    }

    #[test]
    fn manifest_io_has_source() {
        use std::error::Error as StdError;
        let e = ManifestError::Io {
            path: "/work/caravan.layers".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/work/caravan.layers"));
    }

    #[test]
    fn directive_outside_section_display() {
        let e = DirectiveError::OutsideSection {
            line: 1,
            content: "zshrc .zshrc".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "line 1: 'zshrc .zshrc' appears before any directive header"
        );
    }

    #[test]
    fn dependency_cycle_display() {
        let e = LayerError::DependencyCycle("a → b → a".to_string());
        assert_eq!(e.to_string(), "Layer dependency cycle detected: a → b → a");
    }

    #[test]
    fn script_failed_display() {
        let e = ResourceError::ScriptFailed {
            path: "/layers/shell/install.sh".to_string(),
            code: 2,
        };
        assert_eq!(
            e.to_string(),
            "Install script /layers/shell/install.sh exited with 2"
        );
    }

    // -----------------------------------------------------------------------
    // ExitReason
    // -----------------------------------------------------------------------

    #[test]
    fn missing_manifest_maps_to_exit_two() {
        let err = anyhow::Error::new(ManifestError::NotFound("caravan.layers".to_string()))
            .context("loading manifest");
        assert_eq!(ExitReason::from_error(&err), ExitReason::ManifestMissing);
        assert_eq!(ExitReason::from_error(&err).code(), 2);
    }

    #[test]
    fn cycle_maps_to_exit_five() {
        let result: Result<(), LayerError> =
            Err(LayerError::DependencyCycle("a → b → a".to_string()));
        let err = result.context("installing a").expect_err("should fail");
        assert_eq!(ExitReason::from_error(&err), ExitReason::DependencyCycle);
    }

    #[test]
    fn unknown_error_maps_to_failure() {
        let err = anyhow::anyhow!("disk full");
        assert_eq!(ExitReason::from_error(&err), ExitReason::Failure);
    }

    #[test]
    fn exit_reasons_order_by_code() {
        assert!(ExitReason::ParseError < ExitReason::CreationAborted);
        assert!(ExitReason::CreationAborted < ExitReason::DirectiveFailed);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<ManifestError>();
        assert_send_sync::<DirectiveError>();
        assert_send_sync::<LayerError>();
        assert_send_sync::<ResourceError>();
    }
}
