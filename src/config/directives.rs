//! Per-layer directive file parser.
//!
//! Format:
//!
//! ```text
//! depends:
//! shell
//! link:
//! zshrc ~/.zshrc
//! run:
//! install.sh
//! ```
//!
//! A line ending in `:` opens a directive kind; each following line is one
//! directive of that kind.  Blank lines and `#` comments are ignored.  A
//! content line before any header stops parsing; directives parsed up to
//! that point are still returned.
use std::fmt;
use std::path::Path;

use crate::error::{DirectiveError, LayerError};

/// Kind of a directive, taken verbatim from its header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `link:`, `<source relative to layer> <destination>`.
    Link,
    /// `run:`, `<script relative to layer>`.
    Run,
    /// `depends:`, `<layer identifier>`.
    Depends,
    /// Any other header; reported and skipped at execution time.
    Other(String),
}

impl DirectiveKind {
    /// Classify header text (without the trailing colon).
    #[must_use]
    pub fn from_header(header: &str) -> Self {
        match header {
            "link" => Self::Link,
            "run" => Self::Run,
            "depends" => Self::Depends,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link => f.write_str("link"),
            Self::Run => f.write_str("run"),
            Self::Depends => f.write_str("depends"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// One declared action within a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directive kind from the most recent header.
    pub kind: DirectiveKind,
    /// Full trimmed line text.
    pub argument: String,
    /// Identifier of the layer that declared it.
    pub layer: String,
    /// 1-based line number in the directive file.
    pub line: usize,
}

impl Directive {
    /// Split a `link` argument into `(source, destination)`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectiveError::Arity`] unless there are exactly two
    /// whitespace-separated tokens.
    pub fn link_args(&self) -> Result<(&str, &str), DirectiveError> {
        let mut tokens = self.argument.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(source), Some(destination), None) => Ok((source, destination)),
            _ => Err(self.arity_error("two arguments, a source and destination")),
        }
    }

    /// The single token of a `run` or `depends` argument.
    ///
    /// # Errors
    ///
    /// Returns [`DirectiveError::Arity`] unless there is exactly one token.
    pub fn single_arg(&self) -> Result<&str, DirectiveError> {
        let mut tokens = self.argument.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(token), None) => Ok(token),
            _ => Err(self.arity_error("exactly one argument")),
        }
    }

    fn arity_error(&self, expected: &'static str) -> DirectiveError {
        DirectiveError::Arity {
            kind: self.kind.to_string(),
            expected,
            argument: self.argument.clone(),
        }
    }
}

/// Result of parsing one directive file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDirectives {
    /// Directives in file order.
    pub directives: Vec<Directive>,
    /// Set when parsing stopped early on a malformed line.
    pub error: Option<DirectiveError>,
}

/// Read and parse the directive file at `path` for `layer`.
///
/// # Errors
///
/// Returns [`LayerError::Io`] if the file cannot be read.  Malformed content
/// is not an error here; it is reported through [`ParsedDirectives::error`].
pub fn parse_directives(layer: &str, path: &Path) -> Result<ParsedDirectives, LayerError> {
    let content = std::fs::read_to_string(path).map_err(|source| LayerError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_directives_from_str(layer, &content))
}

/// Parse directive file content.
///
/// # Examples
///
/// ```
/// use caravan::config::directives::{DirectiveKind, parse_directives_from_str};
///
/// let parsed = parse_directives_from_str("shell", "link:\nzshrc .zshrc\nrun:\ninstall.sh\n");
/// assert!(parsed.error.is_none());
/// assert_eq!(parsed.directives[0].kind, DirectiveKind::Link);
/// assert_eq!(parsed.directives[1].argument, "install.sh");
/// ```
#[must_use]
pub fn parse_directives_from_str(layer: &str, content: &str) -> ParsedDirectives {
    let mut parsed = ParsedDirectives::default();
    let mut current: Option<DirectiveKind> = None;

    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(header) = trimmed.strip_suffix(':') {
            current = Some(DirectiveKind::from_header(header.trim()));
        } else if let Some(kind) = &current {
            parsed.directives.push(Directive {
                kind: kind.clone(),
                argument: trimmed.to_string(),
                layer: layer.to_string(),
                line: line_num + 1,
            });
        } else {
            parsed.error = Some(DirectiveError::OutsideSection {
                line: line_num + 1,
                content: trimmed.to_string(),
            });
            break;
        }
    }

    parsed
}
