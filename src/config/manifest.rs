//! Layers manifest (`caravan.layers`): one layer identifier per line.
use anyhow::Result;
use std::path::Path;

use crate::error::ManifestError;

/// Top-level layers in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Layer identifiers, trimmed, blank lines and `#` comments removed.
    pub layers: Vec<String>,
}

/// Load the manifest from `path`.
///
/// # Errors
///
/// Returns [`ManifestError::NotFound`] if the file does not exist and
/// [`ManifestError::Io`] if it cannot be read.
pub fn load(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ManifestError::NotFound(path.display().to_string())
        } else {
            ManifestError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    })?;
    Ok(parse_from_str(&content))
}

/// Parse manifest content.
///
/// # Examples
///
/// ```
/// use caravan::config::manifest::parse_from_str;
///
/// let manifest = parse_from_str("shell\n\n  editor  \n# git\n");
/// assert_eq!(manifest.layers, ["shell", "editor"]);
/// ```
#[must_use]
pub fn parse_from_str(content: &str) -> Manifest {
    let layers = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();
    Manifest { layers }
}
