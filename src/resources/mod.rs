//! Idempotent resource primitives (check + apply pattern).
pub mod conflict;
pub mod fs;
pub mod helpers;
pub mod script;
pub mod symlink;

use anyhow::Result;

/// State of a resource on disk.
///
/// # Examples
///
/// ```
/// use caravan::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let wrong = ResourceState::Incorrect { current: "points to /other".into() };
/// let broken = ResourceState::Invalid { reason: "source does not exist".into() };
///
/// assert_ne!(missing, correct);
/// assert_eq!(correct, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing exists at the target path.
    Missing,
    /// The target already matches the desired state.
    Correct,
    /// Something else occupies the target path.
    Incorrect {
        /// Description of what is there now.
        current: String,
    },
    /// The resource cannot be applied as declared (e.g. its source is missing).
    Invalid {
        /// Reason the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying a resource change.
///
/// # Examples
///
/// ```
/// use caravan::resources::ResourceChange;
///
/// let applied = ResourceChange::Applied;
/// let skipped = ResourceChange::Skipped { reason: "does not exist".into() };
///
/// assert_eq!(applied, ResourceChange::Applied);
/// assert_ne!(applied, ResourceChange::Elevated);
/// assert_ne!(applied, skipped);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// The resource was created or updated.
    Applied,
    /// The resource was created through the elevated (`sudo`) retry.
    Elevated,
    /// Nothing was done.
    Skipped {
        /// Why nothing was done.
        reason: String,
    },
}

/// A resource that can report its state and be brought into the desired one.
///
/// Callers inspect [`current_state`](Resource::current_state), clear the
/// target if something else occupies it, then [`apply`](Resource::apply).
pub trait Resource {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined.
    fn current_state(&self) -> Result<ResourceState>;

    /// Apply the resource change.  The target path must already be free.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be applied.
    fn apply(&self) -> Result<ResourceChange>;
}
