//! Conflict resolution for link destinations.
//!
//! When a link destination is already occupied the user chooses what happens
//! to the existing entry.  Choices ending in "all" are sticky: they apply to
//! every later conflict in the same run without asking again.
use anyhow::{Context as _, Result, bail};
use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead as _, Write as _};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ResourceState;

/// What to do with a link destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// Leave the existing entry and skip this link.
    SkipOnce,
    /// Skip this and every later conflict.
    SkipAll,
    /// Delete the existing entry, then link.
    RemoveOnce,
    /// Delete this and every later conflicting entry.
    RemoveAll,
    /// Move the existing entry into the backup directory, then link.
    BackupOnce,
    /// Back up this and every later conflicting entry.
    BackupAll,
    /// The destination is free; link directly.
    OverwriteOnce,
}

impl ConflictAction {
    /// Interpret a prompt answer.  Unrecognised input means back up once.
    ///
    /// # Examples
    ///
    /// ```
    /// use caravan::resources::conflict::ConflictAction;
    ///
    /// assert_eq!(ConflictAction::from_answer("s"), ConflictAction::SkipOnce);
    /// assert_eq!(ConflictAction::from_answer("R\n"), ConflictAction::RemoveAll);
    /// assert_eq!(ConflictAction::from_answer(""), ConflictAction::BackupOnce);
    /// ```
    #[must_use]
    pub fn from_answer(answer: &str) -> Self {
        match answer.trim() {
            "s" => Self::SkipOnce,
            "S" => Self::SkipAll,
            "r" => Self::RemoveOnce,
            "R" => Self::RemoveAll,
            "B" => Self::BackupAll,
            _ => Self::BackupOnce,
        }
    }

    /// The sticky choice this action establishes, if any.
    #[must_use]
    pub const fn sticky(self) -> Option<StickyChoice> {
        match self {
            Self::SkipAll => Some(StickyChoice::Skip),
            Self::RemoveAll => Some(StickyChoice::Remove),
            Self::BackupAll => Some(StickyChoice::Backup),
            _ => None,
        }
    }
}

/// A choice that applies to every remaining conflict in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickyChoice {
    /// Skip every conflict.
    Skip,
    /// Remove every conflicting entry.
    Remove,
    /// Back up every conflicting entry.
    Backup,
}

impl StickyChoice {
    /// The per-conflict action this choice applies.
    #[must_use]
    pub const fn action(self) -> ConflictAction {
        match self {
            Self::Skip => ConflictAction::SkipOnce,
            Self::Remove => ConflictAction::RemoveOnce,
            Self::Backup => ConflictAction::BackupOnce,
        }
    }
}

impl fmt::Display for StickyChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Remove => f.write_str("remove"),
            Self::Backup => f.write_str("back up"),
        }
    }
}

/// Source of answers for interactive questions.
#[cfg_attr(test, mockall::automock)]
pub trait ConflictPrompter: Send + Sync {
    /// Ask whether a missing link source should be created as a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm_create(&self, source: &Path) -> Result<bool>;

    /// Ask what to do with an occupied link destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn choose_action(&self, target: &Path) -> Result<ConflictAction>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl ConflictPrompter for TerminalPrompter {
    fn confirm_create(&self, source: &Path) -> Result<bool> {
        let answer = ask(&format!(
            "Link source '{}' does not exist.\nWould you like to create it as a directory? [Y/n]: ",
            source.display()
        ))?;
        Ok(!matches!(answer.trim(), "n" | "N" | "no" | "No" | "NO"))
    }

    fn choose_action(&self, target: &Path) -> Result<ConflictAction> {
        let answer = ask(&format!(
            "Destination '{}' already exists, what do you want to do?\n\
             [s]kip, [S]kip all, [r]emove, [R]emove all, [b]ackup, [B]ackup all: ",
            target.display()
        ))?;
        Ok(ConflictAction::from_answer(&answer))
    }
}

#[allow(clippy::print_stdout)]
fn ask(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush().context("flushing prompt")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("reading answer")?;
    Ok(answer)
}

/// Prompter that replays queued answers, for non-interactive runs and tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    creates: Mutex<VecDeque<bool>>,
    actions: Mutex<VecDeque<ConflictAction>>,
    prompts: AtomicUsize,
}

impl ScriptedPrompter {
    /// Create a prompter with no queued answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next creation question.
    #[must_use]
    pub fn with_create(self, answer: bool) -> Self {
        self.creates
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(answer);
        self
    }

    /// Queue an answer for the next conflict question.
    #[must_use]
    pub fn with_action(self, action: ConflictAction) -> Self {
        self.actions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(action);
        self
    }

    /// Number of questions asked so far.
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl ConflictPrompter for ScriptedPrompter {
    fn confirm_create(&self, source: &Path) -> Result<bool> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        match self
            .creates
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
        {
            Some(answer) => Ok(answer),
            None => bail!("no scripted answer for creating {}", source.display()),
        }
    }

    fn choose_action(&self, target: &Path) -> Result<ConflictAction> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        match self
            .actions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
        {
            Some(action) => Ok(action),
            None => bail!("no scripted answer for conflict at {}", target.display()),
        }
    }
}

/// Decides the action for each link destination, remembering sticky choices
/// for the rest of the run.
#[derive(Debug, Default)]
pub struct ConflictResolver {
    sticky: Option<StickyChoice>,
}

impl ConflictResolver {
    /// Create a resolver with no sticky choice.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The sticky choice in effect, if any.
    #[must_use]
    pub const fn sticky(&self) -> Option<StickyChoice> {
        self.sticky
    }

    /// Decide the action for a destination in `state`.
    ///
    /// A free destination is linked directly and one already pointing at the
    /// source is skipped.  Otherwise a sticky choice applies if one was made;
    /// failing that the user is asked, and an "all" answer becomes sticky.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompter fails.
    pub fn resolve(
        &mut self,
        state: &ResourceState,
        target: &Path,
        prompter: &dyn ConflictPrompter,
    ) -> Result<ConflictAction> {
        match state {
            ResourceState::Missing => Ok(ConflictAction::OverwriteOnce),
            ResourceState::Correct | ResourceState::Invalid { .. } => Ok(ConflictAction::SkipOnce),
            ResourceState::Incorrect { .. } => {
                if let Some(sticky) = self.sticky {
                    return Ok(sticky.action());
                }
                let action = prompter.choose_action(target)?;
                if let Some(sticky) = action.sticky() {
                    self.sticky = Some(sticky);
                }
                Ok(action)
            }
        }
    }

    /// Offer to create a missing link source as a directory.
    ///
    /// Returns `false` if the user declined; nothing is created then.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompter fails or the directory cannot be
    /// created.
    pub fn ensure_source(source: &Path, prompter: &dyn ConflictPrompter) -> Result<bool> {
        if !prompter.confirm_create(source)? {
            return Ok(false);
        }
        std::fs::create_dir_all(source)
            .with_context(|| format!("creating link source {}", source.display()))?;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn occupied() -> ResourceState {
        ResourceState::Incorrect {
            current: "target is a regular file".to_string(),
        }
    }

    #[test]
    fn answers_map_to_actions() {
        let cases = [
            ("s", ConflictAction::SkipOnce),
            ("S", ConflictAction::SkipAll),
            ("r", ConflictAction::RemoveOnce),
            ("R", ConflictAction::RemoveAll),
            ("b", ConflictAction::BackupOnce),
            ("B", ConflictAction::BackupAll),
            ("  r \n", ConflictAction::RemoveOnce),
            ("x", ConflictAction::BackupOnce),
            ("skip", ConflictAction::BackupOnce),
        ];
        for (answer, expected) in cases {
            assert_eq!(ConflictAction::from_answer(answer), expected, "answer {answer:?}");
        }
    }

    #[test]
    fn only_all_actions_are_sticky() {
        assert_eq!(ConflictAction::SkipAll.sticky(), Some(StickyChoice::Skip));
        assert_eq!(ConflictAction::RemoveAll.sticky(), Some(StickyChoice::Remove));
        assert_eq!(ConflictAction::BackupAll.sticky(), Some(StickyChoice::Backup));
        assert_eq!(ConflictAction::BackupOnce.sticky(), None);
        assert_eq!(ConflictAction::OverwriteOnce.sticky(), None);
    }

    #[test]
    fn free_destination_never_prompts() {
        let mut prompter = MockConflictPrompter::new();
        prompter.expect_choose_action().never();
        let mut resolver = ConflictResolver::new();
        let action = resolver
            .resolve(&ResourceState::Missing, Path::new("/t"), &prompter)
            .unwrap();
        assert_eq!(action, ConflictAction::OverwriteOnce);
    }

    #[test]
    fn same_file_is_skipped_without_prompt() {
        let mut prompter = MockConflictPrompter::new();
        prompter.expect_choose_action().never();
        let mut resolver = ConflictResolver::new();
        let action = resolver
            .resolve(&ResourceState::Correct, Path::new("/t"), &prompter)
            .unwrap();
        assert_eq!(action, ConflictAction::SkipOnce);
    }

    #[test]
    fn remove_all_prompts_only_once() {
        let mut prompter = MockConflictPrompter::new();
        prompter
            .expect_choose_action()
            .times(1)
            .returning(|_| Ok(ConflictAction::RemoveAll));
        let mut resolver = ConflictResolver::new();

        let first = resolver
            .resolve(&occupied(), Path::new("/a"), &prompter)
            .unwrap();
        let second = resolver
            .resolve(&occupied(), Path::new("/b"), &prompter)
            .unwrap();
        let third = resolver
            .resolve(&occupied(), Path::new("/c"), &prompter)
            .unwrap();

        assert_eq!(first, ConflictAction::RemoveAll);
        assert_eq!(second, ConflictAction::RemoveOnce);
        assert_eq!(third, ConflictAction::RemoveOnce);
        assert_eq!(resolver.sticky(), Some(StickyChoice::Remove));
    }

    #[test]
    fn once_answers_keep_prompting() {
        let mut prompter = MockConflictPrompter::new();
        prompter
            .expect_choose_action()
            .times(2)
            .returning(|_| Ok(ConflictAction::BackupOnce));
        let mut resolver = ConflictResolver::new();
        for target in ["/a", "/b"] {
            resolver
                .resolve(&occupied(), Path::new(target), &prompter)
                .unwrap();
        }
        assert_eq!(resolver.sticky(), None);
    }

    #[test]
    fn sticky_skip_applies_to_later_conflicts() {
        let prompter = ScriptedPrompter::new().with_action(ConflictAction::SkipAll);
        let mut resolver = ConflictResolver::new();
        resolver
            .resolve(&occupied(), Path::new("/a"), &prompter)
            .unwrap();
        let next = resolver
            .resolve(&occupied(), Path::new("/b"), &prompter)
            .unwrap();
        assert_eq!(next, ConflictAction::SkipOnce);
        assert_eq!(prompter.prompt_count(), 1);
    }

    #[test]
    fn prompter_errors_propagate() {
        let mut prompter = MockConflictPrompter::new();
        prompter
            .expect_choose_action()
            .returning(|_| Err(anyhow::anyhow!("stdin closed")));
        let mut resolver = ConflictResolver::new();
        let err = resolver
            .resolve(&occupied(), Path::new("/a"), &prompter)
            .unwrap_err();
        assert!(err.to_string().contains("stdin closed"));
    }

    #[test]
    fn ensure_source_creates_directory_on_yes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("layer/config");
        let prompter = ScriptedPrompter::new().with_create(true);
        assert!(ConflictResolver::ensure_source(&source, &prompter).unwrap());
        assert!(source.is_dir());
    }

    #[test]
    fn ensure_source_declined_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("config");
        let mut prompter = MockConflictPrompter::new();
        prompter.expect_confirm_create().times(1).returning(|_| Ok(false));
        assert!(!ConflictResolver::ensure_source(&source, &prompter).unwrap());
        assert!(!source.exists());
    }

    #[test]
    fn scripted_prompter_errors_when_exhausted() {
        let prompter = ScriptedPrompter::new();
        assert!(prompter.choose_action(Path::new("/t")).is_err());
        assert!(prompter.confirm_create(Path::new("/s")).is_err());
        assert_eq!(prompter.prompt_count(), 2);
    }

    #[test]
    fn sticky_choice_display() {
        assert_eq!(StickyChoice::Backup.to_string(), "back up");
        assert_eq!(StickyChoice::Remove.action(), ConflictAction::RemoveOnce);
    }
}
