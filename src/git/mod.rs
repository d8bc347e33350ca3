//! Version-control access: the change set handed to the model, plus the
//! staging, commit and push side effects.

pub mod cli;

use std::fmt;

use async_trait::async_trait;

use crate::error::GitError;

pub use cli::GitCli;

/// Status of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Untracked,
}

impl FileStatus {
    /// One-letter code as printed by `git status --short`.
    pub fn code(&self) -> char {
        match self {
            FileStatus::Added => 'A',
            FileStatus::Modified => 'M',
            FileStatus::Deleted => 'D',
            FileStatus::Renamed => 'R',
            FileStatus::Untracked => '?',
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "Added"),
            FileStatus::Modified => write!(f, "Modified"),
            FileStatus::Deleted => write!(f, "Deleted"),
            FileStatus::Renamed => write!(f, "Renamed"),
            FileStatus::Untracked => write!(f, "Untracked"),
        }
    }
}

/// A file that was changed in the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
    /// Old path for renamed files (None for non-rename changes).
    pub old_path: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file{} changed, {} insertion{}(+), {} deletion{}(-)",
            self.files_changed,
            plural(self.files_changed),
            self.insertions,
            plural(self.insertions),
            self.deletions,
            plural(self.deletions)
        )
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Snapshot of pending changes. Re-fetched on every generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub diff: String,
    /// True when the diff came from the index rather than the working tree.
    pub staged: bool,
    pub stats: DiffStats,
    pub files: Vec<ChangedFile>,
    pub file_summary: String,
}

impl ChangeSet {
    pub fn new(diff: String, staged: bool, stats: DiffStats, files: Vec<ChangedFile>) -> Self {
        let file_summary = summarize_files(&files);
        Self {
            diff,
            staged,
            stats,
            files,
            file_summary,
        }
    }
}

/// `M  src/main.rs` style listing, one file per line.
pub fn summarize_files(files: &[ChangedFile]) -> String {
    files
        .iter()
        .map(|f| match &f.old_path {
            Some(old) => format!("{}  {} -> {}", f.status.code(), old, f.path),
            None => format!("{}  {}", f.status.code(), f.path),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Source of change sets and sink for commit side effects.
///
/// This abstraction allows mocking the repository in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitBackend: Send + Sync {
    /// Staged changes, or the working tree when nothing is staged and
    /// `include_unstaged_fallback` is set. Fails with `GitError::NoChanges`
    /// when there is nothing to describe.
    async fn changes(&self, include_unstaged_fallback: bool) -> Result<ChangeSet, GitError>;

    /// `git add -A`
    async fn stage_all(&self) -> Result<(), GitError>;

    async fn commit(&self, message: &str) -> Result<(), GitError>;

    async fn push(&self) -> Result<(), GitError>;

    /// Current branch name; `None` on a detached or unborn HEAD.
    async fn current_branch(&self) -> Result<Option<String>, GitError>;

    /// Subjects of the most recent commits reachable from HEAD, newest first.
    async fn recent_subjects(&self, limit: usize) -> Result<Vec<String>, GitError>;
}
