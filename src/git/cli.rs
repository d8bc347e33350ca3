//! [`GitBackend`] backed by the system `git` binary.
//!
//! Mutations and diffs shell out so they inherit the user's git config,
//! hooks, SSH agent and credential store. Read-only history lookups
//! (discovery, branch, recent subjects) use git2.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{ErrorCode, Repository};
use tokio::process::Command;
use tracing::debug;

use crate::error::GitError;

use super::{ChangeSet, ChangedFile, DiffStats, FileStatus, GitBackend};

pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    /// Locate the repository containing `dir`.
    pub fn open(dir: &Path) -> Result<Self, GitError> {
        let repo = Repository::discover(dir).map_err(|_| GitError::NotARepository(dir.to_path_buf()))?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| GitError::NotARepository(dir.to_path_buf()))?;
        Ok(Self { workdir })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn repo(&self) -> Result<Repository, GitError> {
        Repository::open(&self.workdir).map_err(|_| GitError::NotARepository(self.workdir.clone()))
    }

    /// Run `git -C <workdir> <args>` and return stdout.
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let command = args.first().copied().unwrap_or_default().to_string();
        debug!("Running git {}", args.join(" "));

        let output = Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(args)
            .output()
            .await
            .map_err(|source| GitError::SpawnFailed {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::CommandFailed { command, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn staged_changes(&self) -> Result<Option<ChangeSet>, GitError> {
        let diff = self.run(&["diff", "--cached", "--no-color", "--no-ext-diff"]).await?;
        if diff.trim().is_empty() {
            return Ok(None);
        }

        let numstat = self.run(&["diff", "--cached", "--numstat"]).await?;
        let name_status = self.run(&["diff", "--cached", "--name-status"]).await?;

        let files = parse_name_status(&name_status);
        let stats = stats_from_numstat(&numstat, files.len());
        Ok(Some(ChangeSet::new(diff, true, stats, files)))
    }

    async fn unstaged_changes(&self) -> Result<Option<ChangeSet>, GitError> {
        let mut diff = self.run(&["diff", "--no-color", "--no-ext-diff"]).await?;
        let numstat = self.run(&["diff", "--numstat"]).await?;
        let name_status = self.run(&["diff", "--name-status"]).await?;
        let untracked = self.run(&["ls-files", "--others", "--exclude-standard"]).await?;

        let mut files = parse_name_status(&name_status);
        for path in untracked.lines().map(str::trim).filter(|p| !p.is_empty()) {
            if !diff.is_empty() && !diff.ends_with('\n') {
                diff.push('\n');
            }
            diff.push_str(&format!("new untracked file: {}\n", path));
            files.push(ChangedFile {
                path: path.to_string(),
                status: FileStatus::Untracked,
                old_path: None,
            });
        }

        if files.is_empty() && diff.trim().is_empty() {
            return Ok(None);
        }

        let stats = stats_from_numstat(&numstat, files.len());
        Ok(Some(ChangeSet::new(diff, false, stats, files)))
    }
}

#[async_trait]
impl GitBackend for GitCli {
    async fn changes(&self, include_unstaged_fallback: bool) -> Result<ChangeSet, GitError> {
        if let Some(staged) = self.staged_changes().await? {
            return Ok(staged);
        }

        if include_unstaged_fallback {
            debug!("Nothing staged, falling back to working tree changes");
            if let Some(unstaged) = self.unstaged_changes().await? {
                return Ok(unstaged);
            }
        }

        Err(GitError::NoChanges)
    }

    async fn stage_all(&self) -> Result<(), GitError> {
        self.run(&["add", "-A"]).await.map(|_| ())
    }

    async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message]).await.map(|_| ())
    }

    async fn push(&self) -> Result<(), GitError> {
        self.run(&["push"]).await.map(|_| ())
    }

    async fn current_branch(&self) -> Result<Option<String>, GitError> {
        let repo = self.repo()?;
        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Ok(None);
            }
            Err(e) => {
                return Err(GitError::CommandFailed {
                    command: "rev-parse".into(),
                    stderr: format!("Could not determine HEAD: {}", e),
                });
            }
        };

        if !head.is_branch() {
            return Ok(None);
        }
        Ok(head.shorthand().map(String::from))
    }

    async fn recent_subjects(&self, limit: usize) -> Result<Vec<String>, GitError> {
        let repo = self.repo()?;
        let history_err = |e: git2::Error| GitError::CommandFailed {
            command: "log".into(),
            stderr: e.to_string(),
        };

        let mut revwalk = repo.revwalk().map_err(history_err)?;
        match revwalk.push_head() {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(history_err(e)),
        }

        let mut subjects = Vec::with_capacity(limit);
        for oid in revwalk.take(limit) {
            let oid = oid.map_err(history_err)?;
            let commit = repo.find_commit(oid).map_err(history_err)?;
            if let Some(summary) = commit.summary() {
                subjects.push(summary.to_string());
            }
        }
        Ok(subjects)
    }
}

/// Parse `git diff --name-status` output.
pub(crate) fn parse_name_status(output: &str) -> Vec<ChangedFile> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let code = parts.next()?.trim();
            let first = parts.next()?.to_string();
            let second = parts.next().map(str::to_string);

            let status = match code.chars().next()? {
                'A' => FileStatus::Added,
                'D' => FileStatus::Deleted,
                'R' => FileStatus::Renamed,
                _ => FileStatus::Modified,
            };

            Some(match (status, second) {
                (FileStatus::Renamed, Some(new_path)) => ChangedFile {
                    path: new_path,
                    status,
                    old_path: Some(first),
                },
                _ => ChangedFile {
                    path: first,
                    status,
                    old_path: None,
                },
            })
        })
        .collect()
}

/// Sum `git diff --numstat` output. Binary files (`-`) count as zero lines.
pub(crate) fn stats_from_numstat(output: &str, files_changed: usize) -> DiffStats {
    let mut stats = DiffStats {
        files_changed,
        ..Default::default()
    };
    for line in output.lines() {
        let mut parts = line.split('\t');
        let added = parts.next().and_then(|n| n.parse::<usize>().ok()).unwrap_or(0);
        let deleted = parts.next().and_then(|n| n.parse::<usize>().ok()).unwrap_or(0);
        stats.insertions += added;
        stats.deletions += deleted;
    }
    stats
}
