//! Thin wrappers around the `git` binary.
//!
//! The coordination layer never links a git library: hooks are installed by
//! writing scripts that call `git`, and the handful of queries the watchers
//! need (repo root, HEAD, author identity, changed files) go through
//! `std::process::Command` here.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::BridgeError;

/// Run a git subcommand in `repo` and return trimmed stdout.
///
/// # Errors
/// Returns [`BridgeError::Git`] if git could not be spawned or exited
/// non-zero.
pub fn run(repo: &Path, args: &[&str]) -> Result<String, BridgeError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(|e| BridgeError::Git {
            command: format!("git {}", args.join(" ")),
            stderr: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(BridgeError::Git {
            command: format!("git {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// Resolve the repository work-tree root containing `start`.
///
/// # Errors
/// Returns [`BridgeError::NotARepository`] if `start` is not inside a git
/// work tree.
pub fn repo_root(start: &Path) -> Result<PathBuf, BridgeError> {
    run(start, &["rev-parse", "--show-toplevel"])
        .map(PathBuf::from)
        .map_err(|_| BridgeError::NotARepository {
            path: start.to_owned(),
        })
}

/// Resolve the hooks directory for `repo`.
///
/// `--git-path` output may be relative to the repo root.
///
/// # Errors
/// Returns [`BridgeError::Git`] if the repository cannot be queried.
pub fn hooks_dir(repo: &Path) -> Result<PathBuf, BridgeError> {
    let raw = run(repo, &["rev-parse", "--git-path", "hooks"])?;
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(repo.join(path))
    }
}

/// The full SHA of `HEAD`.
///
/// # Errors
/// Returns [`BridgeError::Git`] on repositories with no commits.
pub fn head_sha(repo: &Path) -> Result<String, BridgeError> {
    run(repo, &["rev-parse", "HEAD"])
}

/// The short name of the current branch, or `"HEAD"` when detached.
///
/// # Errors
/// Returns [`BridgeError::Git`] if the repository cannot be queried.
pub fn current_branch(repo: &Path) -> Result<String, BridgeError> {
    match run(repo, &["symbolic-ref", "--short", "HEAD"]) {
        Ok(branch) => Ok(branch),
        // Detached HEAD: symbolic-ref fails but the repo is fine.
        Err(BridgeError::Git { stderr, .. }) if stderr.contains("not a symbolic ref") => {
            Ok("HEAD".to_owned())
        }
        Err(e) => Err(e),
    }
}

/// Author identity of a commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
    /// ISO 8601 author date.
    pub date: String,
}

/// Look up the author of `sha`, or `None` if the commit does not exist.
///
/// A pre-commit changelog carries a SHA git cannot yet resolve; callers fall
/// back to the configured identity in that case.
///
/// # Errors
/// Returns [`BridgeError::Git`] only for failures other than an unresolvable
/// SHA.
pub fn commit_author(repo: &Path, sha: &str) -> Result<Option<CommitAuthor>, BridgeError> {
    match run(repo, &["show", "-s", "--format=%an%n%ae%n%aI", sha]) {
        Ok(out) => {
            let mut lines = out.lines();
            let name = lines.next().unwrap_or_default().to_owned();
            let email = lines.next().unwrap_or_default().to_owned();
            let date = lines.next().unwrap_or_default().to_owned();
            Ok(Some(CommitAuthor { name, email, date }))
        }
        Err(BridgeError::Git { stderr, .. })
            if stderr.contains("unknown revision")
                || stderr.contains("bad revision")
                || stderr.contains("ambiguous argument") =>
        {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// The configured identity (`user.name`, `user.email`), with placeholders
/// when unset.
#[must_use]
pub fn configured_identity(repo: &Path) -> CommitAuthor {
    let name = run(repo, &["config", "user.name"]).unwrap_or_else(|_| "unknown".to_owned());
    let email =
        run(repo, &["config", "user.email"]).unwrap_or_else(|_| "unknown@localhost".to_owned());
    CommitAuthor {
        name,
        email,
        date: crate::audit::iso8601_now(),
    }
}

/// One entry of a commit's name-status diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChange {
    /// Single-letter git status (`A`, `M`, `D`, ...).
    pub status: char,
    /// Path relative to the repo root.
    pub path: String,
}

/// Files changed by `sha` relative to its first parent.
///
/// # Errors
/// Returns [`BridgeError::Git`] if the commit cannot be diffed (including a
/// not-yet-existing provisional SHA).
pub fn diff_name_status(repo: &Path, sha: &str) -> Result<Vec<FileChange>, BridgeError> {
    let out = run(
        repo,
        &["diff-tree", "--no-commit-id", "--name-status", "-r", sha],
    )?;
    let mut changes = Vec::new();
    for line in out.lines() {
        let mut parts = line.split('\t');
        let status = parts.next().and_then(|s| s.chars().next());
        let path = parts.next();
        if let (Some(status), Some(path)) = (status, path) {
            changes.push(FileChange {
                status,
                path: path.to_owned(),
            });
        }
    }
    Ok(changes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
