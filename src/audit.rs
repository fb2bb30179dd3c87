//! Permanent audit records under `.ums/`.
//!
//! Two record kinds, both written once and never deleted by the core:
//!
//! - **Changelogs** (`changelogs/<shortSha>.txt`) — one commit's model
//!   state. The pre-commit path writes a provisional record under the SHA
//!   the hook believes will be assigned; the post-commit path writes the
//!   authoritative record under the real SHA. Both are kept, each under its
//!   own key.
//! - **Merge metadata** (`merges/<mergeSha>.metadata`) — one merge's source,
//!   target, and validation verdict.
//!
//! Writers use the same atomic temp-rename discipline as the protocol files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BridgeError;
use crate::git::{self, CommitAuthor, FileChange};
use crate::protocol::write_atomic;

/// Sentinel line written when the diff producer is unavailable or reports
/// no model file changes.
pub const NO_CHANGES_SENTINEL: &str = "No file changes detected.";

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Return the current UTC timestamp in ISO 8601 format.
///
/// Falls back to the epoch if the system clock is unavailable.
#[must_use]
pub fn iso8601_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let sec = secs % 60;
    let min = (secs / 60) % 60;
    let hour = (secs / 3600) % 24;
    let days = secs / 86400;
    let (year, month, day) = days_to_ymd(days);

    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}Z")
}

/// Convert days since Unix epoch to (year, month, day).
///
/// Simplified Gregorian calendar calculation.
const fn days_to_ymd(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468; // offset to 0000-03-01
    let era = z / 146_097; // 400-year era
    let doe = z - era * 146_097; // day of era
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365; // year of era
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year (Mar-based)
    let mp = (5 * doy + 2) / 153; // March-based month
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// The 7-character changelog key for a commit SHA.
#[must_use]
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

// ---------------------------------------------------------------------------
// DiffSource
// ---------------------------------------------------------------------------

/// Producer of the FILE CHANGES section.
///
/// The real producer diffs the commit with git; tests substitute fixed
/// change lists. Any failure degrades to the sentinel, never to a missing
/// changelog.
pub trait DiffSource {
    /// Model files changed by `sha`.
    ///
    /// # Errors
    /// Implementations may fail freely; the changelog writer folds every
    /// failure into [`NO_CHANGES_SENTINEL`].
    fn changes(&self, sha: &str) -> Result<Vec<FileChange>, BridgeError>;
}

/// Diff producer backed by `git diff-tree`, filtered to model files.
pub struct GitDiffSource {
    repo_root: PathBuf,
    include: Vec<glob::Pattern>,
}

impl GitDiffSource {
    /// A source for `repo_root`, filtering to paths matching `include`.
    ///
    /// # Errors
    /// Returns [`BridgeError::Config`] for an invalid include pattern.
    pub fn new(repo_root: &Path, include: &[String]) -> Result<Self, BridgeError> {
        let include = include
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| BridgeError::Config {
                    path: PathBuf::from(p),
                    detail: format!("invalid include pattern: {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            repo_root: repo_root.to_owned(),
            include,
        })
    }
}

impl DiffSource for GitDiffSource {
    fn changes(&self, sha: &str) -> Result<Vec<FileChange>, BridgeError> {
        let all = git::diff_name_status(&self.repo_root, sha)?;
        Ok(all
            .into_iter()
            .filter(|c| self.include.iter().any(|p| p.matches(&c.path)))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Changelog
// ---------------------------------------------------------------------------

/// One commit's audit record, ready to render.
#[derive(Clone, Debug)]
pub struct Changelog {
    pub commit_sha: String,
    pub branch: String,
    pub author: CommitAuthor,
    /// Model file changes; empty means the sentinel line.
    pub changes: Vec<FileChange>,
}

impl Changelog {
    /// Assemble the record for `sha` on `branch`.
    ///
    /// Author and date come from the commit when git can resolve it. A
    /// provisional SHA (pre-commit: the commit does not exist yet) falls
    /// back to the repository's configured identity with the current time,
    /// and to the sentinel for file changes.
    #[must_use]
    pub fn gather(repo_root: &Path, sha: &str, branch: &str, diff: &dyn DiffSource) -> Self {
        let author = git::commit_author(repo_root, sha)
            .ok()
            .flatten()
            .unwrap_or_else(|| git::configured_identity(repo_root));
        let changes = diff.changes(sha).unwrap_or_default();
        Self {
            commit_sha: sha.to_owned(),
            branch: branch.to_owned(),
            author,
            changes,
        }
    }

    /// Render the deterministic text layout.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "SEMANTIC CHANGELOG");
        let _ = writeln!(out, "Commit:     {}", self.commit_sha);
        let _ = writeln!(out, "Branch:     {}", self.branch);
        let _ = writeln!(out, "Author:     {} <{}>", self.author.name, self.author.email);
        let _ = writeln!(out, "AuthorDate: {}", self.author.date);
        let _ = writeln!(out);
        let _ = writeln!(out, "FILE CHANGES");
        if self.changes.is_empty() {
            let _ = writeln!(out, "{NO_CHANGES_SENTINEL}");
        } else {
            for change in &self.changes {
                let word = match change.status {
                    'A' => "added",
                    'M' => "modified",
                    'D' => "removed",
                    _ => "changed",
                };
                let _ = writeln!(out, "  {word:<9} {}", change.path);
            }
        }
        out
    }

    /// Write the record to `<dir>/<shortSha>.txt`, atomically.
    ///
    /// # Errors
    /// Returns [`BridgeError::Io`] on filesystem failure.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, BridgeError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.txt", short_sha(&self.commit_sha)));
        write_atomic(&path, self.render().as_bytes())?;
        debug!(path = %path.display(), "changelog written");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Merge metadata
// ---------------------------------------------------------------------------

/// One merge's permanent audit record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeMetadataRecord {
    pub merge_commit_sha: String,
    pub source_branch: String,
    pub target_branch: String,
    pub valid: bool,
    /// ISO 8601 write time.
    pub timestamp: String,
}

impl MergeMetadataRecord {
    /// The record path for `sha` under `merges_dir`.
    #[must_use]
    pub fn path_for(merges_dir: &Path, sha: &str) -> PathBuf {
        merges_dir.join(format!("{sha}.metadata"))
    }

    /// Render the key/value text layout.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "MergeCommit:  {}\nSourceBranch: {}\nTargetBranch: {}\nValid:        {}\nTimestamp:    {}\n",
            self.merge_commit_sha, self.source_branch, self.target_branch, self.valid, self.timestamp,
        )
    }

    /// Parse a rendered record.
    ///
    /// # Errors
    /// Returns [`BridgeError::Serialize`] if a required key is missing.
    pub fn parse(text: &str) -> Result<Self, BridgeError> {
        let field = |key: &str| -> Result<String, BridgeError> {
            text.lines()
                .find_map(|line| line.strip_prefix(key))
                .map(|rest| rest.trim_start_matches(':').trim().to_owned())
                .ok_or_else(|| BridgeError::Serialize {
                    detail: format!("merge metadata missing key '{key}'"),
                })
        };
        Ok(Self {
            merge_commit_sha: field("MergeCommit")?,
            source_branch: field("SourceBranch")?,
            target_branch: field("TargetBranch")?,
            valid: field("Valid")? == "true",
            timestamp: field("Timestamp")?,
        })
    }

    /// Write the record under `merges_dir`, atomically.
    ///
    /// # Errors
    /// Returns [`BridgeError::Io`] on filesystem failure.
    pub fn write_to(&self, merges_dir: &Path) -> Result<PathBuf, BridgeError> {
        std::fs::create_dir_all(merges_dir)?;
        let path = Self::path_for(merges_dir, &self.merge_commit_sha);
        write_atomic(&path, self.render().as_bytes())?;
        debug!(path = %path.display(), "merge metadata written");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
