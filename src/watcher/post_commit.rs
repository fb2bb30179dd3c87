//! Post-commit changelog watcher.

use std::path::PathBuf;

use tracing::info;

use crate::audit::{Changelog, GitDiffSource, short_sha};
use crate::error::BridgeError;
use crate::protocol::{TriggerKind, TriggerRecord, UmsDir};

use super::WatcherTask;

/// Handles [`TriggerRecord::PostCommit`]: writes the permanent changelog
/// under the real commit SHA.
///
/// This watcher exists because pre-commit does not yet know the SHA the
/// commit will get. Its record supersedes the provisional one without
/// replacing it — each lives under its own short-SHA key.
pub struct PostCommitHandler {
    repo_root: PathBuf,
    changelogs_dir: PathBuf,
    model_include: Vec<String>,
}

impl PostCommitHandler {
    /// A handler writing into `dir`'s changelog directory.
    #[must_use]
    pub fn new(repo_root: PathBuf, dir: &UmsDir, model_include: Vec<String>) -> Self {
        Self {
            repo_root,
            changelogs_dir: dir.changelogs_dir(),
            model_include,
        }
    }
}

impl WatcherTask for PostCommitHandler {
    fn name(&self) -> &'static str {
        "post-commit"
    }

    fn kind(&self) -> TriggerKind {
        TriggerKind::PostCommit
    }

    fn handle(&mut self, record: TriggerRecord) -> Result<(), BridgeError> {
        let TriggerRecord::PostCommit { commit_sha, branch } = record else {
            return Err(BridgeError::MalformedTrigger {
                path: self.changelogs_dir.clone(),
                detail: "post-commit watcher received a non-post-commit record".to_owned(),
            });
        };

        let diff = GitDiffSource::new(&self.repo_root, &self.model_include)?;
        let path = Changelog::gather(&self.repo_root, &commit_sha, &branch, &diff)
            .write_to(&self.changelogs_dir)?;
        info!(
            commit = short_sha(&commit_sha),
            path = %path.display(),
            "permanent changelog written"
        );
        Ok(())
    }
}
