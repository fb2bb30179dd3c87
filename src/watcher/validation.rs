//! Pre-commit validation watcher.

use std::path::PathBuf;
use std::sync::PoisonError;

use tracing::info;

use crate::audit::{Changelog, GitDiffSource};
use crate::error::BridgeError;
use crate::outcome::ValidationOutcome;
use crate::protocol::{ResultStore, TriggerKind, TriggerRecord, UmsDir};
use crate::store::SharedUms;

use super::WatcherTask;

/// Handles [`TriggerRecord::Validate`]: runs store validation, writes the
/// result the blocking pre-commit hook is polling for, and, when the model
/// is valid, a provisional changelog under the trigger-provided SHA.
///
/// The SHA is provisional because pre-commit runs before the commit exists;
/// the post-commit watcher later writes the authoritative record under the
/// real SHA. Both records are kept.
pub struct ValidationHandler {
    ums: SharedUms,
    repo_root: PathBuf,
    results: ResultStore,
    changelogs_dir: PathBuf,
    model_include: Vec<String>,
}

impl ValidationHandler {
    /// A handler writing into `dir` for the store shared as `ums`.
    #[must_use]
    pub fn new(ums: SharedUms, repo_root: PathBuf, dir: &UmsDir, model_include: Vec<String>) -> Self {
        Self {
            ums,
            repo_root,
            results: dir.results(),
            changelogs_dir: dir.changelogs_dir(),
            model_include,
        }
    }

    /// Validate under the store lock, folding store failures into a
    /// `Failure` outcome so the hook always gets something to report.
    fn run_validation(&self) -> ValidationOutcome {
        let ums = self.ums.lock().unwrap_or_else(PoisonError::into_inner);
        match ums.validate() {
            Ok(outcome) => outcome,
            Err(e) => ValidationOutcome::failure(vec![format!("validation failed: {e}")]),
        }
    }
}

impl WatcherTask for ValidationHandler {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn kind(&self) -> TriggerKind {
        TriggerKind::Validate
    }

    fn handle(&mut self, record: TriggerRecord) -> Result<(), BridgeError> {
        let TriggerRecord::Validate {
            request_id,
            commit_sha,
            branch,
        } = record
        else {
            return Err(BridgeError::MalformedTrigger {
                path: self.results.dir().to_owned(),
                detail: "validation watcher received a non-validation record".to_owned(),
            });
        };

        let outcome = self.run_validation();
        self.results.write(&request_id, &outcome)?;
        info!(
            request_id = %request_id,
            valid = outcome.is_valid(),
            warnings = outcome.warnings().len(),
            "validation result written"
        );

        if outcome.is_valid() {
            let diff = GitDiffSource::new(&self.repo_root, &self.model_include)?;
            Changelog::gather(&self.repo_root, &commit_sha, &branch, &diff)
                .write_to(&self.changelogs_dir)?;
        }
        Ok(())
    }
}
