//! Post-merge audit watcher.

use std::path::PathBuf;
use std::sync::PoisonError;

use tracing::info;

use crate::audit::{MergeMetadataRecord, iso8601_now};
use crate::error::BridgeError;
use crate::outcome::ValidationOutcome;
use crate::protocol::{ResultStore, TriggerKind, TriggerRecord, UmsDir};
use crate::store::SharedUms;

use super::WatcherTask;

/// Handles [`TriggerRecord::Merge`]: reloads the store (the merge mutated
/// the working tree), validates the merged model state, writes the advisory
/// result the post-merge hook may echo, and records permanent merge
/// metadata.
///
/// The merge commit already exists, so the verdict never blocks anything;
/// the metadata under `.ums/merges/` is the durable audit trail and survives
/// the hook's result cleanup.
pub struct MergeHandler {
    ums: SharedUms,
    merge_results: ResultStore,
    merges_dir: PathBuf,
}

impl MergeHandler {
    /// A handler writing into `dir` for the store shared as `ums`.
    #[must_use]
    pub fn new(ums: SharedUms, dir: &UmsDir) -> Self {
        Self {
            ums,
            merge_results: dir.merge_results(),
            merges_dir: dir.merges_dir(),
        }
    }

    /// Reload then validate under one lock hold, folding store failures
    /// into a `Failure` outcome.
    fn audit_merged_state(&self) -> ValidationOutcome {
        let mut ums = self.ums.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = ums.reload() {
            return ValidationOutcome::failure(vec![format!("reload after merge failed: {e}")]);
        }
        match ums.validate() {
            Ok(outcome) => outcome,
            Err(e) => ValidationOutcome::failure(vec![format!("validation failed: {e}")]),
        }
    }
}

impl WatcherTask for MergeHandler {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn kind(&self) -> TriggerKind {
        TriggerKind::Merge
    }

    fn handle(&mut self, record: TriggerRecord) -> Result<(), BridgeError> {
        let TriggerRecord::Merge {
            request_id,
            merge_commit_sha,
            source_branch,
            target_branch,
        } = record
        else {
            return Err(BridgeError::MalformedTrigger {
                path: self.merges_dir.clone(),
                detail: "merge watcher received a non-merge record".to_owned(),
            });
        };

        let outcome = self.audit_merged_state();
        self.merge_results.write(&request_id, &outcome)?;

        let metadata = MergeMetadataRecord {
            merge_commit_sha,
            source_branch,
            target_branch,
            valid: outcome.is_valid(),
            timestamp: iso8601_now(),
        };
        let path = metadata.write_to(&self.merges_dir)?;
        info!(
            request_id = %request_id,
            valid = metadata.valid,
            path = %path.display(),
            "merge audited"
        );
        Ok(())
    }
}
