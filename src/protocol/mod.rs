//! The on-disk coordination protocol.
//!
//! Hooks are short-lived external processes and the store has no stable
//! endpoint, so the coordination surface is deliberately a filesystem
//! directory, not shared memory or a socket. Atomic rename on the same
//! filesystem is the only ordering primitive relied upon.
//!
//! Layout, rooted at `<repo>/.ums/`:
//!
//! ```text
//! .ums/validate-trigger            pending pre-commit validation request
//! .ums/reload-trigger              pending post-checkout reload request
//! .ums/post-commit-trigger         pending post-commit changelog request
//! .ums/merge-trigger               pending post-merge audit request
//! .ums/results/<id>.{txt,json}     validation results, keyed by request id
//! .ums/merge-results/<id>.{txt,json}
//! .ums/changelogs/<shortSha>.txt   permanent audit records
//! .ums/merges/<mergeSha>.metadata  permanent audit records
//! .ums/config.toml
//! ```
//!
//! Triggers are singleton files: presence means "pending request", absence
//! means "no work", and the consumer deletes the file as part of accepting
//! the request. Results are request-id-scoped sibling pairs; the `.json`
//! sibling is written last and doubles as the reader's readiness signal.

mod fsio;
mod request_id;
mod result;
mod trigger;

pub use fsio::write_atomic;
pub use request_id::RequestId;
pub use result::ResultStore;
pub use trigger::{TriggerKind, TriggerRecord};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BridgeError;

// ---------------------------------------------------------------------------
// UmsDir
// ---------------------------------------------------------------------------

/// Handle on a repository's `.ums/` coordination directory.
#[derive(Clone, Debug)]
pub struct UmsDir {
    root: PathBuf,
}

impl UmsDir {
    /// Name of the coordination directory under the repo root.
    pub const DIR_NAME: &'static str = ".ums";

    /// The `.ums/` directory of the repository rooted at `repo_root`.
    #[must_use]
    pub fn new(repo_root: &Path) -> Self {
        Self {
            root: repo_root.join(Self::DIR_NAME),
        }
    }

    /// The `.ums/` directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the full directory layout (idempotent).
    ///
    /// # Errors
    /// Returns [`BridgeError::Io`] if a directory cannot be created.
    pub fn ensure_layout(&self) -> Result<(), BridgeError> {
        for dir in [
            self.root.clone(),
            self.results_dir(),
            self.merge_results_dir(),
            self.changelogs_dir(),
            self.merges_dir(),
        ] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// The singleton trigger path for `kind`.
    #[must_use]
    pub fn trigger_path(&self, kind: TriggerKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    /// Directory of pre-commit validation results.
    #[must_use]
    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    /// Directory of post-merge validation results.
    #[must_use]
    pub fn merge_results_dir(&self) -> PathBuf {
        self.root.join("merge-results")
    }

    /// Directory of permanent changelog records.
    #[must_use]
    pub fn changelogs_dir(&self) -> PathBuf {
        self.root.join("changelogs")
    }

    /// Directory of permanent merge metadata records.
    #[must_use]
    pub fn merges_dir(&self) -> PathBuf {
        self.root.join("merges")
    }

    /// The bridge configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// The result store for pre-commit validation.
    #[must_use]
    pub fn results(&self) -> ResultStore {
        ResultStore::new(self.results_dir())
    }

    /// The result store for post-merge audits.
    #[must_use]
    pub fn merge_results(&self) -> ResultStore {
        ResultStore::new(self.merge_results_dir())
    }

    /// Write `record` to its kind's singleton trigger path, atomically.
    ///
    /// Returns the request id for id-bearing kinds so the caller can await
    /// the paired result.
    ///
    /// # Errors
    /// Returns [`BridgeError::Io`] or [`BridgeError::Serialize`] on failure.
    pub fn create_trigger(
        &self,
        record: &TriggerRecord,
    ) -> Result<Option<RequestId>, BridgeError> {
        fs::create_dir_all(&self.root)?;
        let path = self.trigger_path(record.kind());
        let json = serde_json::to_string_pretty(record)?;
        write_atomic(&path, json.as_bytes())?;
        Ok(record.request_id().cloned())
    }

    /// Accept the pending trigger of `kind`, if any.
    ///
    /// Acceptance is rename-as-claim: the singleton path is renamed to a
    /// consumer-owned temporary name before it is read, so concurrent ticks
    /// can never both observe the same trigger. The claimed file is deleted
    /// before parsing; a malformed trigger is therefore consumed (treated as
    /// absent by the caller) and reported as
    /// [`BridgeError::MalformedTrigger`] for logging.
    ///
    /// # Errors
    /// Returns [`BridgeError::MalformedTrigger`] if the file existed but did
    /// not parse, or [`BridgeError::Io`] on other failures.
    pub fn check_and_clear(
        &self,
        kind: TriggerKind,
    ) -> Result<Option<TriggerRecord>, BridgeError> {
        let path = self.trigger_path(kind);
        let claim = self
            .root
            .join(format!(".{}.accepted-{:08x}", kind.file_name(), rand::random::<u32>()));

        match fs::rename(&path, &claim) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let contents = fs::read_to_string(&claim);
        // The claim is ours either way; remove it before parsing so a bad
        // record cannot wedge the trigger path.
        let _ = fs::remove_file(&claim);

        let contents = contents?;
        match serde_json::from_str::<TriggerRecord>(&contents) {
            Ok(record) if record.kind() == kind => Ok(Some(record)),
            Ok(record) => Err(BridgeError::MalformedTrigger {
                path,
                detail: format!(
                    "expected a {} record, found {}",
                    kind.file_name(),
                    record.kind().file_name()
                ),
            }),
            Err(e) => Err(BridgeError::MalformedTrigger {
                path,
                detail: e.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> tempfile::TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn create_then_clear_round_trips_the_record() {
        let tmp = scratch_dir();
        let ums = UmsDir::new(tmp.path());

        let record = TriggerRecord::validate("abc1234def".to_owned(), "main".to_owned());
        let id = ums
            .create_trigger(&record)
            .expect("create")
            .expect("validation triggers carry an id");

        let accepted = ums
            .check_and_clear(TriggerKind::Validate)
            .expect("clear")
            .expect("trigger was pending");
        assert_eq!(accepted.request_id(), Some(&id));
        assert_eq!(accepted, record);
    }

    #[test]
    fn second_clear_returns_none() {
        let tmp = scratch_dir();
        let ums = UmsDir::new(tmp.path());
        ums.create_trigger(&TriggerRecord::reload("main".to_owned()))
            .expect("create");

        assert!(
            ums.check_and_clear(TriggerKind::Reload)
                .expect("first clear")
                .is_some()
        );
        assert!(
            ums.check_and_clear(TriggerKind::Reload)
                .expect("second clear")
                .is_none()
        );
    }

    #[test]
    fn clear_without_trigger_is_none() {
        let tmp = scratch_dir();
        let ums = UmsDir::new(tmp.path());
        assert!(
            ums.check_and_clear(TriggerKind::Merge)
                .expect("no trigger")
                .is_none()
        );
    }

    #[test]
    fn malformed_trigger_is_consumed_and_reported() {
        let tmp = scratch_dir();
        let ums = UmsDir::new(tmp.path());
        std::fs::create_dir_all(ums.root()).expect("mkdir");
        std::fs::write(ums.trigger_path(TriggerKind::Validate), b"not json").expect("write");

        let err = ums
            .check_and_clear(TriggerKind::Validate)
            .expect_err("malformed");
        assert!(matches!(err, BridgeError::MalformedTrigger { .. }));

        // Consumed: the singleton path is free again.
        assert!(
            ums.check_and_clear(TriggerKind::Validate)
                .expect("now absent")
                .is_none()
        );
    }

    #[test]
    fn wrong_kind_in_singleton_is_rejected() {
        let tmp = scratch_dir();
        let ums = UmsDir::new(tmp.path());
        std::fs::create_dir_all(ums.root()).expect("mkdir");
        let reload = serde_json::to_string(&TriggerRecord::reload("main".to_owned()))
            .expect("serialize");
        std::fs::write(ums.trigger_path(TriggerKind::Validate), reload).expect("write");

        let err = ums
            .check_and_clear(TriggerKind::Validate)
            .expect_err("kind mismatch");
        assert!(matches!(err, BridgeError::MalformedTrigger { .. }));
    }

    #[test]
    fn concurrent_clears_deliver_exactly_once() {
        use std::sync::Arc;

        let tmp = scratch_dir();
        let ums = Arc::new(UmsDir::new(tmp.path()));
        ums.create_trigger(&TriggerRecord::post_commit(
            "abc1234def".to_owned(),
            "main".to_owned(),
        ))
        .expect("create");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ums = Arc::clone(&ums);
                std::thread::spawn(move || {
                    ums.check_and_clear(TriggerKind::PostCommit)
                        .expect("clear")
                        .is_some()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("join"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1, "exactly one tick may observe the trigger");
    }
}
