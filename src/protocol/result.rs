//! Result files — the reply half of the hook/watcher handshake.
//!
//! Each result materializes as two sibling files keyed by request id: a
//! human-readable `<id>.txt` the hook can cat to the terminal, and a
//! structured `<id>.json` it can hand to tooling. The text sibling is
//! written first; the json sibling last. Readers require both, which closes
//! the writer/reader race: observing `<id>.json` means `<id>.txt` is already
//! complete.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BridgeError;
use crate::outcome::ValidationOutcome;

use super::{RequestId, write_atomic};

// ---------------------------------------------------------------------------
// ResultStore
// ---------------------------------------------------------------------------

/// A directory of result sibling pairs (`results/` or `merge-results/`).
#[derive(Clone, Debug)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// A store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// The store's directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the text sibling for `id`.
    #[must_use]
    pub fn text_path(&self, id: &RequestId) -> PathBuf {
        self.dir.join(format!("{id}.txt"))
    }

    /// Path of the structured sibling for `id`.
    #[must_use]
    pub fn json_path(&self, id: &RequestId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write both siblings for `id`, text first.
    ///
    /// Rewriting the same id replaces both files; no accumulation.
    ///
    /// # Errors
    /// Returns [`BridgeError::Io`] or [`BridgeError::Serialize`] on failure.
    /// On a partial failure the json sibling is absent, so readers still see
    /// "not ready" rather than a torn result.
    pub fn write(&self, id: &RequestId, outcome: &ValidationOutcome) -> Result<(), BridgeError> {
        fs::create_dir_all(&self.dir)?;
        write_atomic(&self.text_path(id), outcome.to_string().as_bytes())?;
        let json = serde_json::to_string_pretty(outcome)?;
        write_atomic(&self.json_path(id), json.as_bytes())?;
        Ok(())
    }

    /// Read the result for `id`, or `None` if it is not ready.
    ///
    /// "Not ready" covers both siblings missing and one sibling missing — a
    /// partial layout is never treated as malformed.
    ///
    /// # Errors
    /// Returns [`BridgeError::Serialize`] only if both siblings exist and
    /// the structured one does not parse.
    pub fn read(&self, id: &RequestId) -> Result<Option<ValidationOutcome>, BridgeError> {
        if !self.exists(id) {
            return Ok(None);
        }
        let json = match fs::read_to_string(self.json_path(id)) {
            Ok(s) => s,
            // Deleted between the exists check and the read: not ready.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let outcome = serde_json::from_str(&json)?;
        Ok(Some(outcome))
    }

    /// Whether both siblings for `id` are present.
    #[must_use]
    pub fn exists(&self, id: &RequestId) -> bool {
        self.text_path(id).is_file() && self.json_path(id).is_file()
    }

    /// Best-effort removal of both siblings.
    pub fn delete(&self, id: &RequestId) {
        let _ = fs::remove_file(self.text_path(id));
        let _ = fs::remove_file(self.json_path(id));
    }

    /// Request ids with at least one sibling on disk.
    ///
    /// # Errors
    /// Returns [`BridgeError::Io`] if the directory exists but cannot be
    /// listed. A missing directory is an empty store.
    pub fn list(&self) -> Result<Vec<RequestId>, BridgeError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".txt").or_else(|| name.strip_suffix(".json"))
                && let Ok(id) = RequestId::parse(stem)
                && !ids.contains(&id)
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ResultStore) {
        let tmp = tempfile::tempdir().expect("temp dir");
        let store = ResultStore::new(tmp.path().join("results"));
        (tmp, store)
    }

    #[test]
    fn write_then_read_round_trips_every_variant() {
        let (_tmp, store) = store();
        let variants = vec![
            ValidationOutcome::success(),
            ValidationOutcome::success_with_warnings(vec!["w1".to_owned()]),
            ValidationOutcome::failure(vec!["e1".to_owned()]),
            ValidationOutcome::failure_with_warnings(vec!["e1".to_owned()], vec!["w1".to_owned()]),
        ];
        for outcome in variants {
            let id = RequestId::random();
            store.write(&id, &outcome).expect("write");
            let back = store.read(&id).expect("read").expect("ready");
            assert_eq!(back, outcome);
        }
    }

    #[test]
    fn missing_result_reads_as_none() {
        let (_tmp, store) = store();
        assert!(store.read(&RequestId::random()).expect("read").is_none());
    }

    #[test]
    fn single_sibling_is_not_ready() {
        let (_tmp, store) = store();
        let id = RequestId::random();
        store.write(&id, &ValidationOutcome::success()).expect("write");

        // Simulate the reader arriving between the two sibling writes.
        fs::remove_file(store.json_path(&id)).expect("remove json");
        assert!(!store.exists(&id));
        assert!(store.read(&id).expect("read").is_none());
    }

    #[test]
    fn rewrite_same_id_is_last_writer_wins() {
        let (_tmp, store) = store();
        let id = RequestId::random();
        store
            .write(&id, &ValidationOutcome::failure(vec!["old".to_owned()]))
            .expect("write");
        store.write(&id, &ValidationOutcome::success()).expect("rewrite");

        let back = store.read(&id).expect("read").expect("ready");
        assert_eq!(back, ValidationOutcome::success());
        let text = fs::read_to_string(store.text_path(&id)).expect("text");
        assert!(!text.contains("old"));
    }

    #[test]
    fn delete_removes_both_siblings_and_is_idempotent() {
        let (_tmp, store) = store();
        let id = RequestId::random();
        store.write(&id, &ValidationOutcome::success()).expect("write");
        store.delete(&id);
        assert!(!store.text_path(&id).exists());
        assert!(!store.json_path(&id).exists());
        store.delete(&id);
    }

    #[test]
    fn list_reports_each_id_once() {
        let (_tmp, store) = store();
        let a = RequestId::random();
        let b = RequestId::random();
        store.write(&a, &ValidationOutcome::success()).expect("write");
        store.write(&b, &ValidationOutcome::success()).expect("write");

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.list().expect("list"), expected);
    }
}
