//! Trigger records — the request half of the hook/watcher handshake.

use serde::{Deserialize, Serialize};

use super::RequestId;

// ---------------------------------------------------------------------------
// TriggerKind
// ---------------------------------------------------------------------------

/// The four trigger types, one singleton file each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Pre-commit validation request (blocking on the hook side).
    Validate,
    /// Post-checkout reload request (fire-and-forget).
    Reload,
    /// Post-commit changelog request (fire-and-forget).
    PostCommit,
    /// Post-merge audit request (advisory).
    Merge,
}

impl TriggerKind {
    /// All kinds, in hook-lifecycle order.
    pub const ALL: [Self; 4] = [Self::Validate, Self::Reload, Self::PostCommit, Self::Merge];

    /// The singleton file name under `.ums/`.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Validate => "validate-trigger",
            Self::Reload => "reload-trigger",
            Self::PostCommit => "post-commit-trigger",
            Self::Merge => "merge-trigger",
        }
    }
}

// ---------------------------------------------------------------------------
// TriggerRecord
// ---------------------------------------------------------------------------

/// A pending request written by a hook script and consumed by a watcher.
///
/// Serialized as tagged JSON (`{"type":"validate",...}`) so the shell side
/// can emit records with a single `printf`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum TriggerRecord {
    /// Written by the pre-commit hook. Blocking: the hook waits for the
    /// result keyed by `request_id`.
    Validate {
        request_id: RequestId,
        /// The SHA the hook believes the commit will get. Provisional — the
        /// real SHA does not exist yet at pre-commit time.
        commit_sha: String,
        branch: String,
    },

    /// Written by the post-checkout hook. Identifier-less: consumption of
    /// the trigger file is the only observable signal.
    Reload { branch: String },

    /// Written by the post-commit hook, carrying the real commit SHA.
    PostCommit { commit_sha: String, branch: String },

    /// Written by the post-merge hook after the merge commit exists.
    Merge {
        request_id: RequestId,
        merge_commit_sha: String,
        source_branch: String,
        target_branch: String,
    },
}

impl TriggerRecord {
    /// A validation trigger with a fresh request id.
    #[must_use]
    pub fn validate(commit_sha: String, branch: String) -> Self {
        Self::Validate {
            request_id: RequestId::random(),
            commit_sha,
            branch,
        }
    }

    /// A reload trigger.
    #[must_use]
    pub const fn reload(branch: String) -> Self {
        Self::Reload { branch }
    }

    /// A post-commit trigger.
    #[must_use]
    pub const fn post_commit(commit_sha: String, branch: String) -> Self {
        Self::PostCommit { commit_sha, branch }
    }

    /// A merge trigger with a fresh request id.
    #[must_use]
    pub fn merge(merge_commit_sha: String, source_branch: String, target_branch: String) -> Self {
        Self::Merge {
            request_id: RequestId::random(),
            merge_commit_sha,
            source_branch,
            target_branch,
        }
    }

    /// Which singleton file this record belongs to.
    #[must_use]
    pub const fn kind(&self) -> TriggerKind {
        match self {
            Self::Validate { .. } => TriggerKind::Validate,
            Self::Reload { .. } => TriggerKind::Reload,
            Self::PostCommit { .. } => TriggerKind::PostCommit,
            Self::Merge { .. } => TriggerKind::Merge,
        }
    }

    /// The request id, for the id-bearing kinds.
    #[must_use]
    pub const fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::Validate { request_id, .. } | Self::Merge { request_id, .. } => {
                Some(request_id)
            }
            Self::Reload { .. } | Self::PostCommit { .. } => None,
        }
    }

    /// The branch named by the record.
    #[must_use]
    pub fn branch(&self) -> &str {
        match self {
            Self::Validate { branch, .. }
            | Self::Reload { branch }
            | Self::PostCommit { branch, .. } => branch,
            Self::Merge { target_branch, .. } => target_branch,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
