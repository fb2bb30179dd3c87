//! Error types for the hook/watcher coordination layer.
//!
//! Defines [`BridgeError`], the unified error type for coordination
//! operations. Error messages are written for the developer at the terminal:
//! each variant describes what went wrong and, where there is an obvious
//! remedy, how to fix it.
//!
//! Watcher handlers never let a `BridgeError` escape the polling loop; at
//! that boundary errors are logged or folded into a failure outcome
//! (see `crate::watcher`).

use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// BridgeError
// ---------------------------------------------------------------------------

/// Unified error type for hook/watcher coordination operations.
#[derive(Debug)]
pub enum BridgeError {
    /// The given path is not inside a git work tree.
    NotARepository {
        /// The path that was probed.
        path: PathBuf,
    },

    /// A trigger file existed but its contents could not be parsed.
    ///
    /// Callers treat this as "no pending request": the file is removed and
    /// the error is logged, never surfaced to a hook.
    MalformedTrigger {
        /// Path of the offending trigger file.
        path: PathBuf,
        /// Parse failure detail.
        detail: String,
    },

    /// A request id string failed validation.
    InvalidRequestId {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A git command failed.
    Git {
        /// The command that was run (e.g. `"git rev-parse HEAD"`).
        command: String,
        /// Captured stderr from git.
        stderr: String,
    },

    /// A configuration file could not be loaded or parsed.
    Config {
        /// Path to the configuration file.
        path: PathBuf,
        /// Human-readable description of the problem.
        detail: String,
    },

    /// A model resource on disk is corrupted or structurally invalid.
    ///
    /// Distinct from a validation failure: this means the file could not be
    /// read into the store at all.
    ModelCorrupted {
        /// Path of the model resource.
        path: PathBuf,
        /// What was wrong with it.
        detail: String,
    },

    /// The model store was used after `dispose()`.
    StoreDisposed,

    /// A record could not be serialized or deserialized.
    Serialize {
        /// Serializer failure detail.
        detail: String,
    },

    /// An I/O error occurred during a coordination operation.
    Io(std::io::Error),
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotARepository { path } => {
                write!(
                    f,
                    "'{}' is not inside a git work tree.\n  To fix: run from a repository, or pass --repo <path>.",
                    path.display()
                )
            }
            Self::MalformedTrigger { path, detail } => {
                write!(f, "malformed trigger file '{}': {detail}", path.display())
            }
            Self::InvalidRequestId { value, reason } => {
                write!(f, "invalid request id '{value}': {reason}")
            }
            Self::Git { command, stderr } => {
                write!(f, "git command failed: {command}")?;
                if !stderr.is_empty() {
                    write!(f, "\n  stderr: {stderr}")?;
                }
                write!(
                    f,
                    "\n  To fix: check repository state and retry. Run `git status` for details."
                )
            }
            Self::Config { path, detail } => {
                write!(
                    f,
                    "configuration error in '{}': {}\n  To fix: edit the config file and correct the issue.",
                    path.display(),
                    detail
                )
            }
            Self::ModelCorrupted { path, detail } => {
                write!(
                    f,
                    "model resource '{}' is corrupted: {detail}\n  To fix: repair or remove the file, then reload.",
                    path.display()
                )
            }
            Self::StoreDisposed => {
                write!(
                    f,
                    "the model store has been disposed and can no longer serve requests"
                )
            }
            Self::Serialize { detail } => {
                write!(f, "serialization error: {detail}")
            }
            Self::Io(err) => {
                write!(
                    f,
                    "I/O error: {err}\n  To fix: check file permissions and disk space."
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// std::error::Error
// ---------------------------------------------------------------------------

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// From impls
// ---------------------------------------------------------------------------

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize {
            detail: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
