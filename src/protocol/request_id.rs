//! Request identifiers linking a trigger to its result files.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Maximum accepted id length. Generous; hook-generated ids are ~30 chars.
const MAX_LEN: usize = 128;

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// An opaque identifier generated at trigger-creation time and carried back
/// in every result artifact.
///
/// Ids are URL-safe (`[A-Za-z0-9._-]+`) because they become file names under
/// `results/`. Two producers exist:
///
/// - [`RequestId::random`] — 128 random bits as 32 lowercase hex chars,
///   collision-resistant across a process lifetime and across two triggers
///   in the same millisecond.
/// - Hook scripts, which cannot draw 128 random bits portably and write
///   `<epoch-nanos>-<pid>-<random>` instead.
///
/// Both forms parse; consumers never interpret the content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh random id.
    ///
    /// Uses the thread-local PRNG (rand 0.9); each call produces a unique
    /// 128-bit identifier rendered as 32 lowercase hex characters.
    #[must_use]
    pub fn random() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    /// Validate and wrap an id string.
    ///
    /// # Errors
    /// Returns [`BridgeError::InvalidRequestId`] if the string is empty,
    /// longer than 128 characters, or contains characters outside
    /// `[A-Za-z0-9._-]`.
    pub fn parse(s: &str) -> Result<Self, BridgeError> {
        if s.is_empty() {
            return Err(BridgeError::InvalidRequestId {
                value: s.to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if s.len() > MAX_LEN {
            return Err(BridgeError::InvalidRequestId {
                value: s.to_owned(),
                reason: format!("longer than {MAX_LEN} characters"),
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(BridgeError::InvalidRequestId {
                value: s.to_owned(),
                reason: "must contain only [A-Za-z0-9._-]".to_owned(),
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RequestId {
    type Error = BridgeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
