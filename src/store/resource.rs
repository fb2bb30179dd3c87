//! Model resources — the JSON documents the store loads from the work tree.
//!
//! A resource holds one root [`System`] with its components:
//!
//! ```json
//! {
//!   "system": {
//!     "name": "payments",
//!     "components": [
//!       { "id": "gateway", "name": "Gateway", "requires": ["ledger"] },
//!       { "id": "ledger", "name": "Ledger" }
//!     ]
//!   }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

// ---------------------------------------------------------------------------
// Resource document
// ---------------------------------------------------------------------------

/// One model file, loaded from disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelResource {
    /// Path relative to the repository root.
    pub path: PathBuf,
    /// The root element.
    pub system: System,
}

/// On-disk document shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceDoc {
    system: System,
}

/// The root element of a model resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct System {
    /// Display name of the system.
    pub name: String,
    /// The system's components.
    #[serde(default)]
    pub components: Vec<Component>,
}

/// A component inside a [`System`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Component {
    /// Identifier, unique across all loaded resources.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Ids of components this one depends on.
    #[serde(default)]
    pub requires: Vec<String>,
}

impl ModelResource {
    /// Load a resource from `repo_root`-relative `path`.
    ///
    /// # Errors
    /// Returns [`BridgeError::ModelCorrupted`] if the file cannot be read or
    /// does not match the document shape.
    pub fn load(repo_root: &Path, path: &Path) -> Result<Self, BridgeError> {
        let absolute = repo_root.join(path);
        let contents = fs::read_to_string(&absolute).map_err(|e| BridgeError::ModelCorrupted {
            path: path.to_owned(),
            detail: format!("could not read file: {e}"),
        })?;
        let doc: ResourceDoc =
            serde_json::from_str(&contents).map_err(|e| BridgeError::ModelCorrupted {
                path: path.to_owned(),
                detail: e.to_string(),
            })?;
        Ok(Self {
            path: path.to_owned(),
            system: doc.system,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
