//! The Unified Model Store facade.
//!
//! The store owns the model resources loaded from the work tree and serves
//! the operations the watchers need: `reload`, `validate`, `view`,
//! `dispose`. It is a process-wide resource: built once (builder), shared
//! behind one coarse lock, torn down with `dispose()`. Watchers receive the
//! shared handle, never create or replace it.
//!
//! # Views are stale after reload
//!
//! A [`UmsView`] is a snapshot, not a live reference. The store cannot
//! enumerate outstanding views, so it does not invalidate them; instead the
//! contract is that any view obtained before a `reload()` is stale and must
//! be re-fetched. Treat views as short-lived handles fetched per operation.
//! [`UmsView::is_stale`] makes the check explicit where it matters.

mod resource;
mod validate;

pub use resource::{Component, ModelResource, System};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::BridgeError;
use crate::outcome::ValidationOutcome;

// ---------------------------------------------------------------------------
// Ums
// ---------------------------------------------------------------------------

/// The in-memory model store.
#[derive(Debug)]
pub struct Ums {
    repo_root: PathBuf,
    include: Vec<String>,
    resources: Vec<ModelResource>,
    /// Messages for files that matched the include globs but failed to load.
    /// Folded into every validation as errors.
    load_errors: Vec<String>,
    /// Bumped on every reload; views carry the generation they saw.
    generation: u64,
    disposed: bool,
}

/// The store handle watchers share. One coarse lock serializes reload,
/// validation, and foreground mutation against each other.
pub type SharedUms = Arc<Mutex<Ums>>;

impl Ums {
    /// Start building a store for the repository at `repo_root`.
    #[must_use]
    pub fn builder(repo_root: &Path) -> UmsBuilder {
        UmsBuilder {
            repo_root: repo_root.to_owned(),
            include: crate::config::ModelConfig::default().include,
        }
    }

    /// Wrap a store in the shared handle.
    #[must_use]
    pub fn into_shared(self) -> SharedUms {
        Arc::new(Mutex::new(self))
    }

    /// Re-scan the include globs and load all model resources from disk.
    ///
    /// Files that fail to parse are recorded in `load_errors` (and surface
    /// as validation errors) rather than failing the reload: a broken model
    /// must produce a failing validation, not a dead watcher.
    ///
    /// # Errors
    /// Returns [`BridgeError::StoreDisposed`] after `dispose()`, or
    /// [`BridgeError::Config`] for an invalid include pattern.
    pub fn reload(&mut self) -> Result<(), BridgeError> {
        self.ensure_live()?;

        let mut paths = Vec::new();
        for pattern in &self.include {
            let absolute = self.repo_root.join(pattern);
            let matches =
                glob::glob(&absolute.to_string_lossy()).map_err(|e| BridgeError::Config {
                    path: PathBuf::from(pattern),
                    detail: format!("invalid include pattern: {e}"),
                })?;
            for entry in matches.flatten() {
                if let Ok(rel) = entry.strip_prefix(&self.repo_root) {
                    paths.push(rel.to_owned());
                }
            }
        }
        paths.sort();
        paths.dedup();

        let mut resources = Vec::new();
        let mut load_errors = Vec::new();
        for path in paths {
            match ModelResource::load(&self.repo_root, &path) {
                Ok(resource) => resources.push(resource),
                Err(e) => load_errors.push(e.to_string()),
            }
        }

        debug!(
            resources = resources.len(),
            load_errors = load_errors.len(),
            "store reloaded"
        );
        self.resources = resources;
        self.load_errors = load_errors;
        self.generation += 1;
        Ok(())
    }

    /// Validate all currently loaded resources.
    ///
    /// # Errors
    /// Returns [`BridgeError::StoreDisposed`] after `dispose()`. Rule
    /// findings are data in the outcome, never errors.
    pub fn validate(&self) -> Result<ValidationOutcome, BridgeError> {
        self.ensure_live()?;
        Ok(validate::run(&self.resources, &self.load_errors))
    }

    /// Take a read-only snapshot of the loaded model state.
    ///
    /// # Errors
    /// Returns [`BridgeError::StoreDisposed`] after `dispose()`.
    pub fn view(&self) -> Result<UmsView, BridgeError> {
        self.ensure_live()?;
        Ok(UmsView {
            generation: self.generation,
            systems: self.resources.iter().map(|r| r.system.clone()).collect(),
        })
    }

    /// Release the store. Further operations fail with
    /// [`BridgeError::StoreDisposed`]; calling `dispose` again is a no-op.
    pub fn dispose(&mut self) {
        self.resources.clear();
        self.load_errors.clear();
        self.disposed = true;
    }

    /// The reload generation (starts at 1 after the initial load).
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of loaded resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    const fn ensure_live(&self) -> Result<(), BridgeError> {
        if self.disposed {
            return Err(BridgeError::StoreDisposed);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UmsBuilder
// ---------------------------------------------------------------------------

/// Builder for [`Ums`] — performs the initial load.
#[derive(Debug)]
pub struct UmsBuilder {
    repo_root: PathBuf,
    include: Vec<String>,
}

impl UmsBuilder {
    /// Override the include globs (default: `["**/*.model.json"]`).
    #[must_use]
    pub fn include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    /// Load the store.
    ///
    /// # Errors
    /// Returns [`BridgeError::Config`] for an invalid include pattern.
    pub fn build(self) -> Result<Ums, BridgeError> {
        let mut ums = Ums {
            repo_root: self.repo_root,
            include: self.include,
            resources: Vec::new(),
            load_errors: Vec::new(),
            generation: 0,
            disposed: false,
        };
        ums.reload()?;
        Ok(ums)
    }
}

// ---------------------------------------------------------------------------
// UmsView
// ---------------------------------------------------------------------------

/// A read-only snapshot of the store.
#[derive(Clone, Debug)]
pub struct UmsView {
    generation: u64,
    systems: Vec<System>,
}

impl UmsView {
    /// The systems visible in this snapshot.
    #[must_use]
    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    /// The store generation this view was taken at.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the store has reloaded since this view was taken.
    #[must_use]
    pub const fn is_stale(&self, ums: &Ums) -> bool {
        self.generation != ums.generation
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
