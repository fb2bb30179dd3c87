//! Test infrastructure — real git repositories with model resources.
#![allow(dead_code)]
//!
//! Provides [`TestRepo`], a self-contained repository in a temporary
//! directory. Each `TestRepo` gets a unique temp dir, runs real git
//! commands, and cleans up on drop.
//!
//! # Design principles
//!
//! - **Git-native**: drives the real `git` binary, exactly like the hooks.
//! - **Parallel-safe**: each `TestRepo` lives in its own `TempDir`.
//! - **Drop-safe**: temp dirs are deleted when `TestRepo` goes out of scope.
//! - **Ergonomic**: helpers like `write_model`, `commit_all`, `checkout`
//!   speak the domain, not paths.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use ums_bridge::protocol::UmsDir;

/// A clean model resource with one connected component pair.
pub const CLEAN_MODEL: &str = r#"{
  "system": {
    "name": "payments",
    "components": [
      { "id": "gateway", "name": "Gateway", "requires": ["ledger"] },
      { "id": "ledger", "name": "Ledger" }
    ]
  }
}
"#;

/// A model resource with a dangling `requires` reference.
pub const BROKEN_MODEL: &str = r#"{
  "system": {
    "name": "payments",
    "components": [
      { "id": "gateway", "name": "Gateway", "requires": ["ghost"] }
    ]
  }
}
"#;

// ---------------------------------------------------------------------------
// TestRepo
// ---------------------------------------------------------------------------

/// A self-contained git repository with model resources, in a temp dir.
pub struct TestRepo {
    /// The temp dir — held to prevent premature cleanup.
    _dir: TempDir,
    /// Absolute path to the repo root (same as `_dir.path()`).
    root: PathBuf,
}

impl TestRepo {
    /// Create a repo on `main` with one clean model resource committed.
    ///
    /// # Panics
    /// Panics if any git command fails.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = dir.path().to_path_buf();

        git_ok(&root, &["init"]);
        git_ok(&root, &["config", "user.name", "Test"]);
        git_ok(&root, &["config", "user.email", "test@localhost"]);
        git_ok(&root, &["config", "commit.gpgsign", "false"]);
        git_ok(&root, &["checkout", "-B", "main"]);

        let repo = Self { _dir: dir, root };
        repo.write_model("payments.model.json", CLEAN_MODEL);
        repo.commit_all("add payments model");
        repo
    }

    /// Absolute path to the repo root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.ums/` handle for this repo.
    #[must_use]
    pub fn ums_dir(&self) -> UmsDir {
        UmsDir::new(&self.root)
    }

    /// Write (or overwrite) a model file. Does not commit.
    pub fn write_model(&self, name: &str, body: &str) {
        std::fs::write(self.root.join(name), body).expect("failed to write model file");
    }

    /// Stage everything and commit, returning the new HEAD SHA.
    pub fn commit_all(&self, message: &str) -> String {
        git_ok(&self.root, &["add", "-A"]);
        git_ok(&self.root, &["commit", "-m", message]);
        self.head_sha()
    }

    /// The full SHA of HEAD.
    #[must_use]
    pub fn head_sha(&self) -> String {
        git_ok(&self.root, &["rev-parse", "HEAD"]).trim().to_owned()
    }

    /// The current branch name.
    #[must_use]
    pub fn current_branch(&self) -> String {
        git_ok(&self.root, &["symbolic-ref", "--short", "HEAD"])
            .trim()
            .to_owned()
    }

    /// Create and switch to a branch.
    pub fn create_branch(&self, name: &str) {
        git_ok(&self.root, &["checkout", "-b", name]);
    }

    /// Switch to an existing branch.
    pub fn checkout(&self, name: &str) {
        git_ok(&self.root, &["checkout", name]);
    }

    /// Merge `branch` into the current branch with a merge commit,
    /// returning the merge commit SHA.
    pub fn merge(&self, branch: &str) -> String {
        git_ok(&self.root, &["merge", "--no-ff", branch]);
        self.head_sha()
    }

    /// Run a git command in the repo, asserting success.
    pub fn git(&self, args: &[&str]) -> String {
        git_ok(&self.root, args)
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run a git command in the given directory, panicking on failure.
pub fn git_ok(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {}: {e}", args.join(" ")));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "git {} failed in {}:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
        dir.display(),
    );
    stdout.to_string()
}

/// Poll `probe` until it returns true or `deadline` elapses.
pub fn wait_until(deadline: Duration, mut probe: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if probe() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}
