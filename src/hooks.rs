//! Git hook installation.
//!
//! Four POSIX sh scripts bridge git to the watchers. Each script writes its
//! trigger with mktemp + mv (atomic on the same filesystem) and exits; only
//! pre-commit then waits for a result. The scripts carry no runtime
//! dependency on this binary — policy (timeout, fail-open) is baked into the
//! script text at install time so a hook still behaves sensibly when no
//! watcher process is running.
//!
//! Every installed script starts with a marker line; `uninstall_all` removes
//! only marker-carrying files so a hand-written hook is never clobbered.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{BridgeConfig, HooksConfig};
use crate::error::BridgeError;
use crate::git;
use crate::protocol::TriggerKind;

/// First comment line of every installed script.
pub const MARKER: &str = "# installed by ums-bridge; reinstall with `umsb hooks install`";

// ---------------------------------------------------------------------------
// HookKind
// ---------------------------------------------------------------------------

/// The four git hooks the bridge installs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Blocking: may abort the commit.
    PreCommit,
    /// Fire-and-forget reload.
    PostCheckout,
    /// Fire-and-forget changelog.
    PostCommit,
    /// Advisory merge audit.
    PostMerge,
}

impl HookKind {
    /// All kinds, in hook-lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::PreCommit,
        Self::PostCheckout,
        Self::PostCommit,
        Self::PostMerge,
    ];

    /// The git hook file name.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::PreCommit => "pre-commit",
            Self::PostCheckout => "post-checkout",
            Self::PostCommit => "post-commit",
            Self::PostMerge => "post-merge",
        }
    }

    /// The trigger this hook writes.
    #[must_use]
    pub const fn trigger_kind(self) -> TriggerKind {
        match self {
            Self::PreCommit => TriggerKind::Validate,
            Self::PostCheckout => TriggerKind::Reload,
            Self::PostCommit => TriggerKind::PostCommit,
            Self::PostMerge => TriggerKind::Merge,
        }
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

// ---------------------------------------------------------------------------
// HookInstaller
// ---------------------------------------------------------------------------

/// Writes, inspects, and removes the bridge's hook scripts.
#[derive(Debug)]
pub struct HookInstaller {
    hooks_dir: PathBuf,
    config: HooksConfig,
}

impl HookInstaller {
    /// An installer for the repository at `repo_root`.
    ///
    /// # Errors
    /// Returns [`BridgeError::Git`] if the hooks directory cannot be
    /// resolved.
    pub fn new(repo_root: &Path, config: &BridgeConfig) -> Result<Self, BridgeError> {
        Ok(Self {
            hooks_dir: git::hooks_dir(repo_root)?,
            config: config.hooks.clone(),
        })
    }

    /// An installer writing directly into `hooks_dir` (test seam).
    #[must_use]
    pub fn at_dir(hooks_dir: PathBuf, config: HooksConfig) -> Self {
        Self { hooks_dir, config }
    }

    /// The directory scripts are written into.
    #[must_use]
    pub fn hooks_dir(&self) -> &Path {
        &self.hooks_dir
    }

    /// Install all four hooks, returning the written paths.
    ///
    /// # Errors
    /// Returns [`BridgeError::Io`] on filesystem failure.
    pub fn install_all(&self) -> Result<Vec<PathBuf>, BridgeError> {
        HookKind::ALL.iter().map(|k| self.install(*k)).collect()
    }

    /// Install one hook, overwriting any previous version.
    ///
    /// # Errors
    /// Returns [`BridgeError::Io`] on filesystem failure.
    pub fn install(&self, kind: HookKind) -> Result<PathBuf, BridgeError> {
        fs::create_dir_all(&self.hooks_dir)?;
        let path = self.hooks_dir.join(kind.file_name());
        fs::write(&path, self.script_for(kind))?;
        make_executable(&path)?;
        info!(hook = %kind, path = %path.display(), "hook installed");
        Ok(path)
    }

    /// Whether `kind` is installed: the file exists, is executable, and
    /// names its trigger file (the installer's self-test).
    #[must_use]
    pub fn is_installed(&self, kind: HookKind) -> bool {
        let path = self.hooks_dir.join(kind.file_name());
        if !is_executable(&path) {
            return false;
        }
        fs::read_to_string(&path)
            .map(|s| s.contains(kind.trigger_kind().file_name()))
            .unwrap_or(false)
    }

    /// The kinds currently installed.
    #[must_use]
    pub fn installed_kinds(&self) -> Vec<HookKind> {
        HookKind::ALL
            .iter()
            .copied()
            .filter(|k| self.is_installed(*k))
            .collect()
    }

    /// Remove every marker-carrying hook script, returning what was removed.
    ///
    /// Scripts without the marker are left untouched.
    ///
    /// # Errors
    /// Returns [`BridgeError::Io`] on filesystem failure.
    pub fn uninstall_all(&self) -> Result<Vec<HookKind>, BridgeError> {
        let mut removed = Vec::new();
        for kind in HookKind::ALL {
            let path = self.hooks_dir.join(kind.file_name());
            match fs::read_to_string(&path) {
                Ok(contents) if contents.contains(MARKER) => {
                    fs::remove_file(&path)?;
                    removed.push(kind);
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    fn script_for(&self, kind: HookKind) -> String {
        let body = match kind {
            HookKind::PreCommit => PRE_COMMIT,
            HookKind::PostCheckout => POST_CHECKOUT,
            HookKind::PostCommit => POST_COMMIT,
            HookKind::PostMerge => POST_MERGE,
        };
        let (timeout_exit, timeout_note) = if self.config.fail_open {
            ("0", "allowing the operation (fail_open = true)")
        } else {
            ("1", "blocking the commit (fail-closed default)")
        };
        body.replace("@MARKER@", MARKER)
            .replace("@TIMEOUT_SECS@", &self.config.result_timeout_secs.to_string())
            .replace(
                "@TIMEOUT_TICKS@",
                &(self.config.result_timeout_secs * 10).to_string(),
            )
            .replace("@TIMEOUT_EXIT@", timeout_exit)
            .replace("@TIMEOUT_NOTE@", timeout_note)
    }
}

fn make_executable(path: &Path) -> Result<(), BridgeError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(perms.mode() | 0o755);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

// ---------------------------------------------------------------------------
// Script templates
// ---------------------------------------------------------------------------

const PRE_COMMIT: &str = r#"#!/bin/sh
@MARKER@
set -eu

repo_root="$(git rev-parse --show-toplevel)"
ums_dir="$repo_root/.ums"
mkdir -p "$ums_dir/results"

request_id="$(date +%s%N)-$$-${RANDOM:-0}"
branch="$(git symbolic-ref --short HEAD 2>/dev/null || echo HEAD)"
# Provisional: the commit being created has no SHA yet, so the parent
# stands in. The post-commit hook records the real one.
commit_sha="$(git rev-parse HEAD 2>/dev/null || echo 0000000)"

tmp="$(mktemp "$ums_dir/.validate-trigger.XXXXXX")"
printf '{"type":"validate","request_id":"%s","commit_sha":"%s","branch":"%s"}\n' \
    "$request_id" "$commit_sha" "$branch" > "$tmp"
mv "$tmp" "$ums_dir/validate-trigger"

result_txt="$ums_dir/results/$request_id.txt"
result_json="$ums_dir/results/$request_id.json"

i=0
while [ "$i" -lt @TIMEOUT_TICKS@ ]; do
    if [ -f "$result_txt" ] && [ -f "$result_json" ]; then
        if grep -q '^PASSED' "$result_txt"; then
            cat "$result_txt"
            rm -f "$result_txt" "$result_json"
            exit 0
        fi
        cat "$result_txt" >&2
        rm -f "$result_txt" "$result_json"
        exit 1
    fi
    sleep 0.1
    i=$((i + 1))
done

echo "ums-bridge: no validation result after @TIMEOUT_SECS@s, @TIMEOUT_NOTE@" >&2
echo "ums-bridge: is 'umsb watch' running?" >&2
exit @TIMEOUT_EXIT@
"#;

const POST_CHECKOUT: &str = r#"#!/bin/sh
@MARKER@
set -eu

repo_root="$(git rev-parse --show-toplevel)"
ums_dir="$repo_root/.ums"
mkdir -p "$ums_dir"

branch="$(git symbolic-ref --short HEAD 2>/dev/null || echo HEAD)"

tmp="$(mktemp "$ums_dir/.reload-trigger.XXXXXX")"
printf '{"type":"reload","branch":"%s"}\n' "$branch" > "$tmp"
mv "$tmp" "$ums_dir/reload-trigger"
exit 0
"#;

const POST_COMMIT: &str = r#"#!/bin/sh
@MARKER@
set -eu

repo_root="$(git rev-parse --show-toplevel)"
ums_dir="$repo_root/.ums"
mkdir -p "$ums_dir"

branch="$(git symbolic-ref --short HEAD 2>/dev/null || echo HEAD)"
commit_sha="$(git rev-parse HEAD)"

tmp="$(mktemp "$ums_dir/.post-commit-trigger.XXXXXX")"
printf '{"type":"post_commit","commit_sha":"%s","branch":"%s"}\n' \
    "$commit_sha" "$branch" > "$tmp"
mv "$tmp" "$ums_dir/post-commit-trigger"
exit 0
"#;

const POST_MERGE: &str = r#"#!/bin/sh
@MARKER@
set -eu

repo_root="$(git rev-parse --show-toplevel)"
ums_dir="$repo_root/.ums"
mkdir -p "$ums_dir/merge-results"

request_id="$(date +%s%N)-$$-${RANDOM:-0}"
merge_sha="$(git rev-parse HEAD)"
target_branch="$(git symbolic-ref --short HEAD 2>/dev/null || echo HEAD)"
source_branch="$(git log -1 --pretty=%s HEAD | sed -n "s/^Merge branch '\([^']*\)'.*/\1/p")"
[ -n "$source_branch" ] || source_branch="unknown"

tmp="$(mktemp "$ums_dir/.merge-trigger.XXXXXX")"
printf '{"type":"merge","request_id":"%s","merge_commit_sha":"%s","source_branch":"%s","target_branch":"%s"}\n' \
    "$request_id" "$merge_sha" "$source_branch" "$target_branch" > "$tmp"
mv "$tmp" "$ums_dir/merge-trigger"

# Advisory: report the audit if it arrives quickly, never block the merge.
result_txt="$ums_dir/merge-results/$request_id.txt"
result_json="$ums_dir/merge-results/$request_id.json"

i=0
while [ "$i" -lt @TIMEOUT_TICKS@ ]; do
    if [ -f "$result_txt" ] && [ -f "$result_json" ]; then
        cat "$result_txt"
        rm -f "$result_txt" "$result_json"
        exit 0
    fi
    sleep 0.1
    i=$((i + 1))
done

echo "ums-bridge: merge audit pending (see .ums/merges/ once 'umsb watch' catches up)"
exit 0
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn installer() -> (tempfile::TempDir, HookInstaller) {
        let tmp = tempfile::tempdir().expect("temp dir");
        let installer = HookInstaller::at_dir(tmp.path().join("hooks"), HooksConfig::default());
        (tmp, installer)
    }

    #[test]
    fn install_all_writes_four_executable_scripts() {
        let (_tmp, installer) = installer();
        let paths = installer.install_all().expect("install");
        assert_eq!(paths.len(), 4);
        for kind in HookKind::ALL {
            assert!(installer.is_installed(kind), "{kind} should be installed");
        }
    }

    #[test]
    fn scripts_name_their_trigger_file() {
        let (_tmp, installer) = installer();
        installer.install_all().expect("install");
        for kind in HookKind::ALL {
            let script = fs::read_to_string(installer.hooks_dir().join(kind.file_name()))
                .expect("read script");
            assert!(
                script.contains(kind.trigger_kind().file_name()),
                "{kind} script must reference {}",
                kind.trigger_kind().file_name()
            );
            assert!(script.starts_with("#!/bin/sh"));
            assert!(script.contains(MARKER));
        }
    }

    #[test]
    fn is_installed_false_for_missing_or_foreign_hooks() {
        let (_tmp, installer) = installer();
        assert!(!installer.is_installed(HookKind::PreCommit));

        // A hand-written pre-commit without our trigger reference.
        fs::create_dir_all(installer.hooks_dir()).expect("mkdir");
        let path = installer.hooks_dir().join("pre-commit");
        fs::write(&path, "#!/bin/sh\nexit 0\n").expect("write");
        make_executable(&path).expect("chmod");
        assert!(!installer.is_installed(HookKind::PreCommit));
    }

    #[cfg(unix)]
    #[test]
    fn is_installed_requires_executable_bit() {
        use std::os::unix::fs::PermissionsExt as _;

        let (_tmp, installer) = installer();
        let path = installer.install(HookKind::PostCommit).expect("install");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");
        assert!(!installer.is_installed(HookKind::PostCommit));
    }

    #[test]
    fn fail_open_changes_the_timeout_exit() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let closed = HookInstaller::at_dir(tmp.path().join("a"), HooksConfig::default());
        let open = HookInstaller::at_dir(
            tmp.path().join("b"),
            HooksConfig {
                fail_open: true,
                ..HooksConfig::default()
            },
        );
        closed.install(HookKind::PreCommit).expect("install");
        open.install(HookKind::PreCommit).expect("install");

        let closed_script =
            fs::read_to_string(closed.hooks_dir().join("pre-commit")).expect("read");
        let open_script = fs::read_to_string(open.hooks_dir().join("pre-commit")).expect("read");
        assert!(closed_script.contains("exit 1\n"), "fail-closed exits 1");
        assert!(closed_script.trim_end().ends_with("exit 1"));
        assert!(open_script.trim_end().ends_with("exit 0"));
    }

    #[test]
    fn uninstall_removes_only_marked_scripts() {
        let (_tmp, installer) = installer();
        installer.install_all().expect("install");

        // Replace post-merge with a user's own hook.
        let foreign = installer.hooks_dir().join("post-merge");
        fs::write(&foreign, "#!/bin/sh\necho mine\n").expect("write");

        let removed = installer.uninstall_all().expect("uninstall");
        assert_eq!(removed.len(), 3);
        assert!(!removed.contains(&HookKind::PostMerge));
        assert!(foreign.exists());
        assert!(!installer.hooks_dir().join("pre-commit").exists());
    }

    #[test]
    fn timeout_is_baked_into_the_script() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let installer = HookInstaller::at_dir(
            tmp.path().join("hooks"),
            HooksConfig {
                result_timeout_secs: 3,
                fail_open: false,
            },
        );
        installer.install(HookKind::PreCommit).expect("install");
        let script =
            fs::read_to_string(installer.hooks_dir().join("pre-commit")).expect("read");
        assert!(script.contains("-lt 30"), "3s at 100ms ticks");
        assert!(script.contains("after 3s"));
    }
}
