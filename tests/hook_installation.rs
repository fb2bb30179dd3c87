//! Hook installation against real repositories.

mod common;

use common::TestRepo;

use ums_bridge::config::BridgeConfig;
use ums_bridge::hooks::{HookInstaller, HookKind, MARKER};

fn installer(repo: &TestRepo) -> HookInstaller {
    HookInstaller::new(repo.root(), &BridgeConfig::default()).expect("resolve hooks dir")
}

#[test]
fn install_all_creates_four_canonical_hooks() {
    let repo = TestRepo::new();
    let installer = installer(&repo);

    installer.install_all().expect("install");

    for kind in HookKind::ALL {
        assert!(installer.is_installed(kind), "{kind} missing");
        let path = installer.hooks_dir().join(kind.file_name());
        assert!(path.is_file());
        let script = std::fs::read_to_string(&path).expect("read script");
        assert!(
            script.contains(kind.trigger_kind().file_name()),
            "{kind} must name its trigger file"
        );
    }
}

#[cfg(unix)]
#[test]
fn installed_hooks_are_executable() {
    use std::os::unix::fs::PermissionsExt as _;

    let repo = TestRepo::new();
    let installer = installer(&repo);
    installer.install_all().expect("install");

    for kind in HookKind::ALL {
        let path = installer.hooks_dir().join(kind.file_name());
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert!(mode & 0o111 != 0, "{kind} not executable (mode {mode:o})");
    }
}

#[test]
fn reinstall_is_idempotent() {
    let repo = TestRepo::new();
    let installer = installer(&repo);
    installer.install_all().expect("first install");
    installer.install_all().expect("second install");
    assert_eq!(installer.installed_kinds().len(), 4);
}

#[test]
fn uninstall_spares_foreign_hooks() {
    let repo = TestRepo::new();
    let installer = installer(&repo);
    installer.install_all().expect("install");

    // A user-owned pre-push hook must survive.
    let foreign = installer.hooks_dir().join("pre-push");
    std::fs::write(&foreign, "#!/bin/sh\nexit 0\n").expect("write foreign hook");

    let removed = installer.uninstall_all().expect("uninstall");
    assert_eq!(removed.len(), 4);
    assert!(foreign.exists());
    assert!(installer.installed_kinds().is_empty());
}

#[test]
fn scripts_carry_the_marker() {
    let repo = TestRepo::new();
    let installer = installer(&repo);
    installer.install_all().expect("install");

    for kind in HookKind::ALL {
        let script = std::fs::read_to_string(installer.hooks_dir().join(kind.file_name()))
            .expect("read script");
        assert!(script.contains(MARKER), "{kind} missing marker");
    }
}
