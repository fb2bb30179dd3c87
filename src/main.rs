use std::path::PathBuf;
use std::sync::PoisonError;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use ums_bridge::config::BridgeConfig;
use ums_bridge::git;
use ums_bridge::hooks::{HookInstaller, HookKind};
use ums_bridge::protocol::{TriggerKind, UmsDir};
use ums_bridge::store::Ums;
use ums_bridge::telemetry;
use ums_bridge::watcher::WatcherSet;

/// Hook/watcher coordination between git and the Unified Model Store
///
/// umsb keeps structured models and git in step: ordinary git commands
/// trigger validation, reload, changelog, and merge-audit work in a
/// long-running watcher process, coordinated through small files under
/// .ums/ — no sockets, no daemon registry.
///
/// QUICK START:
///
///   umsb init            # create .ums/ and a default config
///   umsb hooks install   # write the four git hooks
///   umsb watch           # run the watchers (leave this running)
///
///   # then commit, checkout, and merge as usual; pre-commit blocks on
///   # validation, everything else is audited in the background.
#[derive(Parser)]
#[command(name = "umsb")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Repository to operate on (default: the one containing the cwd)
    #[arg(long, global = true, value_name = "PATH")]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the .ums/ layout and a default config
    ///
    /// Safe to run multiple times; an existing config is left untouched.
    Init,

    /// Manage the git hook scripts
    #[command(subcommand)]
    Hooks(HooksCommand),

    /// Run all four watchers until interrupted
    ///
    /// Loads the model store, then polls the trigger files. Stop with
    /// Ctrl-C; in-flight handlers complete before shutdown.
    Watch,

    /// Validate the model resources once and print the result
    ///
    /// Exits 1 if validation fails — usable from CI without any hooks.
    Validate,

    /// Show pending triggers, results, and recent audit records
    Status,
}

#[derive(Subcommand)]
enum HooksCommand {
    /// Install the four hook scripts
    ///
    /// Writes pre-commit, post-checkout, post-commit, and post-merge into
    /// the repository's hook directory, overwriting previous versions.
    Install,
    /// Show which hook scripts are installed
    Status,
    /// Remove the installed hook scripts (hand-written hooks are kept)
    Uninstall,
}

fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();

    let start = cli.repo.clone().map_or_else(
        || std::env::current_dir().context("cannot determine current directory"),
        Ok,
    )?;
    let root = git::repo_root(&start)?;

    match cli.command {
        Commands::Init => run_init(&root),
        Commands::Hooks(cmd) => run_hooks(&root, &cmd),
        Commands::Watch => run_watch(&root),
        Commands::Validate => run_validate(&root),
        Commands::Status => run_status(&root),
    }
}

fn load_config(dir: &UmsDir) -> Result<BridgeConfig> {
    Ok(BridgeConfig::load(&dir.config_path()).map_err(ums_bridge::error::BridgeError::from)?)
}

fn run_init(root: &std::path::Path) -> Result<()> {
    let dir = UmsDir::new(root);
    dir.ensure_layout()?;
    let config_path = dir.config_path();
    if config_path.exists() {
        println!("{} already exists, keeping it", config_path.display());
    } else {
        std::fs::write(&config_path, BridgeConfig::default_toml())?;
        println!("wrote {}", config_path.display());
    }
    println!("created {} layout", dir.root().display());
    println!("next: umsb hooks install && umsb watch");
    Ok(())
}

fn run_hooks(root: &std::path::Path, cmd: &HooksCommand) -> Result<()> {
    let dir = UmsDir::new(root);
    let config = load_config(&dir)?;
    let installer = HookInstaller::new(root, &config)?;

    match cmd {
        HooksCommand::Install => {
            let paths = installer.install_all()?;
            for path in paths {
                println!("installed {}", path.display());
            }
        }
        HooksCommand::Status => {
            for kind in HookKind::ALL {
                let mark = if installer.is_installed(kind) {
                    "installed"
                } else {
                    "missing"
                };
                println!("{kind:<14} {mark}");
            }
        }
        HooksCommand::Uninstall => {
            let removed = installer.uninstall_all()?;
            if removed.is_empty() {
                println!("nothing to remove");
            }
            for kind in removed {
                println!("removed {kind}");
            }
        }
    }
    Ok(())
}

fn run_watch(root: &std::path::Path) -> Result<()> {
    let dir = UmsDir::new(root);
    dir.ensure_layout()?;
    let config = load_config(&dir)?;

    let ums = Ums::builder(root)
        .include(config.model.include.clone())
        .build()?
        .into_shared();
    {
        let ums = ums.lock().unwrap_or_else(PoisonError::into_inner);
        println!(
            "loaded {} model resource(s) from {}",
            ums.resource_count(),
            root.display()
        );
    }

    let mut set = WatcherSet::new(std::sync::Arc::clone(&ums), root, &dir, &config);
    set.start_all();
    println!(
        "watching {} every {}ms — Ctrl-C to stop",
        dir.root().display(),
        config.watch.poll_interval_ms
    );

    wait_for_shutdown()?;

    println!("stopping watchers...");
    set.stop_all();
    ums.lock().unwrap_or_else(PoisonError::into_inner).dispose();
    Ok(())
}

#[cfg(unix)]
fn wait_for_shutdown() -> Result<()> {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&term))
        .context("register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term))
        .context("register SIGTERM handler")?;
    while !term.load(Ordering::Relaxed) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown() -> Result<()> {
    // No signal flags here; the process runs until killed.
    loop {
        std::thread::sleep(std::time::Duration::from_secs(3600));
    }
}

fn run_validate(root: &std::path::Path) -> Result<()> {
    let dir = UmsDir::new(root);
    let config = load_config(&dir)?;
    let ums = Ums::builder(root)
        .include(config.model.include.clone())
        .build()?;
    let outcome = ums.validate()?;
    print!("{outcome}");
    if !outcome.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_status(root: &std::path::Path) -> Result<()> {
    let dir = UmsDir::new(root);

    println!("pending triggers:");
    let mut any = false;
    for kind in TriggerKind::ALL {
        if dir.trigger_path(kind).exists() {
            println!("  {}", kind.file_name());
            any = true;
        }
    }
    if !any {
        println!("  (none)");
    }

    let results = dir.results().list()?;
    let merge_results = dir.merge_results().list()?;
    println!(
        "results awaiting pickup: {} validation, {} merge",
        results.len(),
        merge_results.len()
    );

    println!("audit records:");
    println!("  changelogs: {}", count_files(&dir.changelogs_dir()));
    println!("  merges:     {}", count_files(&dir.merges_dir()));
    Ok(())
}

fn count_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(std::result::Result::ok).count())
        .unwrap_or(0)
}
