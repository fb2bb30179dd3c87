//! Background watchers — the consumer half of the handshake.
//!
//! One watcher per trigger type. All four share the same loop (poll the
//! singleton path, accept, dispatch) and differ only in their handler, so
//! the loop is generic over [`WatcherTask`] and the handlers are plain
//! structs instantiated per trigger type.
//!
//! # Lifecycle
//!
//! `Stopped → Running → Stopped`. [`Watcher::start`] is idempotent while
//! running; [`Watcher::stop`] signals the loop, joins the thread, and is
//! idempotent too. The stop signal is an mpsc channel observed with
//! `recv_timeout`, which doubles as the inter-poll sleep: the thread exits
//! within one poll interval plus the completion time of an in-flight
//! handler. A tick that already accepted a trigger always runs its handler
//! to completion before the loop can observe the stop signal, so no trigger
//! is left half-accepted.
//!
//! # Error discipline
//!
//! Nothing escapes the loop. A malformed trigger is consumed and logged; a
//! handler error is logged and the loop keeps polling. One bad trigger must
//! not kill the watcher.

mod merge;
mod post_commit;
mod reload;
mod validation;

pub use merge::MergeHandler;
pub use post_commit::PostCommitHandler;
pub use reload::ReloadHandler;
pub use validation::ValidationHandler;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::BridgeError;
use crate::protocol::{TriggerKind, TriggerRecord, UmsDir};

// ---------------------------------------------------------------------------
// WatcherTask
// ---------------------------------------------------------------------------

/// A handler for one trigger type.
pub trait WatcherTask: Send + 'static {
    /// Short name for logs and the thread name.
    fn name(&self) -> &'static str;

    /// The trigger this watcher consumes.
    fn kind(&self) -> TriggerKind;

    /// Handle one accepted trigger.
    ///
    /// # Errors
    /// Errors are logged by the loop and never propagate further.
    fn handle(&mut self, record: TriggerRecord) -> Result<(), BridgeError>;
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

/// Lifecycle state of a [`Watcher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherState {
    /// No background thread.
    Stopped,
    /// Polling thread alive.
    Running,
}

/// A long-lived polling task bound to one trigger path.
pub struct Watcher<T: WatcherTask> {
    name: &'static str,
    kind: TriggerKind,
    dir: UmsDir,
    task: Arc<Mutex<T>>,
    poll_interval: Duration,
    running: Option<Running>,
}

struct Running {
    stop_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl<T: WatcherTask> Watcher<T> {
    /// A stopped watcher over `dir` for `task`.
    #[must_use]
    pub fn new(dir: UmsDir, task: T, poll_interval: Duration) -> Self {
        let name = task.name();
        let kind = task.kind();
        Self {
            name,
            kind,
            dir,
            task: Arc::new(Mutex::new(task)),
            poll_interval,
            running: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> WatcherState {
        if self.running.is_some() {
            WatcherState::Running
        } else {
            WatcherState::Stopped
        }
    }

    /// Start the polling thread. A no-op while already running.
    ///
    /// The first tick runs immediately, so a trigger written while the
    /// watcher was stopped is consumed on start rather than one interval
    /// later.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let name = self.name;
        let kind = self.kind;
        let dir = self.dir.clone();
        let task = Arc::clone(&self.task);
        let poll_interval = self.poll_interval;

        let handle = thread::spawn(move || {
            debug!(watcher = name, "watcher started");
            loop {
                tick(&dir, kind, &task, name);
                match stop_rx.recv_timeout(poll_interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
            debug!(watcher = name, "watcher stopped");
        });

        self.running = Some(Running { stop_tx, handle });
    }

    /// Stop the polling thread and join it. A no-op while stopped.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        // A dead receiver means the thread is already on its way out.
        let _ = running.stop_tx.send(());
        if running.handle.join().is_err() {
            error!(watcher = self.name, "watcher thread panicked");
        }
    }
}

impl<T: WatcherTask> Drop for Watcher<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// WatcherSet
// ---------------------------------------------------------------------------

/// The four watchers of one coordinating process, wired to one shared store
/// and one `.ums/` directory.
pub struct WatcherSet {
    validation: Watcher<ValidationHandler>,
    reload: Watcher<ReloadHandler>,
    post_commit: Watcher<PostCommitHandler>,
    merge: Watcher<MergeHandler>,
}

impl WatcherSet {
    /// Build all four watchers (stopped).
    #[must_use]
    pub fn new(
        ums: crate::store::SharedUms,
        repo_root: &std::path::Path,
        dir: &UmsDir,
        config: &crate::config::BridgeConfig,
    ) -> Self {
        let poll = config.watch.poll_interval();
        let include = config.model.include.clone();
        Self {
            validation: Watcher::new(
                dir.clone(),
                ValidationHandler::new(
                    Arc::clone(&ums),
                    repo_root.to_owned(),
                    dir,
                    include.clone(),
                ),
                poll,
            ),
            reload: Watcher::new(dir.clone(), ReloadHandler::new(Arc::clone(&ums)), poll),
            post_commit: Watcher::new(
                dir.clone(),
                PostCommitHandler::new(repo_root.to_owned(), dir, include),
                poll,
            ),
            merge: Watcher::new(dir.clone(), MergeHandler::new(ums, dir), poll),
        }
    }

    /// Start every watcher. Idempotent.
    pub fn start_all(&mut self) {
        self.validation.start();
        self.reload.start();
        self.post_commit.start();
        self.merge.start();
    }

    /// Stop and join every watcher. Idempotent.
    pub fn stop_all(&mut self) {
        self.validation.stop();
        self.reload.stop();
        self.post_commit.stop();
        self.merge.stop();
    }

    /// Whether every watcher is running.
    #[must_use]
    pub const fn all_running(&self) -> bool {
        matches!(self.validation.state(), WatcherState::Running)
            && matches!(self.reload.state(), WatcherState::Running)
            && matches!(self.post_commit.state(), WatcherState::Running)
            && matches!(self.merge.state(), WatcherState::Running)
    }
}

/// One poll: accept the pending trigger, if any, and dispatch it.
fn tick<T: WatcherTask>(dir: &UmsDir, kind: TriggerKind, task: &Arc<Mutex<T>>, name: &str) {
    let record = match dir.check_and_clear(kind) {
        Ok(None) => return,
        Ok(Some(record)) => record,
        Err(e) => {
            // Consumed either way; a bad trigger must not wedge the path.
            warn!(watcher = name, error = %e, "discarded unusable trigger");
            return;
        }
    };
    debug!(watcher = name, "trigger accepted");
    let mut task = task.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = task.handle(record) {
        error!(watcher = name, error = %e, "trigger handler failed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
