//! Post-checkout reload watcher.

use std::sync::PoisonError;

use tracing::info;

use crate::error::BridgeError;
use crate::protocol::{TriggerKind, TriggerRecord};
use crate::store::SharedUms;

use super::WatcherTask;

/// Handles [`TriggerRecord::Reload`]: re-reads the model resources from the
/// working tree after a branch switch.
///
/// Fire-and-forget: no result file is written; consumption of the trigger is
/// the only observable signal. Views handed out before the reload are stale
/// afterwards (see `crate::store`).
pub struct ReloadHandler {
    ums: SharedUms,
}

impl ReloadHandler {
    #[must_use]
    pub const fn new(ums: SharedUms) -> Self {
        Self { ums }
    }
}

impl WatcherTask for ReloadHandler {
    fn name(&self) -> &'static str {
        "reload"
    }

    fn kind(&self) -> TriggerKind {
        TriggerKind::Reload
    }

    fn handle(&mut self, record: TriggerRecord) -> Result<(), BridgeError> {
        let branch = record.branch().to_owned();
        let mut ums = self.ums.lock().unwrap_or_else(PoisonError::into_inner);
        ums.reload()?;
        info!(branch, generation = ums.generation(), "store reloaded");
        Ok(())
    }
}
