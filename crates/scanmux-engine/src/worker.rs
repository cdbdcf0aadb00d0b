//! Commit worker.
//!
//! Non-blocking commits hand their hardware phase to a dedicated thread so
//! the caller can start building the next transaction immediately. Jobs
//! carry the gate guard with them, which keeps commits strictly ordered:
//! the next commit cannot pass its swap until the worker finishes this one.

use crate::commit;
use crate::device::{DeviceInner, GateGuard};
use crate::transaction::Transaction;
use crossbeam_channel::{unbounded, Sender};
use scanmux_core::Result;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// A swapped transaction waiting for its hardware phase.
pub(crate) struct PendingCommit {
    pub(crate) tx: Transaction,
    pub(crate) guard: GateGuard,
}

pub(crate) struct CommitWorker {
    sender: Option<Sender<PendingCommit>>,
    handle: Option<JoinHandle<()>>,
}

impl CommitWorker {
    pub(crate) fn spawn(inner: Arc<DeviceInner>) -> Result<Self> {
        let (sender, receiver) = unbounded::<PendingCommit>();
        let handle = thread::Builder::new()
            .name("scanmux-commit".into())
            .spawn(move || {
                while let Ok(pending) = receiver.recv() {
                    commit::complete_commit(&inner, pending.tx, pending.guard);
                }
                debug!("commit worker stopped");
            })?;
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a commit for the worker; hands the job back if the worker is
    /// shutting down.
    pub(crate) fn submit(&self, pending: PendingCommit) -> std::result::Result<(), PendingCommit> {
        match &self.sender {
            Some(sender) => sender.send(pending).map_err(|err| err.0),
            None => Err(pending),
        }
    }
}

impl Drop for CommitWorker {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain queued commits and exit;
        // the join makes teardown wait for the last hardware phase.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
