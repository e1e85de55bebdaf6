// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Destination workers.
//!
//! Both kinds share the same contract, a bounded ingress queue fed by
//! worker sets. They differ in what happens to a dequeued routable: the
//! SCU kind streams it to a DICOM peer, the local-storage kind writes it
//! to disk.

mod local;
mod scu;

pub use local::{LocalStorageError, LocalStorageWorker};
pub use scu::{DimseStoreSender, ScuWorker, StoreSender};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use dlb_core::{LivenessCell, LivenessStatus, WorkerId};
use dlb_dimse::Routable;

/// Handle to a running worker: its ingress queue plus the liveness cell its
/// checker writes.
#[derive(Clone, Debug)]
pub struct WorkerHandle {
    id: WorkerId,
    tx: mpsc::Sender<Routable>,
    liveness: Arc<LivenessCell>,
}

impl WorkerHandle {
    pub(crate) fn new(id: WorkerId, tx: mpsc::Sender<Routable>, liveness: Arc<LivenessCell>) -> Self {
        Self { id, tx, liveness }
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Last status observed by this worker's liveness checker. Local-storage
    /// workers have no checker and stay `Unknown`.
    pub fn liveness(&self) -> LivenessStatus {
        self.liveness.get()
    }

    /// Non-blocking offer into the worker's queue. A full queue is a drop,
    /// reported by the return value and a warning.
    pub fn enqueue(&self, routable: Routable) -> bool {
        match self.tx.try_send(routable) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(worker = %self.id, "worker queue full, dropping instance");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(worker = %self.id, "worker queue closed, dropping instance");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
