// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SCU worker: buffers instances and streams them to a DICOM peer.
//!
//! Send attempts are rate-limited by a cool-down so a flapping peer does
//! not cause a tight reconnect loop. The buffer drains front-first; a
//! failed instance returns to the front with the rest of the batch behind
//! it in order, so retry order stays FIFO.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dlb_core::{Clock, LivenessCell, WorkerId};
use dlb_dimse::{Routable, StoreScu};

use super::WorkerHandle;

/// How long to wait for new work before re-checking the buffer.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);
/// Minimum pause between send attempts against the peer.
const SEND_COOLDOWN: Duration = Duration::from_secs(3);

/// Sends a batch downstream, front-first.
///
/// Returns the routables that were NOT sent: on failure the failed
/// routable leads, with the remainder of the batch behind it in order. An
/// association failure returns the whole batch.
#[async_trait]
pub trait StoreSender: Send + Sync + 'static {
    async fn send_batch(&self, batch: Vec<Routable>) -> Vec<Routable>;
}

/// Production sender: one blocking association per batch.
pub struct DimseStoreSender {
    worker_id: WorkerId,
    scu: StoreScu,
}

impl DimseStoreSender {
    pub fn new(worker_id: WorkerId, scu: StoreScu) -> Self {
        Self { worker_id, scu }
    }
}

#[async_trait]
impl StoreSender for DimseStoreSender {
    async fn send_batch(&self, batch: Vec<Routable>) -> Vec<Routable> {
        let worker_id = self.worker_id.clone();
        let scu = self.scu.clone();
        match tokio::task::spawn_blocking(move || send_batch_blocking(&worker_id, &scu, batch))
            .await
        {
            Ok(unsent) => unsent,
            Err(e) => {
                warn!(worker = %self.worker_id, "send task failed: {}", e);
                Vec::new()
            }
        }
    }
}

fn send_batch_blocking(
    worker_id: &WorkerId,
    scu: &StoreScu,
    batch: Vec<Routable>,
) -> Vec<Routable> {
    let mut session = match scu.open() {
        Ok(session) => session,
        Err(e) => {
            warn!(worker = %worker_id, "failed to establish association: {}", e);
            return batch;
        }
    };

    let mut sent = 0usize;
    let mut iter = batch.into_iter();
    loop {
        let Some(routable) = iter.next() else { break };
        match session.store(routable.dataset()) {
            Ok(()) => sent += 1,
            Err(e) => {
                warn!(worker = %worker_id, sent, "failed to send instance: {}", e);
                let mut unsent = vec![routable];
                unsent.extend(iter);
                session.abort();
                return unsent;
            }
        }
    }

    if let Err(e) = session.release() {
        debug!(worker = %worker_id, "failed to release association: {}", e);
    }
    debug!(worker = %worker_id, sent, "send buffer drained");
    Vec::new()
}

/// The SCU worker task.
pub struct ScuWorker<S, C> {
    id: WorkerId,
    rx: mpsc::Receiver<Routable>,
    buffer: VecDeque<Routable>,
    sender: S,
    clock: C,
    last_send: Option<std::time::Instant>,
    grace: Duration,
    cancel: CancellationToken,
}

impl<S: StoreSender, C: Clock> ScuWorker<S, C> {
    /// Spawn the worker task; returns its queue handle.
    pub fn spawn(
        id: WorkerId,
        sender: S,
        clock: C,
        liveness: Arc<LivenessCell>,
        capacity: usize,
        grace: Duration,
        cancel: CancellationToken,
    ) -> (WorkerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = WorkerHandle::new(id.clone(), tx, liveness);
        let worker = Self {
            id,
            rx,
            buffer: VecDeque::new(),
            sender,
            clock,
            last_send: None,
            grace,
            cancel,
        };
        (handle, tokio::spawn(worker.run()))
    }

    async fn run(mut self) {
        info!(worker = %self.id, "starting scu worker");
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = tokio::time::timeout(RECV_TIMEOUT, self.rx.recv()) => {
                    match received {
                        Ok(Some(routable)) => self.buffer.push_back(routable),
                        // All queue handles dropped.
                        Ok(None) => break,
                        // Timed out: fall through and give the buffer a chance.
                        Err(_) => {}
                    }
                }
            }
            self.flush_if_due().await;
        }
        self.drain_on_shutdown().await;
        info!(worker = %self.id, "scu worker stopped");
    }

    /// Attempt a batch when the buffer is non-empty and the cool-down since
    /// the last attempt has passed.
    async fn flush_if_due(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if let Some(last) = self.last_send {
            if self.clock.now().duration_since(last) < SEND_COOLDOWN {
                return;
            }
        }
        let batch: Vec<Routable> = self.buffer.drain(..).collect();
        let unsent = self.sender.send_batch(batch).await;
        self.buffer = unsent.into();
        self.last_send = Some(self.clock.now());
    }

    /// One final best-effort batch, bounded by the shutdown grace period.
    /// Whatever remains unsent is lost; there is no persistence.
    async fn drain_on_shutdown(&mut self) {
        while let Ok(routable) = self.rx.try_recv() {
            self.buffer.push_back(routable);
        }
        if self.buffer.is_empty() {
            return;
        }
        let batch: Vec<Routable> = self.buffer.drain(..).collect();
        let count = batch.len();
        match tokio::time::timeout(self.grace, self.sender.send_batch(batch)).await {
            Ok(unsent) if unsent.is_empty() => {
                info!(worker = %self.id, count, "drained send buffer at shutdown");
            }
            Ok(unsent) => {
                warn!(worker = %self.id, lost = unsent.len(), "instances lost at shutdown");
            }
            Err(_) => {
                warn!(worker = %self.id, lost = count, "shutdown grace expired, instances lost");
            }
        }
    }
}

#[cfg(test)]
#[path = "scu_tests.rs"]
mod tests;
