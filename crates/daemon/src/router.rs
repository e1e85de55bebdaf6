// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router: bounded-queue consumer that finds the first accepting worker set.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dlb_dimse::Routable;

use crate::workerset::WorkerSet;

/// Producer-side handle to a router's queue.
#[derive(Clone, Debug)]
pub struct RouterHandle {
    id: String,
    tx: mpsc::Sender<Routable>,
}

impl RouterHandle {
    pub(crate) fn new(id: String, tx: mpsc::Sender<Routable>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Non-blocking offer into the router's queue. A full queue is a drop,
    /// reported by the return value and a warning.
    pub fn dispatch(&self, routable: Routable) -> bool {
        match self.tx.try_send(routable) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(router = %self.id, "router queue full, dropping instance");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(router = %self.id, "router queue closed, dropping instance");
                false
            }
        }
    }
}

/// The router task. Every router sees the same worker sets, in
/// configuration order.
pub struct Router {
    id: String,
    rx: mpsc::Receiver<Routable>,
    worker_sets: Arc<Vec<WorkerSet>>,
    cancel: CancellationToken,
}

impl Router {
    /// Spawn a router task; returns its queue handle.
    pub fn spawn(
        index: usize,
        worker_sets: Arc<Vec<WorkerSet>>,
        capacity: usize,
        cancel: CancellationToken,
    ) -> (RouterHandle, JoinHandle<()>) {
        let id = format!("router-{index}");
        let (tx, rx) = mpsc::channel(capacity);
        let handle = RouterHandle::new(id.clone(), tx);
        let router = Self { id, rx, worker_sets, cancel };
        (handle, tokio::spawn(router.run()))
    }

    async fn run(mut self) {
        info!(router = %self.id, "starting router");
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.rx.recv() => {
                    let Some(routable) = received else { break };
                    self.route(routable);
                }
            }
        }
        info!(router = %self.id, "router stopped");
    }

    /// Hand the routable to the first worker set that admits it.
    fn route(&self, routable: Routable) {
        for worker_set in self.worker_sets.iter() {
            if worker_set.can_accept(&routable) {
                debug!(router = %self.id, worker_set = %worker_set.id(), "routing instance");
                worker_set.consume(routable);
                return;
            }
        }
        warn!(
            router = %self.id,
            scp = %routable.scp_id(),
            "no worker set accepts instance, dropping"
        );
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
