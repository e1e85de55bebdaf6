// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness checking: one background probe per SCU worker.
//!
//! The checker is observational. Workers attempt sends regardless of
//! status and let the association fail; the status exists for operators
//! and for future admission decisions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use dlb_core::{LivenessCell, LivenessStatus, WorkerId};
use dlb_dimse::EchoScu;

/// How a destination is probed. Implementations block; the checker runs
/// them on the blocking pool.
pub trait LivenessStrategy: Send + Sync + 'static {
    fn check(&self) -> LivenessStatus;
}

/// C-ECHO probe: `Live` on a successful round-trip, `HardFail` otherwise.
/// `SoftFail` is reserved for strategies that can tell transient failures
/// apart.
pub struct DicomEchoStrategy {
    scu: EchoScu,
}

impl DicomEchoStrategy {
    pub fn new(scu: EchoScu) -> Self {
        Self { scu }
    }
}

impl LivenessStrategy for DicomEchoStrategy {
    fn check(&self) -> LivenessStatus {
        match self.scu.ping() {
            Ok(()) => LivenessStatus::Live,
            Err(e) => {
                debug!("echo failed: {}", e);
                LivenessStatus::HardFail
            }
        }
    }
}

/// The checker task shadowing one worker.
pub struct LivenessChecker {
    worker_id: WorkerId,
    strategy: Arc<dyn LivenessStrategy>,
    cell: Arc<LivenessCell>,
    interval: Duration,
    cancel: CancellationToken,
}

impl LivenessChecker {
    pub fn new(
        worker_id: WorkerId,
        strategy: Arc<dyn LivenessStrategy>,
        cell: Arc<LivenessCell>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self { worker_id, strategy, cell, interval, cancel }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        info!(
            worker = %self.worker_id,
            interval_secs = self.interval.as_secs(),
            "starting liveness checker"
        );
        loop {
            let strategy = Arc::clone(&self.strategy);
            let status = match tokio::task::spawn_blocking(move || strategy.check()).await {
                Ok(status) => status,
                Err(_) => LivenessStatus::Unknown,
            };
            let previous = self.cell.set(status);
            if previous != status {
                info!(worker = %self.worker_id, from = %previous, to = %status, "liveness changed");
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!(worker = %self.worker_id, "liveness checker stopped");
    }
}

#[cfg(test)]
#[path = "liveness_tests.rs"]
mod tests;
