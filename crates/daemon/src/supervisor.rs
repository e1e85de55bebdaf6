// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor: builds the pipeline graph from configuration and drives
//! startup and shutdown.
//!
//! Construction is bottom-up, starting at the workers and ending at the
//! listeners, so every component receives its collaborators by reference
//! and nothing is process-global.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use dlb_core::{
    hash_fn, Configuration, LivenessCell, SystemClock, WorkerId, WorkerKind, WorkerSetId,
};
use dlb_dimse::{EchoScu, StoreScu, StoreScuConfig};

use crate::listener::ScpListener;
use crate::liveness::{DicomEchoStrategy, LivenessChecker};
use crate::router::{Router, RouterHandle};
use crate::worker::{
    DimseStoreSender, LocalStorageError, LocalStorageWorker, ScuWorker, WorkerHandle,
};
use crate::workerset::WorkerSet;

/// AE title this process presents on outbound associations.
const CALLING_AE_TITLE: &str = "DLB";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("worker set {set} references unknown worker {worker}")]
    UnknownWorker { set: WorkerSetId, worker: WorkerId },

    #[error("worker set {set}: unknown hash method {method}")]
    UnknownHashMethod { set: WorkerSetId, method: String },

    #[error(transparent)]
    LocalStorage(#[from] LocalStorageError),

    #[error("no scp listener could bind")]
    NoListeners,
}

/// Per-phase cancellation tokens; shutdown cancels them in pipeline order.
#[derive(Debug)]
struct Phases {
    listeners: CancellationToken,
    routers: CancellationToken,
    workers: CancellationToken,
    checkers: CancellationToken,
}

impl Phases {
    fn new() -> Self {
        Self {
            listeners: CancellationToken::new(),
            routers: CancellationToken::new(),
            workers: CancellationToken::new(),
            checkers: CancellationToken::new(),
        }
    }
}

/// The running pipeline.
#[derive(Debug)]
pub struct Supervisor {
    routers: Vec<RouterHandle>,
    listener_tasks: Vec<JoinHandle<()>>,
    router_tasks: Vec<JoinHandle<()>>,
    worker_tasks: Vec<JoinHandle<()>>,
    checker_tasks: Vec<JoinHandle<()>>,
    phases: Phases,
    grace: Duration,
}

impl Supervisor {
    /// Build and start every component of the pipeline.
    pub async fn start(config: &Configuration) -> Result<Self, BuildError> {
        let phases = Phases::new();
        let capacity = config.core.queue_capacity;
        let grace = config.core.shutdown_grace;

        // 1. Workers; SCU workers also get a liveness checker.
        let mut handles: HashMap<WorkerId, WorkerHandle> = HashMap::new();
        let mut worker_tasks = Vec::new();
        let mut checker_tasks = Vec::new();
        for worker in &config.workers {
            let liveness = Arc::new(LivenessCell::new());
            let (handle, task) = match &worker.kind {
                WorkerKind::Scu { ae_title, address, port } => {
                    let scu = StoreScu::new(StoreScuConfig {
                        calling_ae_title: CALLING_AE_TITLE.to_string(),
                        called_ae_title: ae_title.clone(),
                        address: address.clone(),
                        port: *port,
                    });
                    let sender = DimseStoreSender::new(worker.id.clone(), scu);
                    let checker = LivenessChecker::new(
                        worker.id.clone(),
                        Arc::new(DicomEchoStrategy::new(EchoScu {
                            calling_ae_title: CALLING_AE_TITLE.to_string(),
                            called_ae_title: ae_title.clone(),
                            address: address.clone(),
                            port: *port,
                        })),
                        Arc::clone(&liveness),
                        config.core.liveness_check_interval,
                        phases.checkers.clone(),
                    );
                    checker_tasks.push(checker.spawn());
                    ScuWorker::spawn(
                        worker.id.clone(),
                        sender,
                        SystemClock,
                        liveness,
                        capacity,
                        grace,
                        phases.workers.clone(),
                    )
                }
                WorkerKind::LocalStorage { output_dir_path } => LocalStorageWorker::spawn(
                    worker.id.clone(),
                    output_dir_path,
                    liveness,
                    capacity,
                    phases.workers.clone(),
                )?,
            };
            worker_tasks.push(task);
            handles.insert(worker.id.clone(), handle);
        }

        // 2. Worker sets, in configuration order.
        let mut worker_sets = Vec::new();
        for set in &config.worker_sets {
            let hash = hash_fn(&set.hash_method).ok_or_else(|| BuildError::UnknownHashMethod {
                set: set.id.clone(),
                method: set.hash_method.clone(),
            })?;
            let members = set
                .worker_ids
                .iter()
                .map(|id| {
                    handles.get(id).cloned().ok_or_else(|| BuildError::UnknownWorker {
                        set: set.id.clone(),
                        worker: id.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            worker_sets.push(WorkerSet::new(set, members, hash));
        }
        let worker_sets = Arc::new(worker_sets);

        // 3. Routers; each consumes its own queue over the same set list.
        let mut routers = Vec::new();
        let mut router_tasks = Vec::new();
        for index in 0..config.core.router_count {
            let (handle, task) =
                Router::spawn(index, Arc::clone(&worker_sets), capacity, phases.routers.clone());
            routers.push(handle);
            router_tasks.push(task);
        }

        // 4. Listeners. A bind failure is fatal for that listener only;
        // startup fails when every configured listener is unusable.
        let mut listener_tasks = Vec::new();
        for scp in &config.scps {
            match ScpListener::bind(
                scp.clone(),
                routers.clone(),
                config.core.refuse_on_overload,
                phases.listeners.clone(),
            )
            .await
            {
                Ok(listener) => listener_tasks.push(listener.spawn()),
                Err(e) => error!("{}", e),
            }
        }
        if listener_tasks.is_empty() && !config.scps.is_empty() {
            return Err(BuildError::NoListeners);
        }

        info!(
            workers = worker_tasks.len(),
            worker_sets = worker_sets.len(),
            routers = routers.len(),
            listeners = listener_tasks.len(),
            "pipeline started"
        );
        Ok(Self {
            routers,
            listener_tasks,
            router_tasks,
            worker_tasks,
            checker_tasks,
            phases,
            grace,
        })
    }

    /// The router pool, in round-robin order.
    pub fn routers(&self) -> &[RouterHandle] {
        &self.routers
    }

    /// Stop the pipeline stage by stage: listeners first so nothing new
    /// enters, then routers, then workers (which drain their buffers within
    /// the grace period), then checkers.
    pub async fn shutdown(self) {
        info!("shutting down pipeline");

        self.phases.listeners.cancel();
        join_all(self.listener_tasks).await;

        self.phases.routers.cancel();
        join_all(self.router_tasks).await;

        self.phases.workers.cancel();
        let worker_join = join_all(self.worker_tasks);
        if tokio::time::timeout(self.grace + Duration::from_secs(5), worker_join).await.is_err() {
            warn!("workers did not stop within the grace period");
        }

        self.phases.checkers.cancel();
        join_all(self.checker_tasks).await;

        info!("pipeline shutdown complete");
    }
}

async fn join_all(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        if let Err(e) = task.await {
            warn!("task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
