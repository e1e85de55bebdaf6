// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-storage worker: writes each instance to a configured directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dlb_core::{LivenessCell, WorkerId};
use dlb_dimse::Routable;

use super::WorkerHandle;

#[derive(Debug, Error)]
pub enum LocalStorageError {
    #[error("local-storage worker {id} output directory {path} does not exist")]
    MissingDirectory { id: WorkerId, path: PathBuf },
}

/// The local-storage worker task.
pub struct LocalStorageWorker {
    id: WorkerId,
    rx: mpsc::Receiver<Routable>,
    output_dir: PathBuf,
    cancel: CancellationToken,
}

impl LocalStorageWorker {
    /// Spawn the worker task; returns its queue handle.
    ///
    /// `%id%` in the configured path is replaced with the worker id. The
    /// resolved directory must already exist.
    pub fn spawn(
        id: WorkerId,
        output_dir_path: &Path,
        liveness: Arc<LivenessCell>,
        capacity: usize,
        cancel: CancellationToken,
    ) -> Result<(WorkerHandle, JoinHandle<()>), LocalStorageError> {
        let output_dir = resolve_output_dir(&id, output_dir_path);
        if !output_dir.is_dir() {
            return Err(LocalStorageError::MissingDirectory { id, path: output_dir });
        }

        let (tx, rx) = mpsc::channel(capacity);
        let handle = WorkerHandle::new(id.clone(), tx, liveness);
        let worker = Self { id, rx, output_dir, cancel };
        Ok((handle, tokio::spawn(worker.run())))
    }

    async fn run(mut self) {
        info!(worker = %self.id, dir = %self.output_dir.display(), "starting local storage worker");
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.rx.recv() => {
                    let Some(routable) = received else { break };
                    let id = self.id.clone();
                    let dir = self.output_dir.clone();
                    let _ = tokio::task::spawn_blocking(move || write_routable(&id, &dir, &routable))
                        .await;
                }
            }
        }
        info!(worker = %self.id, "local storage worker stopped");
    }
}

/// Substitute the worker id for every `%id%` in the configured path.
fn resolve_output_dir(id: &WorkerId, path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().replace("%id%", id.as_str()))
}

/// Write one instance as `{sop_instance_uid}.dcm`. An existing file is
/// skipped; write errors drop the instance.
fn write_routable(id: &WorkerId, output_dir: &Path, routable: &Routable) {
    let Some(sop_instance_uid) = routable.sop_instance_uid() else {
        warn!(worker = %id, "dropping instance without sop instance uid");
        return;
    };
    let path = output_dir.join(format!("{sop_instance_uid}.dcm"));
    if path.is_file() {
        debug!(worker = %id, %sop_instance_uid, "instance already stored, skipping");
        return;
    }
    match routable.dataset().write_to_file(&path) {
        Ok(()) => debug!(worker = %id, path = %path.display(), "instance stored"),
        Err(e) => {
            warn!(worker = %id, path = %path.display(), "failed to write instance: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
