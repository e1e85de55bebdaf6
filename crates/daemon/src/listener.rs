// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingress: one DICOM listener per configured SCP.
//!
//! The accept loop is async; each accepted connection is converted back to
//! a blocking stream and handled on the blocking pool, because the DICOM
//! upper layer does blocking reads and writes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use dlb_core::{ScpConfig, ScpId};
use dlb_dimse::command::{STATUS_OUT_OF_RESOURCES, STATUS_SUCCESS};
use dlb_dimse::{handle_association, DefaultDicomObject, Routable, StoreHandler};

use crate::router::RouterHandle;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("scp {id} failed to bind {address}:{port}: {source}")]
    Bind {
        id: ScpId,
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// A bound SCP listener, ready to serve.
pub struct ScpListener {
    config: ScpConfig,
    listener: TcpListener,
    dispatcher: Arc<StoreDispatcher>,
    cancel: CancellationToken,
}

impl ScpListener {
    /// Bind the configured endpoint. A failure here is fatal to this
    /// listener only; the caller decides whether the process survives.
    pub async fn bind(
        config: ScpConfig,
        routers: Vec<RouterHandle>,
        refuse_on_overload: bool,
        cancel: CancellationToken,
    ) -> Result<Self, ListenerError> {
        let listener =
            TcpListener::bind((config.address.as_str(), config.port)).await.map_err(|source| {
                ListenerError::Bind {
                    id: config.id.clone(),
                    address: config.address.clone(),
                    port: config.port,
                    source,
                }
            })?;
        info!(
            scp = %config.id,
            ae_title = %config.ae_title,
            endpoint = %format!("{}:{}", config.address, config.port),
            "scp listening"
        );
        let dispatcher = Arc::new(StoreDispatcher {
            scp_id: config.id.clone(),
            routers,
            next: AtomicUsize::new(0),
            refuse_on_overload,
        });
        Ok(Self { config, listener, dispatcher, cancel })
    }

    /// Spawn the accept loop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(scp = %self.config.id, peer = %peer, "accepted connection");
                            self.handle_connection(stream);
                        }
                        Err(e) => error!(scp = %self.config.id, "accept error: {}", e),
                    }
                }
            }
        }
        info!(scp = %self.config.id, "scp listener stopped");
    }

    /// Hand one connection to the blocking pool.
    fn handle_connection(&self, stream: tokio::net::TcpStream) {
        let std_stream = match stream.into_std() {
            Ok(stream) => stream,
            Err(e) => {
                warn!(scp = %self.config.id, "failed to detach stream: {}", e);
                return;
            }
        };
        let dispatcher = Arc::clone(&self.dispatcher);
        let ae_title = self.config.ae_title.clone();
        let scp_id = self.config.id.clone();
        tokio::task::spawn_blocking(move || {
            // The upper layer does blocking I/O on this stream.
            if let Err(e) = std_stream.set_nonblocking(false) {
                warn!(scp = %scp_id, "failed to restore blocking mode: {}", e);
                return;
            }
            if let Err(e) = handle_association(std_stream, &ae_title, dispatcher.as_ref()) {
                warn!(scp = %scp_id, "association failed: {}", e);
            }
        });
    }
}

/// Fans received instances out over the router pool, round-robin.
struct StoreDispatcher {
    scp_id: ScpId,
    routers: Vec<RouterHandle>,
    next: AtomicUsize,
    refuse_on_overload: bool,
}

impl StoreDispatcher {
    fn next_router(&self) -> &RouterHandle {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.routers.len();
        &self.routers[index]
    }
}

impl StoreHandler for StoreDispatcher {
    fn on_store(&self, dataset: DefaultDicomObject) -> u16 {
        let routable = Routable::new(self.scp_id.clone(), dataset);
        let router = self.next_router();
        trace!(scp = %self.scp_id, router = router.id(), "handing instance to router");
        let accepted = router.dispatch(routable);
        if !accepted && self.refuse_on_overload {
            STATUS_OUT_OF_RESOURCES
        } else {
            // The store is acknowledged once it crossed the SCP boundary;
            // internal drops stay internal unless refusal is configured.
            STATUS_SUCCESS
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
