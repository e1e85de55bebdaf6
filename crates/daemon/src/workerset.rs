// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker set: admission filter plus deterministic dispatcher.
//!
//! Admission checks the ingress SCP filter first, then every header
//! requirement in configuration order, short-circuiting on the first
//! rejection. Dispatch places the routable on a member worker: by Patient
//! ID hash (the affinity-preserving default) or by rotation.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use dlb_core::{
    Distribution, HashFn, HeaderRequirement, RequirementKind, ScpId, WorkerSetConfig, WorkerSetId,
};
use dlb_dimse::Routable;

use crate::worker::WorkerHandle;

pub struct WorkerSet {
    id: WorkerSetId,
    accepted_scp_ids: Vec<ScpId>,
    header_requirements: Vec<HeaderRequirement>,
    distribution: Distribution,
    hash: HashFn,
    workers: Vec<WorkerHandle>,
    next: AtomicUsize,
}

impl WorkerSet {
    /// Wire a configured set to its member workers. The members arrive in
    /// `worker-ids` order; the hash function was resolved by the caller.
    pub fn new(config: &WorkerSetConfig, workers: Vec<WorkerHandle>, hash: HashFn) -> Self {
        debug!(worker_set = %config.id, members = workers.len(), "creating worker set");
        Self {
            id: config.id.clone(),
            accepted_scp_ids: config.accepted_scp_ids.clone(),
            header_requirements: config.header_requirements.clone(),
            distribution: config.distribution,
            hash,
            workers,
            next: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> &WorkerSetId {
        &self.id
    }

    /// Whether this set admits the routable.
    pub fn can_accept(&self, routable: &Routable) -> bool {
        // An empty SCP filter accepts from any SCP.
        if !self.accepted_scp_ids.is_empty()
            && !self.accepted_scp_ids.contains(routable.scp_id())
        {
            return false;
        }
        self.header_requirements.iter().all(|requirement| self.evaluate(requirement, routable))
    }

    fn evaluate(&self, requirement: &HeaderRequirement, routable: &Routable) -> bool {
        match &requirement.kind {
            RequirementKind::Present => routable.has_tag(requirement.tag),
            RequirementKind::Absent => !routable.has_tag(requirement.tag),
            RequirementKind::RegexpMatch(regex) => match routable.tag_string(requirement.tag) {
                // Match-at-start semantics; patterns needing a full-string
                // match must anchor with `$` themselves.
                Some(value) => regex.find(&value).is_some_and(|m| m.start() == 0),
                None => false,
            },
            RequirementKind::Unknown(kind) => {
                warn!(worker_set = %self.id, requirement = %kind, "unknown header requirement, rejecting");
                false
            }
        }
    }

    /// Place an admitted routable on a member worker.
    pub fn consume(&self, routable: Routable) {
        let index = match self.distribution {
            Distribution::Hash => {
                // All instances for one patient must land on the same worker.
                let Some(patient_id) = routable.patient_id() else {
                    warn!(worker_set = %self.id, "dropping instance without patient id");
                    return;
                };
                match (self.hash)(&patient_id, self.workers.len()) {
                    Ok(index) => index,
                    Err(e) => {
                        warn!(worker_set = %self.id, "dropping instance, hash failed: {}", e);
                        return;
                    }
                }
            }
            Distribution::RoundRobin => {
                self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len()
            }
        };
        let worker = &self.workers[index];
        debug!(worker_set = %self.id, worker = %worker.id(), index, "dispatching instance");
        worker.enqueue(routable);
    }
}

#[cfg(test)]
#[path = "workerset_tests.rs"]
mod tests;
