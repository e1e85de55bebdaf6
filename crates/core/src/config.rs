// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration model and loader.
//!
//! Configuration is JSON, read from a single file or from every file in a
//! directory (entries concatenated in directory-enumeration order). Each
//! document may carry any subset of the top-level keys `core`,
//! `worker-sets`, `scps`, and `workers`. Parsing is strict: schema
//! violations, duplicate ids, dangling references, and malformed tags or
//! regexps all abort startup.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::hash;
use crate::id::{ScpId, WorkerId, WorkerSetId};

const DEFAULT_QUEUE_CAPACITY: usize = 1024;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;
const DEFAULT_LIVENESS_INTERVAL_SECS: u64 = 10;

/// Configuration errors. All fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration path {0} does not exist")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no core section found in configuration")]
    MissingCore,

    #[error("router-count must be at least 1")]
    RouterCount,

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("scp {id} reuses endpoint {address}:{port}")]
    DuplicateEndpoint { id: String, address: String, port: u16 },

    #[error("{kind} {id}: port must be at least 1")]
    InvalidPort { kind: &'static str, id: String },

    #[error("worker {id}: unknown worker type {value}")]
    UnknownWorkerKind { id: String, value: String },

    #[error("scu worker {0} requires ae-title, address and port")]
    IncompleteScuWorker(String),

    #[error("local-storage worker {0} requires output-dir-path")]
    IncompleteLocalWorker(String),

    #[error("worker set {0} must name at least one worker")]
    EmptyWorkerSet(String),

    #[error("worker set {set} references unknown worker {worker}")]
    UnknownWorkerId { set: String, worker: String },

    #[error("worker set {set}: unknown hash method {method}")]
    UnknownHashMethod { set: String, method: String },

    #[error("worker set {set}: unknown distribution {value}")]
    UnknownDistribution { set: String, value: String },

    #[error("worker set {set}: invalid tag component {value:?}")]
    InvalidTag { set: String, value: String },

    #[error("worker set {set}: regexp-match requirement is missing its regexp")]
    MissingRegexp { set: String },

    #[error("worker set {set}: invalid regexp: {source}")]
    InvalidRegexp {
        set: String,
        #[source]
        source: regex::Error,
    },
}

// ---------------------------------------------------------------------------
// Raw serde layer: exactly the on-disk JSON shape.
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Document {
    core: Option<RawCore>,
    #[serde(default)]
    worker_sets: Vec<RawWorkerSet>,
    #[serde(default)]
    scps: Vec<RawScp>,
    #[serde(default)]
    workers: Vec<RawWorker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawCore {
    log_dir_path: String,
    log_format: String,
    buffer_dir_path: String,
    router_count: u32,
    queue_capacity: Option<usize>,
    shutdown_grace_secs: Option<u64>,
    liveness_check_interval_secs: Option<u64>,
    refuse_on_overload: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawScp {
    id: String,
    name: String,
    ae_title: String,
    address: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawWorker {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    ae_title: Option<String>,
    address: Option<String>,
    port: Option<u16>,
    output_dir_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawWorkerSet {
    id: String,
    name: String,
    worker_ids: Vec<String>,
    distribution: String,
    hash_method: String,
    #[serde(default)]
    accepted_scp_ids: Vec<String>,
    #[serde(default)]
    header_requirements: Vec<RawHeaderRequirement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawHeaderRequirement {
    tag: [String; 2],
    requirement: String,
    regexp: Option<String>,
}

// ---------------------------------------------------------------------------
// Validated model.
// ---------------------------------------------------------------------------

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub log_dir_path: PathBuf,
    pub log_format: String,
    pub buffer_dir_path: PathBuf,
    pub router_count: usize,
    /// Capacity of every bounded stage queue.
    pub queue_capacity: usize,
    /// Bound on the workers' final drain during shutdown.
    pub shutdown_grace: Duration,
    pub liveness_check_interval: Duration,
    /// Answer C-STORE with 0xA700 instead of 0x0000 when the routable is
    /// dropped on a full router queue.
    pub refuse_on_overload: bool,
}

/// One ingress DICOM listener.
#[derive(Debug, Clone)]
pub struct ScpConfig {
    pub id: ScpId,
    pub name: String,
    pub ae_title: String,
    pub address: String,
    pub port: u16,
}

/// Destination kind, with the fields that kind requires.
#[derive(Debug, Clone)]
pub enum WorkerKind {
    Scu { ae_title: String, address: String, port: u16 },
    LocalStorage { output_dir_path: PathBuf },
}

/// One destination worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub id: WorkerId,
    pub name: String,
    pub kind: WorkerKind,
}

/// How a worker set spreads routables over its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    /// Affinity-preserving placement by Patient ID hash.
    Hash,
    /// Rotation over the members; no Patient ID required.
    RoundRobin,
}

/// One admission predicate on a dataset header.
#[derive(Debug, Clone)]
pub struct HeaderRequirement {
    pub tag: (u16, u16),
    pub kind: RequirementKind,
}

/// The predicate applied to the tag named by a [`HeaderRequirement`].
#[derive(Debug, Clone)]
pub enum RequirementKind {
    Present,
    Absent,
    RegexpMatch(Regex),
    /// Unrecognised requirement string, preserved for the admission-time
    /// warning. Always rejects.
    Unknown(String),
}

/// One worker set: admission filter plus placement policy.
#[derive(Debug, Clone)]
pub struct WorkerSetConfig {
    pub id: WorkerSetId,
    pub name: String,
    pub worker_ids: Vec<WorkerId>,
    pub distribution: Distribution,
    pub hash_method: String,
    /// Empty means "accept from any SCP".
    pub accepted_scp_ids: Vec<ScpId>,
    pub header_requirements: Vec<HeaderRequirement>,
}

/// The validated in-memory configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub core: CoreConfig,
    pub scps: Vec<ScpConfig>,
    pub workers: Vec<WorkerConfig>,
    pub worker_sets: Vec<WorkerSetConfig>,
}

impl Configuration {
    /// Load from a file, or from every file in a directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }

        let mut documents = Vec::new();
        if path.is_dir() {
            let entries = fs::read_dir(path)
                .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
            for entry in entries {
                let entry =
                    entry.map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
                let file_path = entry.path();
                if file_path.is_file() {
                    documents.push(read_document(&file_path)?);
                }
            }
        } else {
            documents.push(read_document(path)?);
        }

        Self::from_documents(documents)
    }

    fn from_documents(documents: Vec<Document>) -> Result<Self, ConfigError> {
        let mut core = None;
        let mut scps = Vec::new();
        let mut workers = Vec::new();
        let mut worker_sets = Vec::new();

        for document in documents {
            // A later document's core section replaces an earlier one;
            // list sections concatenate.
            if let Some(raw) = document.core {
                core = Some(raw);
            }
            scps.extend(document.scps);
            workers.extend(document.workers);
            worker_sets.extend(document.worker_sets);
        }

        let core = validate_core(core.ok_or(ConfigError::MissingCore)?)?;
        let scps = validate_scps(scps)?;
        let workers = validate_workers(workers)?;
        let worker_sets = validate_worker_sets(worker_sets, &workers)?;

        Ok(Self { core, scps, workers, worker_sets })
    }
}

fn read_document(path: &Path) -> Result<Document, ConfigError> {
    let text = fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn validate_core(raw: RawCore) -> Result<CoreConfig, ConfigError> {
    if raw.router_count < 1 {
        return Err(ConfigError::RouterCount);
    }
    Ok(CoreConfig {
        log_dir_path: PathBuf::from(raw.log_dir_path),
        log_format: raw.log_format,
        buffer_dir_path: PathBuf::from(raw.buffer_dir_path),
        router_count: raw.router_count as usize,
        queue_capacity: raw.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
        shutdown_grace: Duration::from_secs(
            raw.shutdown_grace_secs.unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS),
        ),
        liveness_check_interval: Duration::from_secs(
            raw.liveness_check_interval_secs.unwrap_or(DEFAULT_LIVENESS_INTERVAL_SECS),
        ),
        refuse_on_overload: raw.refuse_on_overload.unwrap_or(false),
    })
}

fn validate_scps(raw: Vec<RawScp>) -> Result<Vec<ScpConfig>, ConfigError> {
    let mut ids = HashSet::new();
    let mut endpoints = HashSet::new();
    let mut scps = Vec::with_capacity(raw.len());

    for scp in raw {
        if scp.port == 0 {
            return Err(ConfigError::InvalidPort { kind: "scp", id: scp.id });
        }
        if !ids.insert(scp.id.clone()) {
            return Err(ConfigError::DuplicateId { kind: "scp", id: scp.id });
        }
        if !endpoints.insert((scp.address.clone(), scp.port)) {
            return Err(ConfigError::DuplicateEndpoint {
                id: scp.id,
                address: scp.address,
                port: scp.port,
            });
        }
        scps.push(ScpConfig {
            id: ScpId(scp.id),
            name: scp.name,
            ae_title: scp.ae_title,
            address: scp.address,
            port: scp.port,
        });
    }
    Ok(scps)
}

fn validate_workers(raw: Vec<RawWorker>) -> Result<Vec<WorkerConfig>, ConfigError> {
    let mut ids = HashSet::new();
    let mut workers = Vec::with_capacity(raw.len());

    for worker in raw {
        if !ids.insert(worker.id.clone()) {
            return Err(ConfigError::DuplicateId { kind: "worker", id: worker.id });
        }
        let kind = match worker.kind.as_str() {
            "scu" => match (worker.ae_title, worker.address, worker.port) {
                (Some(ae_title), Some(address), Some(port)) if port > 0 => {
                    WorkerKind::Scu { ae_title, address, port }
                }
                (_, _, Some(0)) => {
                    return Err(ConfigError::InvalidPort { kind: "worker", id: worker.id })
                }
                _ => return Err(ConfigError::IncompleteScuWorker(worker.id)),
            },
            "local-storage" => match worker.output_dir_path {
                Some(path) => WorkerKind::LocalStorage { output_dir_path: PathBuf::from(path) },
                None => return Err(ConfigError::IncompleteLocalWorker(worker.id)),
            },
            _ => {
                return Err(ConfigError::UnknownWorkerKind { id: worker.id, value: worker.kind })
            }
        };
        workers.push(WorkerConfig { id: WorkerId(worker.id), name: worker.name, kind });
    }
    Ok(workers)
}

fn validate_worker_sets(
    raw: Vec<RawWorkerSet>,
    workers: &[WorkerConfig],
) -> Result<Vec<WorkerSetConfig>, ConfigError> {
    let known: HashSet<&str> = workers.iter().map(|w| w.id.as_str()).collect();
    let mut ids = HashSet::new();
    let mut sets = Vec::with_capacity(raw.len());

    for set in raw {
        if !ids.insert(set.id.clone()) {
            return Err(ConfigError::DuplicateId { kind: "worker set", id: set.id });
        }
        if set.worker_ids.is_empty() {
            return Err(ConfigError::EmptyWorkerSet(set.id));
        }
        for worker_id in &set.worker_ids {
            if !known.contains(worker_id.as_str()) {
                return Err(ConfigError::UnknownWorkerId {
                    set: set.id.clone(),
                    worker: worker_id.clone(),
                });
            }
        }
        if hash::hash_fn(&set.hash_method).is_none() {
            return Err(ConfigError::UnknownHashMethod { set: set.id, method: set.hash_method });
        }
        let distribution = match set.distribution.as_str() {
            "hash" => Distribution::Hash,
            "round-robin" => Distribution::RoundRobin,
            _ => {
                return Err(ConfigError::UnknownDistribution {
                    set: set.id,
                    value: set.distribution,
                })
            }
        };

        let mut header_requirements = Vec::with_capacity(set.header_requirements.len());
        for requirement in set.header_requirements {
            header_requirements.push(validate_requirement(&set.id, requirement)?);
        }

        sets.push(WorkerSetConfig {
            id: WorkerSetId(set.id),
            name: set.name,
            worker_ids: set.worker_ids.into_iter().map(WorkerId).collect(),
            distribution,
            hash_method: set.hash_method,
            accepted_scp_ids: set.accepted_scp_ids.into_iter().map(ScpId).collect(),
            header_requirements,
        });
    }
    Ok(sets)
}

fn validate_requirement(
    set_id: &str,
    raw: RawHeaderRequirement,
) -> Result<HeaderRequirement, ConfigError> {
    let tag = (parse_tag_component(set_id, &raw.tag[0])?, parse_tag_component(set_id, &raw.tag[1])?);
    let kind = match raw.requirement.as_str() {
        "present" => RequirementKind::Present,
        "absent" => RequirementKind::Absent,
        "regexp-match" => {
            let pattern =
                raw.regexp.ok_or_else(|| ConfigError::MissingRegexp { set: set_id.to_string() })?;
            let regex = Regex::new(&pattern).map_err(|source| ConfigError::InvalidRegexp {
                set: set_id.to_string(),
                source,
            })?;
            RequirementKind::RegexpMatch(regex)
        }
        // Unknown requirement kinds reject at admission time with a warning,
        // not at startup.
        other => RequirementKind::Unknown(other.to_string()),
    };
    Ok(HeaderRequirement { tag, kind })
}

/// Parse one hex tag component, with or without a `0x` prefix.
fn parse_tag_component(set_id: &str, value: &str) -> Result<u16, ConfigError> {
    let digits = value.trim().trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidTag {
        set: set_id.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
