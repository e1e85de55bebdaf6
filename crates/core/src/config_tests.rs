// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_config() -> serde_json::Value {
    serde_json::json!({
        "core": {
            "log-dir-path": "/tmp/dlb/logs",
            "log-format": "text",
            "buffer-dir-path": "/tmp/dlb/buffer",
            "router-count": 2
        },
        "scps": [
            { "id": "SCP_A", "name": "Ingress A", "ae-title": "DLB_A",
              "address": "127.0.0.1", "port": 11112 }
        ],
        "workers": [
            { "id": "w1", "name": "PACS one", "type": "scu",
              "ae-title": "PACS1", "address": "127.0.0.1", "port": 11113 },
            { "id": "w2", "name": "Archive", "type": "local-storage",
              "output-dir-path": "/tmp/dlb/out/%id%" }
        ],
        "worker-sets": [
            { "id": "ws1", "name": "Everything", "worker-ids": ["w1", "w2"],
              "distribution": "hash", "hash-method": "random",
              "accepted-scp-ids": [],
              "header-requirements": [
                  { "tag": ["0010", "0010"], "requirement": "present" }
              ] }
        ]
    })
}

fn write_config(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

#[test]
fn loads_a_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &sample_config());

    let config = Configuration::load(&path).unwrap();
    assert_eq!(config.core.router_count, 2);
    assert_eq!(config.scps.len(), 1);
    assert_eq!(config.workers.len(), 2);
    assert_eq!(config.worker_sets.len(), 1);
    assert_eq!(config.worker_sets[0].header_requirements.len(), 1);
}

#[test]
fn loads_every_file_in_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "a.json", &sample_config());
    write_config(
        dir.path(),
        "b.json",
        &serde_json::json!({
            "scps": [
                { "id": "SCP_B", "name": "Ingress B", "ae-title": "DLB_B",
                  "address": "127.0.0.1", "port": 11114 }
            ],
            "workers": [
                { "id": "w3", "name": "PACS two", "type": "scu",
                  "ae-title": "PACS2", "address": "127.0.0.1", "port": 11115 }
            ]
        }),
    );

    let config = Configuration::load(dir.path()).unwrap();
    assert_eq!(config.scps.len(), 2);
    assert_eq!(config.workers.len(), 3);
    assert_eq!(config.worker_sets.len(), 1);
}

#[test]
fn missing_path_is_an_error() {
    let err = Configuration::load(Path::new("/nonexistent/dlb-config.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Missing(_)));
}

#[test]
fn invalid_json_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(Configuration::load(&path), Err(ConfigError::Parse { .. })));
}

#[test]
fn core_section_is_required() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &serde_json::json!({ "scps": [] }));
    assert!(matches!(Configuration::load(&path), Err(ConfigError::MissingCore)));
}

#[test]
fn router_count_must_be_positive() {
    let mut value = sample_config();
    value["core"]["router-count"] = serde_json::json!(0);
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    assert!(matches!(Configuration::load(&path), Err(ConfigError::RouterCount)));
}

#[test]
fn optional_core_settings_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &sample_config());
    let config = Configuration::load(&path).unwrap();
    assert_eq!(config.core.queue_capacity, 1024);
    assert_eq!(config.core.shutdown_grace, Duration::from_secs(10));
    assert_eq!(config.core.liveness_check_interval, Duration::from_secs(10));
    assert!(!config.core.refuse_on_overload);
}

#[test]
fn unknown_worker_reference_is_an_error() {
    let mut value = sample_config();
    value["worker-sets"][0]["worker-ids"] = serde_json::json!(["w1", "ghost"]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    let err = Configuration::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownWorkerId { worker, .. } if worker == "ghost"));
}

#[test]
fn unknown_hash_method_is_an_error() {
    let mut value = sample_config();
    value["worker-sets"][0]["hash-method"] = serde_json::json!("fancy");
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    let err = Configuration::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownHashMethod { method, .. } if method == "fancy"));
}

#[test]
fn unknown_distribution_is_an_error() {
    let mut value = sample_config();
    value["worker-sets"][0]["distribution"] = serde_json::json!("least-loaded");
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    assert!(matches!(Configuration::load(&path), Err(ConfigError::UnknownDistribution { .. })));
}

#[test]
fn duplicate_scp_endpoint_is_an_error() {
    let mut value = sample_config();
    value["scps"].as_array_mut().unwrap().push(serde_json::json!({
        "id": "SCP_B", "name": "Clash", "ae-title": "DLB_B",
        "address": "127.0.0.1", "port": 11112
    }));
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    assert!(matches!(Configuration::load(&path), Err(ConfigError::DuplicateEndpoint { .. })));
}

#[yare::parameterized(
    scp_worker   = { "scu" },
    local_worker = { "local-storage" },
)]
fn incomplete_worker_is_an_error(kind: &str) {
    let mut value = sample_config();
    value["workers"] = serde_json::json!([
        { "id": "bad", "name": "Bad", "type": kind }
    ]);
    value["worker-sets"][0]["worker-ids"] = serde_json::json!(["bad"]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    let err = Configuration::load(&path).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::IncompleteScuWorker(_) | ConfigError::IncompleteLocalWorker(_)
    ));
}

#[test]
fn unknown_worker_type_is_an_error() {
    let mut value = sample_config();
    value["workers"][0]["type"] = serde_json::json!("teleport");
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    assert!(matches!(Configuration::load(&path), Err(ConfigError::UnknownWorkerKind { .. })));
}

#[test]
fn tags_parse_as_hex() {
    let mut value = sample_config();
    value["worker-sets"][0]["header-requirements"] = serde_json::json!([
        { "tag": ["0x0008", "0x0060"], "requirement": "regexp-match", "regexp": "^CT$" }
    ]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    let config = Configuration::load(&path).unwrap();
    let requirement = &config.worker_sets[0].header_requirements[0];
    assert_eq!(requirement.tag, (0x0008, 0x0060));
    assert!(matches!(requirement.kind, RequirementKind::RegexpMatch(_)));
}

#[test]
fn malformed_tag_is_an_error() {
    let mut value = sample_config();
    value["worker-sets"][0]["header-requirements"] = serde_json::json!([
        { "tag": ["001g", "0020"], "requirement": "present" }
    ]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    assert!(matches!(Configuration::load(&path), Err(ConfigError::InvalidTag { .. })));
}

#[test]
fn regexp_match_requires_a_regexp() {
    let mut value = sample_config();
    value["worker-sets"][0]["header-requirements"] = serde_json::json!([
        { "tag": ["0010", "0020"], "requirement": "regexp-match" }
    ]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    assert!(matches!(Configuration::load(&path), Err(ConfigError::MissingRegexp { .. })));
}

#[test]
fn unknown_requirement_kind_is_preserved() {
    let mut value = sample_config();
    value["worker-sets"][0]["header-requirements"] = serde_json::json!([
        { "tag": ["0010", "0020"], "requirement": "fuzzy-match" }
    ]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.json", &value);
    let config = Configuration::load(&path).unwrap();
    let requirement = &config.worker_sets[0].header_requirements[0];
    assert!(matches!(&requirement.kind, RequirementKind::Unknown(kind) if kind == "fuzzy-match"));
}
