// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dlb_core::{LivenessCell, WorkerId};
use dlb_dimse::test_support;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::mpsc;

fn set_config(accepted: &[&str], requirements: Vec<HeaderRequirement>) -> WorkerSetConfig {
    WorkerSetConfig {
        id: WorkerSetId::new("ws1"),
        name: "test set".to_string(),
        worker_ids: vec![WorkerId::new("w0"), WorkerId::new("w1")],
        distribution: Distribution::Hash,
        hash_method: "random".to_string(),
        accepted_scp_ids: accepted.iter().map(|s| ScpId::new(*s)).collect(),
        header_requirements: requirements,
    }
}

fn worker(id: &str) -> (WorkerHandle, mpsc::Receiver<Routable>) {
    let (tx, rx) = mpsc::channel(8);
    (WorkerHandle::new(WorkerId::new(id), tx, Arc::new(LivenessCell::new())), rx)
}

fn requirement(tag: (u16, u16), kind: RequirementKind) -> HeaderRequirement {
    HeaderRequirement { tag, kind }
}

fn set_with_workers(
    config: &WorkerSetConfig,
) -> (WorkerSet, mpsc::Receiver<Routable>, mpsc::Receiver<Routable>) {
    let (w0, rx0) = worker("w0");
    let (w1, rx1) = worker("w1");
    let set = WorkerSet::new(config, vec![w0, w1], dlb_core::random);
    (set, rx0, rx1)
}

#[test]
fn scp_filter_rejects_other_sources() {
    let config = set_config(&["SCP_A"], vec![]);
    let (set, _rx0, _rx1) = set_with_workers(&config);
    assert!(set.can_accept(&test_support::routable("SCP_A", Some("P1"), "1.1")));
    assert!(!set.can_accept(&test_support::routable("SCP_B", Some("P1"), "1.1")));
}

#[test]
fn empty_scp_filter_accepts_any_source() {
    let config = set_config(&[], vec![]);
    let (set, _rx0, _rx1) = set_with_workers(&config);
    assert!(set.can_accept(&test_support::routable("SCP_B", Some("P1"), "1.1")));
}

#[test]
fn present_requirement_needs_the_tag() {
    let config =
        set_config(&[], vec![requirement((0x0010, 0x0010), RequirementKind::Present)]);
    let (set, _rx0, _rx1) = set_with_workers(&config);

    let with_name =
        test_support::routable_with_tags("SCP_A", Some("P1"), "1.1", &[((0x0010, 0x0010), "DOE^JOHN")]);
    let without_name = test_support::routable("SCP_A", Some("P1"), "1.1");
    assert!(set.can_accept(&with_name));
    assert!(!set.can_accept(&without_name));
}

#[test]
fn absent_requirement_rejects_the_tag() {
    let config = set_config(&[], vec![requirement((0x0010, 0x0010), RequirementKind::Absent)]);
    let (set, _rx0, _rx1) = set_with_workers(&config);

    let with_name =
        test_support::routable_with_tags("SCP_A", Some("P1"), "1.1", &[((0x0010, 0x0010), "DOE^JOHN")]);
    let without_name = test_support::routable("SCP_A", Some("P1"), "1.1");
    assert!(!set.can_accept(&with_name));
    assert!(set.can_accept(&without_name));
}

#[yare::parameterized(
    prefix_matches        = { "^C", true },
    full_anchor_mismatch  = { "^MR$", false },
    interior_match_is_not_a_start_match = { "T", false },
    start_match           = { "CT", true },
)]
fn regexp_requirement_matches_at_start(pattern: &str, expected: bool) {
    let config = set_config(
        &[],
        vec![requirement(
            (0x0008, 0x0060),
            RequirementKind::RegexpMatch(Regex::new(pattern).unwrap()),
        )],
    );
    let (set, _rx0, _rx1) = set_with_workers(&config);
    let routable =
        test_support::routable_with_tags("SCP_A", Some("P1"), "1.1", &[((0x0008, 0x0060), "CT")]);
    assert_eq!(set.can_accept(&routable), expected);
}

#[test]
fn regexp_requirement_rejects_a_missing_tag() {
    let config = set_config(
        &[],
        vec![requirement(
            (0x0008, 0x0060),
            RequirementKind::RegexpMatch(Regex::new("^CT").unwrap()),
        )],
    );
    let (set, _rx0, _rx1) = set_with_workers(&config);
    assert!(!set.can_accept(&test_support::routable("SCP_A", Some("P1"), "1.1")));
}

#[test]
fn unknown_requirement_rejects() {
    let config = set_config(
        &[],
        vec![requirement((0x0010, 0x0010), RequirementKind::Unknown("fuzzy".to_string()))],
    );
    let (set, _rx0, _rx1) = set_with_workers(&config);
    assert!(!set.can_accept(&test_support::routable("SCP_A", Some("P1"), "1.1")));
}

#[test]
fn requirements_short_circuit_in_order() {
    let config = set_config(
        &[],
        vec![
            requirement((0x0010, 0x0010), RequirementKind::Present),
            requirement((0x0010, 0x0010), RequirementKind::Absent),
        ],
    );
    let (set, _rx0, _rx1) = set_with_workers(&config);
    // The first requirement already rejects; the contradictory second one
    // is never consulted.
    assert!(!set.can_accept(&test_support::routable("SCP_A", Some("P1"), "1.1")));
}

#[tokio::test]
async fn dispatch_follows_the_patient_hash() {
    let config = set_config(&[], vec![]);
    let (set, mut rx0, mut rx1) = set_with_workers(&config);

    set.consume(test_support::routable("SCP_A", Some("P1"), "1.1"));
    set.consume(test_support::routable("SCP_A", Some("P1"), "1.2"));

    let expected = dlb_core::random("P1", 2).unwrap();
    let (mut chosen, mut other) = if expected == 0 { (rx0, rx1) } else { (rx1, rx0) };
    assert_eq!(chosen.recv().await.unwrap().sop_instance_uid().as_deref(), Some("1.1"));
    assert_eq!(chosen.recv().await.unwrap().sop_instance_uid().as_deref(), Some("1.2"));
    assert!(other.try_recv().is_err());
}

#[test]
fn dispatch_drops_instances_without_a_patient_id() {
    let config = set_config(&[], vec![]);
    let (set, mut rx0, mut rx1) = set_with_workers(&config);

    set.consume(test_support::routable("SCP_A", None, "1.1"));
    assert!(rx0.try_recv().is_err());
    assert!(rx1.try_recv().is_err());
}

#[test]
fn round_robin_distribution_rotates_over_members() {
    let mut config = set_config(&[], vec![]);
    config.distribution = Distribution::RoundRobin;
    let (set, mut rx0, mut rx1) = set_with_workers(&config);

    for uid in ["1.1", "1.2", "1.3", "1.4"] {
        set.consume(test_support::routable("SCP_A", Some("P1"), uid));
    }
    assert_eq!(rx0.try_recv().unwrap().sop_instance_uid().as_deref(), Some("1.1"));
    assert_eq!(rx1.try_recv().unwrap().sop_instance_uid().as_deref(), Some("1.2"));
    assert_eq!(rx0.try_recv().unwrap().sop_instance_uid().as_deref(), Some("1.3"));
    assert_eq!(rx1.try_recv().unwrap().sop_instance_uid().as_deref(), Some("1.4"));
}
