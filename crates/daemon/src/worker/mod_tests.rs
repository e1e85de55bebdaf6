// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dlb_dimse::test_support;

fn handle_with_capacity(capacity: usize) -> (WorkerHandle, mpsc::Receiver<Routable>) {
    let (tx, rx) = mpsc::channel(capacity);
    (WorkerHandle::new(WorkerId::new("w1"), tx, Arc::new(LivenessCell::new())), rx)
}

#[tokio::test]
async fn enqueue_drops_when_the_queue_is_full() {
    let (handle, mut rx) = handle_with_capacity(2);
    assert!(handle.enqueue(test_support::routable("SCP_A", Some("P1"), "1.1")));
    assert!(handle.enqueue(test_support::routable("SCP_A", Some("P1"), "1.2")));
    // The queue holds two; the third offer drops without blocking.
    assert!(!handle.enqueue(test_support::routable("SCP_A", Some("P1"), "1.3")));

    // Nothing was reordered or lost besides the dropped offer.
    assert_eq!(rx.recv().await.unwrap().sop_instance_uid().as_deref(), Some("1.1"));
    assert_eq!(rx.recv().await.unwrap().sop_instance_uid().as_deref(), Some("1.2"));
}

#[tokio::test]
async fn enqueue_drops_when_the_worker_is_gone() {
    let (handle, rx) = handle_with_capacity(2);
    drop(rx);
    assert!(!handle.enqueue(test_support::routable("SCP_A", Some("P1"), "1.1")));
}

#[tokio::test]
async fn liveness_starts_unknown() {
    let (handle, _rx) = handle_with_capacity(1);
    assert_eq!(handle.liveness(), LivenessStatus::Unknown);
}
