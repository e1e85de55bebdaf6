// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

/// Strategy returning a fixed status.
struct FixedStrategy(LivenessStatus);

impl LivenessStrategy for FixedStrategy {
    fn check(&self) -> LivenessStatus {
        self.0
    }
}

async fn wait_for_status(cell: &LivenessCell, expected: LivenessStatus) {
    for _ in 0..100 {
        if cell.get() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("cell never reached {expected}, stuck at {}", cell.get());
}

#[tokio::test]
async fn checker_publishes_the_strategy_result() {
    for status in
        [LivenessStatus::Live, LivenessStatus::SoftFail, LivenessStatus::HardFail]
    {
        let cell = Arc::new(LivenessCell::new());
        assert_eq!(cell.get(), LivenessStatus::Unknown);

        let cancel = CancellationToken::new();
        let checker = LivenessChecker::new(
            WorkerId::new("w1"),
            Arc::new(FixedStrategy(status)),
            Arc::clone(&cell),
            Duration::from_millis(10),
            cancel.clone(),
        );
        let task = checker.spawn();

        wait_for_status(&cell, status).await;
        cancel.cancel();
        task.await.unwrap();
    }
}

#[test]
fn echo_strategy_reports_hard_fail_for_a_dead_peer() {
    // Bind then drop to get a port nothing is listening on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let strategy = DicomEchoStrategy::new(EchoScu {
        calling_ae_title: "PROBE".to_string(),
        called_ae_title: "NOBODY".to_string(),
        address: "127.0.0.1".to_string(),
        port,
    });
    assert_eq!(strategy.check(), LivenessStatus::HardFail);
}

#[tokio::test]
async fn checker_exits_on_cancellation() {
    let cell = Arc::new(LivenessCell::new());
    let cancel = CancellationToken::new();
    let checker = LivenessChecker::new(
        WorkerId::new("w1"),
        Arc::new(FixedStrategy(LivenessStatus::Live)),
        Arc::clone(&cell),
        Duration::from_secs(3600),
        cancel.clone(),
    );
    let task = checker.spawn();

    wait_for_status(&cell, LivenessStatus::Live).await;
    cancel.cancel();
    // The checker wakes from its interval sleep and exits.
    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
}
