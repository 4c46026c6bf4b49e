//! Contract tests run against every `RunLedger` backend.
//!
//! Both backends must agree on ordering, immutability after finalize, and
//! error classification, or replay stops being deterministic across them.

use std::sync::Arc;

use chrono::Utc;
use figgen_state::{
    ContentDigest, FsRunLedger, LedgerEvent, MemoryRunLedger, RunId, RunLedger, RunMetadata,
    RunStatus, RunSummary, StorageError,
};

fn event(seq: u64, kind: &str) -> LedgerEvent {
    LedgerEvent {
        seq,
        kind: kind.to_string(),
        payload: serde_json::json!({ "marker": seq }),
        timestamp: Utc::now(),
    }
}

fn summary() -> RunSummary {
    RunSummary {
        total_events: 3,
        duration_ms: 42,
        success: true,
        outcomes: serde_json::json!([]),
    }
}

async fn create(ledger: &dyn RunLedger) -> RunId {
    ledger
        .create_run(
            &serde_json::json!({"max_iterations": 3}),
            &ContentDigest::from_bytes(b"contract-config"),
            &serde_json::json!([{"entry_id": "fig-1"}]),
            &serde_json::json!({}),
            RunMetadata::empty(),
        )
        .await
        .expect("create_run")
}

async fn check_events_sorted_by_seq(ledger: Arc<dyn RunLedger>) {
    let run_id = create(&*ledger).await;

    // Append deliberately out of order.
    for seq in [3u64, 1, 2] {
        ledger
            .append_event(&run_id, event(seq, "attempt_drafted"))
            .await
            .expect("append");
    }

    let events = ledger.get_events(&run_id).await.expect("get_events");
    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

async fn check_terminal_runs_immutable(ledger: Arc<dyn RunLedger>) {
    let run_id = create(&*ledger).await;
    ledger
        .complete_run(&run_id, summary())
        .await
        .expect("complete");

    let record = ledger.get_run(&run_id).await.expect("get_run");
    assert_eq!(record.status, RunStatus::Completed);
    assert!(record.completed_at.is_some());

    assert!(matches!(
        ledger.append_event(&run_id, event(9, "late")).await,
        Err(StorageError::InvalidRunState { .. })
    ));
    assert!(matches!(
        ledger.complete_run(&run_id, summary()).await,
        Err(StorageError::InvalidRunState { .. })
    ));
}

async fn check_missing_run_rejected(ledger: Arc<dyn RunLedger>) {
    let missing = RunId("run-19700101-000000-abcdef".to_string());
    assert!(matches!(
        ledger.get_run(&missing).await,
        Err(StorageError::RunNotFound { .. })
    ));
    assert!(matches!(
        ledger.append_event(&missing, event(1, "orphan")).await,
        Err(StorageError::RunNotFound { .. })
    ));
}

async fn check_cancel_is_distinct_terminal(ledger: Arc<dyn RunLedger>) {
    let run_id = create(&*ledger).await;
    ledger
        .cancel_run(&run_id, summary())
        .await
        .expect("cancel");
    let record = ledger.get_run(&run_id).await.expect("get_run");
    assert_eq!(record.status, RunStatus::Cancelled);
}

async fn check_list_runs_contains_created(ledger: Arc<dyn RunLedger>) {
    let a = create(&*ledger).await;
    let b = create(&*ledger).await;
    let runs = ledger.list_runs().await.expect("list_runs");
    let ids: Vec<&str> = runs.iter().map(|r| r.run_id.0.as_str()).collect();
    assert!(ids.contains(&a.0.as_str()));
    assert!(ids.contains(&b.0.as_str()));
}

macro_rules! contract_tests {
    ($name:ident, $make:expr) => {
        mod $name {
            use super::*;

            #[tokio::test]
            async fn events_sorted_by_seq() {
                check_events_sorted_by_seq($make).await;
            }

            #[tokio::test]
            async fn terminal_runs_immutable() {
                check_terminal_runs_immutable($make).await;
            }

            #[tokio::test]
            async fn missing_run_rejected() {
                check_missing_run_rejected($make).await;
            }

            #[tokio::test]
            async fn cancel_is_distinct_terminal() {
                check_cancel_is_distinct_terminal($make).await;
            }

            #[tokio::test]
            async fn list_runs_contains_created() {
                check_list_runs_contains_created($make).await;
            }
        }
    };
}

contract_tests!(memory, Arc::new(MemoryRunLedger::new()) as Arc<dyn RunLedger>);

contract_tests!(filesystem, {
    // Leak the tempdir so the backend outlives the block; test process exit
    // cleans up via the OS temp reaper.
    let dir = Box::leak(Box::new(tempfile::tempdir().expect("tempdir")));
    Arc::new(FsRunLedger::new(dir.path()).expect("fs ledger")) as Arc<dyn RunLedger>
});
