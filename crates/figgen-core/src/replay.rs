//! Deterministic replay of a recorded run from its ledger.
//!
//! Replay never re-invokes capabilities: every decision the loop made is in
//! the ledger, so the per-entry outcomes are reconstructed purely from the
//! event stream. Two replays of the same run always produce the same
//! [`ReplaySummary`], including the digest over the event stream.

use figgen_state::{ContentDigest, RunId, RunLedger, RunRecord, RunStatus};
use serde::{Deserialize, Serialize};

use crate::domain::config::RunConfig;
use crate::domain::error::{FiggenError, Result};
use crate::domain::run::{EntryOutcome, EntryStatus};
use crate::events::{EntryFinishedPayload, ENTRY_FINISHED};

/// Per-entry state reconstructed from `entry_finished` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryReplay {
    pub entry_id: String,
    pub status: EntryStatus,
    pub iterations: u32,
    pub final_score: Option<f64>,
    pub retained_attempt: Option<u32>,
    pub needs_attention: bool,
}

/// Result of replaying one run's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub run_id: String,
    pub status: RunStatus,
    pub event_count: usize,
    /// Digest over the full serialized event stream. Equal across replays of
    /// the same run; any ledger tampering changes it.
    pub replay_digest: ContentDigest,
    pub config_digest: ContentDigest,
    pub entries: Vec<EntryReplay>,
    /// True when the replayed entry states agree with the persisted run
    /// summary (or the run has no summary yet).
    pub consistent: bool,
}

/// Replay a run from its ledger alone.
pub async fn replay(ledger: &dyn RunLedger, run_id: &RunId) -> Result<ReplaySummary> {
    let record = ledger.get_run(run_id).await?;
    let events = ledger.get_events(run_id).await?;

    let replay_digest = ContentDigest::from_bytes(&serde_json::to_vec(&events)?);

    let mut entries = Vec::new();
    for event in &events {
        if event.kind == ENTRY_FINISHED {
            let payload: EntryFinishedPayload = serde_json::from_value(event.payload.clone())?;
            entries.push(EntryReplay {
                entry_id: payload.entry_id,
                status: payload.status,
                iterations: payload.iterations,
                final_score: payload.final_score,
                retained_attempt: payload.retained_attempt,
                needs_attention: payload.needs_attention,
            });
        }
    }

    let consistent = match &record.summary {
        Some(summary) => {
            let outcomes: Vec<EntryOutcome> = serde_json::from_value(summary.outcomes.clone())?;
            outcomes.len() == entries.len()
                && outcomes.iter().all(|o| {
                    entries.iter().any(|e| {
                        e.entry_id == o.entry_id
                            && e.status == o.status
                            && e.iterations == o.iterations
                            && e.final_score == o.final_score
                    })
                })
        }
        None => true,
    };

    Ok(ReplaySummary {
        run_id: record.run_id.0.clone(),
        status: record.status,
        event_count: events.len(),
        replay_digest,
        config_digest: record.config_digest.clone(),
        entries,
        consistent,
    })
}

/// Recompute the configuration fingerprint from the stored config value and
/// compare it against the recorded digest.
pub fn verify_config_digest(record: &RunRecord) -> Result<()> {
    let config: RunConfig = serde_json::from_value(record.config.clone())?;
    let actual = config.fingerprint()?;
    if actual != record.config_digest {
        return Err(FiggenError::DigestMismatch {
            expected: record.config_digest.as_str().to_string(),
            actual: actual.as_str().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EntryFinishedPayload, ENTRY_FINISHED};
    use crate::recording::RunRecorder;
    use figgen_state::{MemoryRunLedger, RunMetadata};
    use std::sync::Arc;

    async fn seeded_ledger() -> (Arc<MemoryRunLedger>, RunId) {
        let ledger = Arc::new(MemoryRunLedger::new());
        let config = RunConfig::default();
        let digest = config.fingerprint().unwrap();
        let run_id = ledger
            .create_run(
                &serde_json::to_value(&config).unwrap(),
                &digest,
                &serde_json::json!([]),
                &serde_json::json!({}),
                RunMetadata::empty(),
            )
            .await
            .unwrap();

        let recorder = RunRecorder::new(ledger.clone(), run_id.clone());
        recorder
            .record(
                ENTRY_FINISHED,
                &EntryFinishedPayload {
                    entry_id: "fig-1".to_string(),
                    status: EntryStatus::Accepted,
                    iterations: 1,
                    final_score: Some(0.9),
                    retained_attempt: Some(1),
                    needs_attention: false,
                },
            )
            .await
            .unwrap();
        (ledger, run_id)
    }

    #[tokio::test]
    async fn test_replay_is_deterministic() {
        let (ledger, run_id) = seeded_ledger().await;

        let first = replay(ledger.as_ref(), &run_id).await.unwrap();
        let second = replay(ledger.as_ref(), &run_id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.replay_digest, second.replay_digest);
        assert_eq!(first.entries.len(), 1);
        assert_eq!(first.entries[0].status, EntryStatus::Accepted);
    }

    #[tokio::test]
    async fn test_replay_consistent_without_summary() {
        let (ledger, run_id) = seeded_ledger().await;
        let summary = replay(ledger.as_ref(), &run_id).await.unwrap();
        assert!(summary.consistent);
        assert_eq!(summary.event_count, 1);
    }

    #[tokio::test]
    async fn test_config_digest_verifies() {
        let (ledger, run_id) = seeded_ledger().await;
        let record = ledger.get_run(&run_id).await.unwrap();
        verify_config_digest(&record).unwrap();
    }

    #[tokio::test]
    async fn test_config_digest_mismatch_detected() {
        let ledger = MemoryRunLedger::new();
        let config = RunConfig::default();
        let wrong = ContentDigest::from_bytes(b"something else");
        let run_id = ledger
            .create_run(
                &serde_json::to_value(&config).unwrap(),
                &wrong,
                &serde_json::json!([]),
                &serde_json::json!({}),
                RunMetadata::empty(),
            )
            .await
            .unwrap();

        let record = ledger.get_run(&run_id).await.unwrap();
        let err = verify_config_digest(&record).unwrap_err();
        assert!(matches!(err, FiggenError::DigestMismatch { .. }));
    }
}
