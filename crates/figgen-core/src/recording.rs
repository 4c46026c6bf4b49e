//! Recording adapter: assigns sequence numbers and appends loop events to
//! the run ledger.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use figgen_state::{LedgerEvent, RunId, RunLedger};
use serde::Serialize;

use crate::domain::error::Result;
use crate::obs;

/// Per-run event recorder. Sequence numbers are monotonic across all entry
/// tasks; the ledger append itself is atomic per record, so concurrent entry
/// workers can share one recorder.
pub struct RunRecorder {
    ledger: Arc<dyn RunLedger>,
    run_id: RunId,
    seq: AtomicU64,
}

impl RunRecorder {
    pub fn new(ledger: Arc<dyn RunLedger>, run_id: RunId) -> Self {
        RunRecorder {
            ledger,
            run_id,
            seq: AtomicU64::new(0),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Events appended so far.
    pub fn event_count(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Append one event, returning its sequence number.
    pub async fn record<P: Serialize>(&self, kind: &str, payload: &P) -> Result<u64> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let event = LedgerEvent {
            seq,
            kind: kind.to_string(),
            payload: serde_json::to_value(payload)?,
            timestamp: Utc::now(),
        };
        self.ledger.append_event(&self.run_id, event).await?;
        obs::emit_event_appended(&self.run_id.0, kind, seq);
        Ok(seq)
    }
}
