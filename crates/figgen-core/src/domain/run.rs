//! Per-entry and per-run terminal outcomes.

use serde::{Deserialize, Serialize};

use crate::domain::critique::Dimension;
use crate::traceability::TraceabilityRecord;

/// Terminal state of one figure plan entry. Every entry reaches exactly one
/// of these; a run is terminal once all its entries are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// An attempt passed traceability validation and the critique policy.
    Accepted,
    /// The quality iteration bound was exhausted without an accept decision.
    /// The best-scoring attempt is retained, flagged for manual review.
    Exhausted,
    /// A capability stayed unavailable past the transient-failure cap.
    Failed,
    /// Run cancellation was requested before this entry finished.
    Cancelled,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Accepted => "accepted",
            EntryStatus::Exhausted => "exhausted",
            EntryStatus::Failed => "failed",
            EntryStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal outcome of one entry. Serialized into the run summary so the
/// inspect, diff, and audit paths can read it without replaying the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub entry_id: String,
    pub status: EntryStatus,
    /// Quality iterations actually consumed.
    pub iterations: u32,
    /// Overall score of the retained attempt, if any attempt was critiqued.
    pub final_score: Option<f64>,
    /// 1-based index of the attempt retained as this entry's result.
    pub retained_attempt: Option<u32>,
    /// Dimensions still failing on the retained attempt (empty if accepted).
    pub failed_dimensions: Vec<Dimension>,
    /// Element count of the retained attempt's metadata.
    pub element_count: usize,
    /// Present only for accepted entries.
    pub traceability: Option<TraceabilityRecord>,
    /// True for exhausted, failed, and cancelled entries — never silently
    /// dropped from the report.
    pub needs_attention: bool,
}

impl EntryOutcome {
    pub fn accepted(&self) -> bool {
        self.status == EntryStatus::Accepted
    }

    /// Fraction of elements with at least one valid span mapping.
    pub fn traceability_coverage(&self) -> Option<f64> {
        self.traceability.as_ref().map(|t| t.coverage())
    }
}

/// Outcome of a whole run: one entry outcome per plan entry, in plan order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub outcomes: Vec<EntryOutcome>,
    /// True iff every entry reached `Accepted`.
    pub success: bool,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub fn accepted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.accepted()).count()
    }

    pub fn outcome(&self, entry_id: &str) -> Option<&EntryOutcome> {
        self.outcomes.iter().find(|o| o.entry_id == entry_id)
    }
}
