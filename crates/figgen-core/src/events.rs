//! Ledger event kinds and payload shapes for the generation-critique loop.
//!
//! Every loop transition appends one event. Payloads carry enough to
//! reconstruct the decision without re-invoking capabilities: the literal
//! feedback injected into each draft, validator verdicts, critique scores,
//! and policy decisions all land in the ledger verbatim.

use figgen_state::ContentDigest;
use serde::{Deserialize, Serialize};

use crate::domain::attempt::{AttemptStatus, GenerationAttempt};
use crate::domain::critique::{Dimension, QualityScores};
use crate::domain::run::EntryStatus;
use crate::traceability::SpanViolation;

pub const RUN_STARTED: &str = "run_started";
pub const ENTRY_STARTED: &str = "entry_started";
pub const ATTEMPT_DRAFTED: &str = "attempt_drafted";
pub const TRACEABILITY_CHECKED: &str = "traceability_checked";
pub const CRITIQUE_RECEIVED: &str = "critique_received";
pub const DECISION_MADE: &str = "decision_made";
pub const CAPABILITY_FAILED: &str = "capability_failed";
pub const ENTRY_FINISHED: &str = "entry_finished";
pub const RUN_FINISHED: &str = "run_finished";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStartedPayload {
    pub entry_count: usize,
    pub config_digest: ContentDigest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryStartedPayload {
    pub entry_id: String,
    pub order: u32,
}

/// Attempt drafted. The embedded attempt record carries the full feedback
/// history injected into this iteration's generator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDraftedPayload {
    pub entry_id: String,
    /// Monotonic per-entry draft counter. Distinct from `attempt.index`: a
    /// transient critique failure redrafts within the same quality iteration,
    /// so two drafts can share an index but never a `draft_seq`.
    pub draft_seq: u32,
    pub attempt: GenerationAttempt,
}

/// Validator verdict for one attempt. `status` is `Produced` when every
/// element's spans check out, `Failed` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceabilityCheckedPayload {
    pub entry_id: String,
    pub attempt: u32,
    pub status: AttemptStatus,
    pub violations: Vec<SpanViolation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueReceivedPayload {
    pub entry_id: String,
    pub attempt: u32,
    pub scores: QualityScores,
    pub overall: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionMadePayload {
    pub entry_id: String,
    pub attempt: u32,
    /// "accept" or "revise".
    pub decision: String,
    pub failed_dimensions: Vec<Dimension>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityFailedPayload {
    pub entry_id: String,
    pub attempt: u32,
    pub capability: String,
    pub reason: String,
    /// How many transient failures this entry has accumulated, including
    /// this one.
    pub transient_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryFinishedPayload {
    pub entry_id: String,
    pub status: EntryStatus,
    pub iterations: u32,
    pub final_score: Option<f64>,
    pub retained_attempt: Option<u32>,
    pub needs_attention: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFinishedPayload {
    pub success: bool,
    pub cancelled: bool,
    pub accepted_count: usize,
    pub entry_count: usize,
    pub duration_ms: u64,
}
