//! Storage trait definitions for the figgen run ledger.
//!
//! The `RunLedger` trait is the single durable surface the orchestration core
//! writes through: one record per run (plan + configuration snapshot), an
//! append-only event stream per run, and a summary written exactly once at
//! completion. In-memory fakes live in the `fakes` module; the filesystem
//! backend in `fs_ledger`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// Unique identifier for a pipeline run.
///
/// Time-derived so run directories sort chronologically, with a random suffix
/// to disambiguate runs started in the same second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new RunId of the form `run-YYYYMMDD-HHMMSS-xxxxxx`.
    pub fn new() -> Self {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let suffix = &uuid::Uuid::new_v4().simple().to_string()[..6];
        RunId(format!("run-{stamp}-{suffix}"))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Run records and events
// ---------------------------------------------------------------------------

/// Metadata attached to a run at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Path of the source paper this run was generated from.
    pub paper_path: Option<String>,
    /// Run id this run is a rerun of, if any.
    pub rerun_of: Option<String>,
    /// Arbitrary key-value tags.
    pub tags: serde_json::Value,
}

impl RunMetadata {
    pub fn empty() -> Self {
        Self {
            paper_path: None,
            rerun_of: None,
            tags: serde_json::json!({}),
        }
    }
}

/// A single event in a run's append-only ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Monotonic sequence number within the run.
    pub seq: u64,
    /// Event kind (e.g. "attempt_drafted", "decision_made").
    pub kind: String,
    /// Event payload.
    pub payload: serde_json::Value,
    /// Timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Summary written when a run reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total events recorded.
    pub total_events: u64,
    /// Duration in milliseconds.
    pub duration_ms: u64,
    /// Whether every entry reached `Accepted`.
    pub success: bool,
    /// Per-entry terminal outcomes (serialized `figgen-core` outcome list).
    pub outcomes: serde_json::Value,
}

/// Status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Full run record.
///
/// `config` and `plan` are stored as opaque JSON here; the core crate owns
/// the typed views and round-trips them through serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    /// Configuration snapshot, immutable for the life of the run.
    pub config: serde_json::Value,
    /// SHA-256 fingerprint of the canonical config serialization.
    pub config_digest: ContentDigest,
    /// Ordered figure plan entries, immutable once the run starts.
    pub plan: serde_json::Value,
    /// Extracted source sections the plan's spans resolve against.
    pub sections: serde_json::Value,
    pub metadata: RunMetadata,
    pub status: RunStatus,
    pub summary: Option<RunSummary>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// RunLedger
// ---------------------------------------------------------------------------

/// Append-only run ledger.
///
/// Guarantees:
/// - Events are ordered by monotonic `seq` within a run.
/// - A run transitions: Running → Completed | Failed | Cancelled (terminal).
/// - Terminal runs are immutable; appends and re-completion are rejected.
#[async_trait]
pub trait RunLedger: Send + Sync {
    /// Create a new run holding the given config snapshot, plan, and sections.
    async fn create_run(
        &self,
        config: &serde_json::Value,
        config_digest: &ContentDigest,
        plan: &serde_json::Value,
        sections: &serde_json::Value,
        metadata: RunMetadata,
    ) -> StorageResult<RunId>;

    /// Append an event to an active run. Fails if the run is terminal.
    async fn append_event(&self, run_id: &RunId, event: LedgerEvent) -> StorageResult<()>;

    /// Mark a run as completed with a summary.
    async fn complete_run(&self, run_id: &RunId, summary: RunSummary) -> StorageResult<()>;

    /// Mark a run as failed with a summary.
    async fn fail_run(&self, run_id: &RunId, summary: RunSummary) -> StorageResult<()>;

    /// Mark a run as cancelled with a summary.
    async fn cancel_run(&self, run_id: &RunId, summary: RunSummary) -> StorageResult<()>;

    /// Retrieve a run record by ID.
    async fn get_run(&self, run_id: &RunId) -> StorageResult<RunRecord>;

    /// Retrieve all events for a run, ordered by seq.
    async fn get_events(&self, run_id: &RunId) -> StorageResult<Vec<LedgerEvent>>;

    /// List all run records.
    async fn list_runs(&self) -> StorageResult<Vec<RunRecord>>;
}
