//! Error taxonomy for the orchestration core.
//!
//! Only `Configuration` aborts a whole run, and it is raised before any
//! capability is invoked. Capability errors are scoped to a single plan
//! entry; transient ones (unavailable, timeout) are retried up to the
//! configured cap before the entry goes terminal.

use thiserror::Error;

/// Result type used throughout figgen-core.
pub type Result<T> = std::result::Result<T, FiggenError>;

#[derive(Debug, Error)]
pub enum FiggenError {
    /// A generation or critique capability is unreachable or returned an error.
    #[error("capability '{capability}' unavailable: {reason}")]
    CapabilityUnavailable { capability: String, reason: String },

    /// A capability call exceeded its deadline. Treated like unavailability.
    #[error("capability '{capability}' timed out after {timeout_ms}ms")]
    CapabilityTimeout { capability: String, timeout_ms: u64 },

    /// Invalid thresholds, iteration bounds, or worker counts. Fatal at run
    /// start, before any capability calls.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A recorded digest does not match a recomputed one.
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// A run has no persisted outcome to inspect, diff, or audit.
    #[error("run {run_id} has no recorded outcome")]
    MissingOutcome { run_id: String },

    /// A hard-mode reproducibility audit found failing checks.
    #[error("reproducibility audit failed for run {run_id}: {failures} check(s) failed")]
    AuditFailed { run_id: String, failures: usize },

    /// An entry worker task panicked or was aborted.
    #[error("entry worker failed: {0}")]
    Worker(String),

    #[error("storage error: {0}")]
    Storage(#[from] figgen_state::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FiggenError {
    /// Whether this error is a transient capability failure that the loop
    /// retries without consuming a quality iteration.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FiggenError::CapabilityUnavailable { .. } | FiggenError::CapabilityTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let unavailable = FiggenError::CapabilityUnavailable {
            capability: "generator".to_string(),
            reason: "connection refused".to_string(),
        };
        let timeout = FiggenError::CapabilityTimeout {
            capability: "critic".to_string(),
            timeout_ms: 5000,
        };
        let config = FiggenError::Configuration("max_iterations must be > 0".to_string());

        assert!(unavailable.is_transient());
        assert!(timeout.is_transient());
        assert!(!config.is_transient());
    }

    #[test]
    fn test_display_messages() {
        let err = FiggenError::CapabilityTimeout {
            capability: "generator".to_string(),
            timeout_ms: 250,
        };
        assert_eq!(
            err.to_string(),
            "capability 'generator' timed out after 250ms"
        );
    }
}
