//! Run configuration: thresholds, iteration bounds, and concurrency limits.

use std::time::Duration;

use figgen_state::ContentDigest;
use serde::{Deserialize, Serialize};

use crate::domain::error::{FiggenError, Result};

/// Configuration snapshot for one run. Immutable once the run starts; the
/// canonical JSON serialization is fingerprinted and stored on the run
/// record so rerun and audit can verify it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Quality-driven iteration bound per entry.
    pub max_iterations: u32,
    /// Minimum overall score for acceptance.
    pub overall_threshold: f64,
    /// Minimum per-dimension score for acceptance.
    pub dimension_threshold: f64,
    /// Transient capability-failure cap per entry. Independent of
    /// `max_iterations`: infrastructure errors do not consume quality
    /// iterations.
    pub transient_retries: u32,
    /// Upper bound on concurrently processed entries.
    pub worker_count: usize,
    /// Deadline for a single capability call, in milliseconds.
    pub capability_timeout_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            max_iterations: 3,
            overall_threshold: 0.75,
            dimension_threshold: 0.55,
            transient_retries: 3,
            worker_count: 4,
            capability_timeout_ms: 30_000,
        }
    }
}

impl RunConfig {
    /// Validate bounds. Called once at run start, before any capability
    /// calls; failure aborts the whole run.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(FiggenError::Configuration(
                "max_iterations must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.overall_threshold) {
            return Err(FiggenError::Configuration(format!(
                "overall_threshold must be within [0, 1], got {}",
                self.overall_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.dimension_threshold) {
            return Err(FiggenError::Configuration(format!(
                "dimension_threshold must be within [0, 1], got {}",
                self.dimension_threshold
            )));
        }
        if self.transient_retries == 0 {
            return Err(FiggenError::Configuration(
                "transient_retries must be greater than zero".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(FiggenError::Configuration(
                "worker_count must be greater than zero".to_string(),
            ));
        }
        if self.capability_timeout_ms == 0 {
            return Err(FiggenError::Configuration(
                "capability_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn capability_timeout(&self) -> Duration {
        Duration::from_millis(self.capability_timeout_ms)
    }

    /// SHA-256 fingerprint over the canonical JSON serialization.
    pub fn fingerprint(&self) -> Result<ContentDigest> {
        let bytes = serde_json::to_vec(self)?;
        Ok(ContentDigest::from_bytes(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = RunConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FiggenError::Configuration(_))
        ));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let config = RunConfig {
            overall_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            dimension_threshold: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = RunConfig {
            worker_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fingerprint_stable_and_sensitive() {
        let a = RunConfig::default();
        let b = RunConfig::default();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        let c = RunConfig {
            max_iterations: 5,
            ..Default::default()
        };
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }
}
