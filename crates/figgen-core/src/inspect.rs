//! Post-hoc inspection of recorded runs: per-entry outcomes plus aggregates.

use chrono::{DateTime, Utc};
use figgen_state::{RunId, RunLedger, RunMetadata, RunRecord, RunStatus};
use serde::{Deserialize, Serialize};

use crate::domain::error::{FiggenError, Result};
use crate::domain::run::{EntryOutcome, EntryStatus};

/// Parse the per-entry outcomes out of a terminal run record.
pub fn run_outcomes(record: &RunRecord) -> Result<Vec<EntryOutcome>> {
    let summary = record
        .summary
        .as_ref()
        .ok_or_else(|| FiggenError::MissingOutcome {
            run_id: record.run_id.0.clone(),
        })?;
    Ok(serde_json::from_value(summary.outcomes.clone())?)
}

/// Aggregate statistics over a run's entry outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunAggregate {
    pub total_entries: usize,
    pub accepted_count: usize,
    pub exhausted_count: usize,
    pub failed_count: usize,
    pub cancelled_count: usize,
    /// Mean final score over entries that were critiqued at least once.
    pub avg_final_score: Option<f64>,
    /// Mean traceability coverage over accepted entries.
    pub avg_traceability_coverage: Option<f64>,
    /// Entries that exhausted the iteration bound, in plan order.
    pub max_iterations_hit: Vec<String>,
}

impl RunAggregate {
    pub fn from_outcomes(outcomes: &[EntryOutcome]) -> Self {
        let count = |s: EntryStatus| outcomes.iter().filter(|o| o.status == s).count();

        let scores: Vec<f64> = outcomes.iter().filter_map(|o| o.final_score).collect();
        let coverages: Vec<f64> = outcomes
            .iter()
            .filter_map(|o| o.traceability_coverage())
            .collect();

        RunAggregate {
            total_entries: outcomes.len(),
            accepted_count: count(EntryStatus::Accepted),
            exhausted_count: count(EntryStatus::Exhausted),
            failed_count: count(EntryStatus::Failed),
            cancelled_count: count(EntryStatus::Cancelled),
            avg_final_score: mean(&scores),
            avg_traceability_coverage: mean(&coverages),
            max_iterations_hit: outcomes
                .iter()
                .filter(|o| o.status == EntryStatus::Exhausted)
                .map(|o| o.entry_id.clone())
                .collect(),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Full inspection view of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInspection {
    pub run_id: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub metadata: RunMetadata,
    pub config_digest: String,
    pub event_count: usize,
    pub aggregate: RunAggregate,
    pub outcomes: Vec<EntryOutcome>,
}

/// Load a run and compute its aggregate view.
pub async fn inspect(ledger: &dyn RunLedger, run_id: &RunId) -> Result<RunInspection> {
    let record = ledger.get_run(run_id).await?;
    let events = ledger.get_events(run_id).await?;
    let outcomes = run_outcomes(&record)?;

    Ok(RunInspection {
        run_id: record.run_id.0.clone(),
        status: record.status,
        created_at: record.created_at,
        completed_at: record.completed_at,
        metadata: record.metadata,
        config_digest: record.config_digest.as_str().to_string(),
        event_count: events.len(),
        aggregate: RunAggregate::from_outcomes(&outcomes),
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traceability::{ElementTrace, TraceabilityRecord};

    fn outcome(entry_id: &str, status: EntryStatus, score: Option<f64>) -> EntryOutcome {
        EntryOutcome {
            entry_id: entry_id.to_string(),
            status,
            iterations: 2,
            final_score: score,
            retained_attempt: score.map(|_| 2),
            failed_dimensions: vec![],
            element_count: 3,
            traceability: (status == EntryStatus::Accepted).then(|| TraceabilityRecord {
                entry_id: entry_id.to_string(),
                elements: vec![ElementTrace {
                    element_id: format!("{entry_id}-title"),
                    element_kind: "title".to_string(),
                    label: "t".to_string(),
                    source_spans: vec![],
                }],
            }),
            needs_attention: status != EntryStatus::Accepted,
        }
    }

    #[test]
    fn test_aggregate_counts_and_means() {
        let outcomes = vec![
            outcome("a", EntryStatus::Accepted, Some(0.9)),
            outcome("b", EntryStatus::Exhausted, Some(0.6)),
            outcome("c", EntryStatus::Failed, None),
        ];
        let agg = RunAggregate::from_outcomes(&outcomes);

        assert_eq!(agg.total_entries, 3);
        assert_eq!(agg.accepted_count, 1);
        assert_eq!(agg.exhausted_count, 1);
        assert_eq!(agg.failed_count, 1);
        assert_eq!(agg.max_iterations_hit, vec!["b".to_string()]);
        assert!((agg.avg_final_score.unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_empty_run() {
        let agg = RunAggregate::from_outcomes(&[]);
        assert_eq!(agg.total_entries, 0);
        assert!(agg.avg_final_score.is_none());
        assert!(agg.avg_traceability_coverage.is_none());
    }
}
