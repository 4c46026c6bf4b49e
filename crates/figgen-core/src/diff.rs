//! Structured comparison of two recorded runs.
//!
//! Entries are aligned by id; the report lists entries added, removed, or
//! modified between the runs, plus deltas over run-level metrics. Two runs
//! with no changes compare `identical` — in particular a run diffed against
//! itself.

use figgen_state::{RunId, RunLedger};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::error::Result;
use crate::domain::run::EntryOutcome;
use crate::inspect::{run_outcomes, RunAggregate};

/// One field that differs between the two runs' versions of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: String,
    pub left: serde_json::Value,
    pub right: serde_json::Value,
}

/// Per-entry difference between the two runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum EntryChange {
    /// Present only in the second run.
    Added { entry_id: String },
    /// Present only in the first run.
    Removed { entry_id: String },
    /// Present in both with differing outcome fields.
    Modified {
        entry_id: String,
        fields: Vec<FieldDiff>,
    },
}

/// Delta over one run-level metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub left: f64,
    pub right: f64,
    pub delta: f64,
}

impl MetricDelta {
    fn new(left: f64, right: f64) -> Self {
        MetricDelta {
            left,
            right,
            delta: right - left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffMetrics {
    pub accepted_count: MetricDelta,
    pub avg_final_score: MetricDelta,
    pub avg_traceability_coverage: MetricDelta,
}

/// Full diff report between two runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub run_id_1: String,
    pub run_id_2: String,
    /// True iff the entry sets align exactly with no field differences.
    pub identical: bool,
    pub changes: Vec<EntryChange>,
    pub metrics: DiffMetrics,
}

/// Load both runs' outcomes and compute their diff.
pub async fn diff_runs(
    ledger: &dyn RunLedger,
    run_id_1: &RunId,
    run_id_2: &RunId,
) -> Result<DiffReport> {
    let left = run_outcomes(&ledger.get_run(run_id_1).await?)?;
    let right = run_outcomes(&ledger.get_run(run_id_2).await?)?;
    Ok(diff_outcomes(&run_id_1.0, &run_id_2.0, &left, &right))
}

/// Pure diff over two outcome lists.
pub fn diff_outcomes(
    run_id_1: &str,
    run_id_2: &str,
    left: &[EntryOutcome],
    right: &[EntryOutcome],
) -> DiffReport {
    let mut changes = Vec::new();

    for l in left {
        match right.iter().find(|r| r.entry_id == l.entry_id) {
            None => changes.push(EntryChange::Removed {
                entry_id: l.entry_id.clone(),
            }),
            Some(r) => {
                let fields = entry_field_diffs(l, r);
                if !fields.is_empty() {
                    changes.push(EntryChange::Modified {
                        entry_id: l.entry_id.clone(),
                        fields,
                    });
                }
            }
        }
    }
    for r in right {
        if !left.iter().any(|l| l.entry_id == r.entry_id) {
            changes.push(EntryChange::Added {
                entry_id: r.entry_id.clone(),
            });
        }
    }

    let left_agg = RunAggregate::from_outcomes(left);
    let right_agg = RunAggregate::from_outcomes(right);
    let metrics = DiffMetrics {
        accepted_count: MetricDelta::new(
            left_agg.accepted_count as f64,
            right_agg.accepted_count as f64,
        ),
        avg_final_score: MetricDelta::new(
            left_agg.avg_final_score.unwrap_or(0.0),
            right_agg.avg_final_score.unwrap_or(0.0),
        ),
        avg_traceability_coverage: MetricDelta::new(
            left_agg.avg_traceability_coverage.unwrap_or(0.0),
            right_agg.avg_traceability_coverage.unwrap_or(0.0),
        ),
    };

    DiffReport {
        run_id_1: run_id_1.to_string(),
        run_id_2: run_id_2.to_string(),
        identical: changes.is_empty(),
        changes,
        metrics,
    }
}

fn entry_field_diffs(left: &EntryOutcome, right: &EntryOutcome) -> Vec<FieldDiff> {
    let mut fields = Vec::new();
    let mut push = |field: &str, l: serde_json::Value, r: serde_json::Value| {
        if l != r {
            fields.push(FieldDiff {
                field: field.to_string(),
                left: l,
                right: r,
            });
        }
    };

    push("status", json!(left.status), json!(right.status));
    push("iterations", json!(left.iterations), json!(right.iterations));
    push(
        "final_score",
        json!(left.final_score),
        json!(right.final_score),
    );
    push(
        "element_count",
        json!(left.element_count),
        json!(right.element_count),
    );
    push(
        "traceability_coverage",
        json!(left.traceability_coverage()),
        json!(right.traceability_coverage()),
    );
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::EntryStatus;

    fn outcome(entry_id: &str, status: EntryStatus, score: f64) -> EntryOutcome {
        EntryOutcome {
            entry_id: entry_id.to_string(),
            status,
            iterations: 1,
            final_score: Some(score),
            retained_attempt: Some(1),
            failed_dimensions: vec![],
            element_count: 2,
            traceability: None,
            needs_attention: status != EntryStatus::Accepted,
        }
    }

    #[test]
    fn test_self_diff_is_identical() {
        let outcomes = vec![
            outcome("a", EntryStatus::Accepted, 0.9),
            outcome("b", EntryStatus::Exhausted, 0.6),
        ];
        let report = diff_outcomes("run-1", "run-1", &outcomes, &outcomes);

        assert!(report.identical);
        assert!(report.changes.is_empty());
        assert_eq!(report.metrics.accepted_count.delta, 0.0);
        assert_eq!(report.metrics.avg_final_score.delta, 0.0);
    }

    #[test]
    fn test_added_removed_modified() {
        let left = vec![
            outcome("a", EntryStatus::Accepted, 0.9),
            outcome("b", EntryStatus::Exhausted, 0.6),
        ];
        let right = vec![
            outcome("a", EntryStatus::Accepted, 0.95),
            outcome("c", EntryStatus::Accepted, 0.8),
        ];
        let report = diff_outcomes("run-1", "run-2", &left, &right);

        assert!(!report.identical);
        assert_eq!(report.changes.len(), 3);
        assert!(matches!(
            &report.changes[0],
            EntryChange::Modified { entry_id, fields }
                if entry_id == "a" && fields.iter().any(|f| f.field == "final_score")
        ));
        assert!(matches!(
            &report.changes[1],
            EntryChange::Removed { entry_id } if entry_id == "b"
        ));
        assert!(matches!(
            &report.changes[2],
            EntryChange::Added { entry_id } if entry_id == "c"
        ));
        assert_eq!(report.metrics.accepted_count.delta, 1.0);
    }
}
