//! Reproducibility audit over a recorded run.
//!
//! Cross-checks the run record, its summary, and its event stream against
//! each other. Soft mode reports failing checks; hard mode additionally
//! returns an error when any check fails.

use figgen_state::{RunId, RunLedger, RunStatus};
use serde::{Deserialize, Serialize};

use crate::domain::error::{FiggenError, Result};
use crate::domain::run::EntryStatus;
use crate::inspect::run_outcomes;
use crate::replay::{self, verify_config_digest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditMode {
    /// Report failures without erroring.
    Soft,
    /// Any failing check is an error.
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCheck {
    pub check_id: String,
    pub description: String,
    pub passed: bool,
    pub message: Option<String>,
}

impl AuditCheck {
    fn new(check_id: &str, description: &str, passed: bool, message: Option<String>) -> Self {
        AuditCheck {
            check_id: check_id.to_string(),
            description: description.to_string(),
            passed,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub run_id: String,
    pub mode: AuditMode,
    pub checks: Vec<AuditCheck>,
    pub passed: bool,
}

impl AuditReport {
    pub fn failures(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }
}

/// Audit one run's record, summary, and ledger for mutual consistency.
pub async fn audit(ledger: &dyn RunLedger, run_id: &RunId, mode: AuditMode) -> Result<AuditReport> {
    let record = ledger.get_run(run_id).await?;
    let events = ledger.get_events(run_id).await?;
    let mut checks = Vec::new();

    checks.push(AuditCheck::new(
        "run_terminal",
        "run has reached a terminal status",
        record.status != RunStatus::Running,
        (record.status == RunStatus::Running).then(|| "run is still running".to_string()),
    ));

    checks.push(AuditCheck::new(
        "summary_present",
        "run record carries a terminal summary",
        record.summary.is_some(),
        record.summary.is_none().then(|| "no summary recorded".to_string()),
    ));

    if let Some(summary) = &record.summary {
        let stored = summary.total_events;
        let actual = events.len() as u64;
        checks.push(AuditCheck::new(
            "event_count",
            "summary event count matches the ledger",
            stored == actual,
            (stored != actual).then(|| format!("summary says {stored}, ledger has {actual}")),
        ));
    }

    match verify_config_digest(&record) {
        Ok(()) => checks.push(AuditCheck::new(
            "config_digest",
            "stored config digest matches a recompute",
            true,
            None,
        )),
        Err(e) => checks.push(AuditCheck::new(
            "config_digest",
            "stored config digest matches a recompute",
            false,
            Some(e.to_string()),
        )),
    }

    let replayed = replay::replay(ledger, run_id).await?;
    checks.push(AuditCheck::new(
        "replay_consistent",
        "replayed entry states agree with the persisted summary",
        replayed.consistent,
        (!replayed.consistent).then(|| "ledger and summary disagree".to_string()),
    ));

    if record.summary.is_some() {
        let outcomes = run_outcomes(&record)?;
        let uncovered: Vec<String> = outcomes
            .iter()
            .filter(|o| {
                o.status == EntryStatus::Accepted && o.traceability_coverage() != Some(1.0)
            })
            .map(|o| o.entry_id.clone())
            .collect();
        checks.push(AuditCheck::new(
            "accepted_traceability",
            "every accepted entry has full traceability coverage",
            uncovered.is_empty(),
            (!uncovered.is_empty()).then(|| format!("uncovered entries: {}", uncovered.join(", "))),
        ));
    }

    let report = AuditReport {
        run_id: run_id.0.clone(),
        mode,
        passed: checks.iter().all(|c| c.passed),
        checks,
    };

    if mode == AuditMode::Hard && !report.passed {
        return Err(FiggenError::AuditFailed {
            run_id: run_id.0.clone(),
            failures: report.failures(),
        });
    }
    Ok(report)
}
