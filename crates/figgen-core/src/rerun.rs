//! Re-execution of a recorded run against live capabilities.
//!
//! A rerun reuses the source run's plan, sections, and configuration snapshot
//! verbatim, so differences between the runs isolate capability behavior.
//! The new run's metadata records the source run id in `rerun_of`.

use std::sync::Arc;

use figgen_state::{RunId, RunLedger, RunMetadata};

use crate::capability::{FigureCritic, FigureGenerator};
use crate::domain::config::RunConfig;
use crate::domain::error::{FiggenError, Result};
use crate::domain::plan::{FigurePlanEntry, SectionSet};
use crate::domain::run::RunOutcome;
use crate::orchestration::{CancelFlag, Orchestrator};

/// Re-execute a recorded run with fresh capability invocations.
pub async fn rerun(
    ledger: Arc<dyn RunLedger>,
    source: &RunId,
    generator: Arc<dyn FigureGenerator>,
    critic: Arc<dyn FigureCritic>,
    cancel: CancelFlag,
) -> Result<RunOutcome> {
    let record = ledger.get_run(source).await?;

    let config: RunConfig = serde_json::from_value(record.config.clone())?;
    let plan: Vec<FigurePlanEntry> = serde_json::from_value(record.plan.clone())?;
    let sections: SectionSet = serde_json::from_value(record.sections.clone())?;

    if plan.is_empty() {
        return Err(FiggenError::Configuration(format!(
            "run {} has an empty plan; nothing to rerun",
            source.0
        )));
    }

    let metadata = RunMetadata {
        paper_path: record.metadata.paper_path.clone(),
        rerun_of: Some(source.0.clone()),
        tags: record.metadata.tags.clone(),
    };

    let orchestrator = Orchestrator::new(generator, critic, ledger, config);
    orchestrator.execute(plan, sections, metadata, cancel).await
}
