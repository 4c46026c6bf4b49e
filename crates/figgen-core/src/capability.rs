//! Capability contracts: the narrow request/response interfaces behind which
//! the planner, generator, and critic live.
//!
//! Any concrete implementation — local heuristic, remote model call — is
//! interchangeable behind these traits; the orchestrator is isolated from
//! the latency and non-determinism of the underlying provider. Capability
//! implementations signal infrastructure failures with
//! `FiggenError::CapabilityUnavailable`; the orchestrator adds timeouts on
//! top and treats them identically.

use async_trait::async_trait;

use crate::domain::attempt::{Draft, DraftContext};
use crate::domain::critique::CritiqueReport;
use crate::domain::error::Result;
use crate::domain::plan::{FigurePlanEntry, SectionSet};

/// Produces the ordered figure plan from extracted document sections.
/// Consulted exactly once, at run creation.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, sections: &SectionSet) -> Result<Vec<FigurePlanEntry>>;
}

/// Drafts one figure from a plan entry and the accumulated feedback context.
#[async_trait]
pub trait FigureGenerator: Send + Sync {
    async fn generate(&self, entry: &FigurePlanEntry, context: &DraftContext) -> Result<Draft>;
}

/// Evaluates one draft against its plan entry and the source sections.
#[async_trait]
pub trait FigureCritic: Send + Sync {
    async fn critique(
        &self,
        entry: &FigurePlanEntry,
        draft: &Draft,
        attempt: u32,
        sections: &SectionSet,
    ) -> Result<CritiqueReport>;
}

/// Planner backed by a preloaded plan. Used by the CLI when a plan file is
/// supplied and by rerun, which reuses the source run's recorded plan.
pub struct StaticPlanner {
    entries: Vec<FigurePlanEntry>,
}

impl StaticPlanner {
    pub fn new(entries: Vec<FigurePlanEntry>) -> Self {
        StaticPlanner { entries }
    }
}

#[async_trait]
impl Planner for StaticPlanner {
    async fn plan(&self, _sections: &SectionSet) -> Result<Vec<FigurePlanEntry>> {
        Ok(self.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_planner_returns_preloaded_entries() {
        let entry = FigurePlanEntry {
            entry_id: "fig-1".to_string(),
            title: "System overview".to_string(),
            kind: "system_architecture".to_string(),
            order: 1,
            abstraction_level: "high".to_string(),
            description: "Overview of the pipeline".to_string(),
            justification: "Readers need the big picture first".to_string(),
            source_spans: vec![],
        };
        let planner = StaticPlanner::new(vec![entry.clone()]);
        let plan = planner.plan(&SectionSet::new()).await.unwrap();
        assert_eq!(plan, vec![entry]);
    }
}
