//! figgen-core: orchestration core for the paper-to-figures pipeline.
//!
//! The pipeline takes a figure plan derived from a research paper and drives
//! each planned figure through a generation-critique loop: draft, validate
//! source traceability, critique against quality thresholds, then accept or
//! revise with structured feedback. Every decision is appended to a run
//! ledger (`figgen-state`), which backs deterministic replay, rerun against
//! live capabilities, run-to-run diffing, inspection, and reproducibility
//! audits.
//!
//! Capability seams (`Planner`, `FigureGenerator`, `FigureCritic`) are async
//! traits; `heuristics` provides deterministic local implementations.

pub mod audit;
pub mod capability;
pub mod diff;
pub mod domain;
pub mod events;
pub mod heuristics;
pub mod inspect;
pub mod obs;
pub mod orchestration;
pub mod policy;
pub mod recording;
pub mod replay;
pub mod rerun;
pub mod telemetry;
pub mod traceability;

pub use capability::{FigureCritic, FigureGenerator, Planner, StaticPlanner};
pub use domain::attempt::{AttemptStatus, Draft, DraftContext, GenerationAttempt};
pub use domain::config::RunConfig;
pub use domain::critique::{
    CritiqueFeedback, CritiqueIssue, CritiqueReport, Dimension, QualityScores, Recommendation,
};
pub use domain::error::{FiggenError, Result};
pub use domain::plan::{FigureElement, FigurePlanEntry, SectionRange, SectionSet, SourceSpan};
pub use domain::run::{EntryOutcome, EntryStatus, RunOutcome};
pub use orchestration::{CancelFlag, Orchestrator};
pub use policy::{Decision, Thresholds};
pub use traceability::{validate_elements, SpanViolation, TraceabilityRecord};
