//! Core domain types: plans, attempts, critiques, configuration, outcomes.

pub mod attempt;
pub mod config;
pub mod critique;
pub mod error;
pub mod plan;
pub mod run;

pub use attempt::{AttemptStatus, Draft, DraftContext, GenerationAttempt};
pub use config::RunConfig;
pub use critique::{
    CritiqueFeedback, CritiqueIssue, CritiqueReport, Dimension, QualityScores, Recommendation,
};
pub use error::{FiggenError, Result};
pub use plan::{FigureElement, FigurePlanEntry, SectionRange, SectionSet, SourceSpan};
pub use run::{EntryOutcome, EntryStatus, RunOutcome};
