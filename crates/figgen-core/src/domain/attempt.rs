//! Generation attempts: one immutable record per drafting iteration.

use figgen_state::ContentDigest;
use serde::{Deserialize, Serialize};

use crate::domain::critique::CritiqueFeedback;
use crate::domain::plan::FigureElement;

/// Lifecycle state of a single attempt. New iterations produce new attempts,
/// never edits; status transitions are recorded as ledger events, not edits
/// to the drafted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Drafted but not yet validated or critiqued.
    Pending,
    /// Passed traceability validation and went to critique.
    Produced,
    /// Failed traceability validation.
    Failed,
}

/// Input context handed to the generation capability for one iteration.
///
/// `feedback` is an append-only history of all prior critique feedback for
/// this entry, oldest first; it is recorded verbatim in the ledger so replay
/// can reconstruct exactly what the generator saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftContext {
    /// Quality iteration index (1-based).
    pub iteration: u32,
    pub feedback: Vec<CritiqueFeedback>,
}

impl DraftContext {
    pub fn first() -> Self {
        DraftContext {
            iteration: 1,
            feedback: Vec::new(),
        }
    }
}

/// Output of one generation capability call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub svg: String,
    pub elements: Vec<FigureElement>,
}

impl Draft {
    pub fn svg_digest(&self) -> ContentDigest {
        ContentDigest::from_bytes(self.svg.as_bytes())
    }
}

/// Immutable record of one drafting iteration, as written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationAttempt {
    /// 1-based index within the entry.
    pub index: u32,
    pub context: DraftContext,
    pub svg_digest: ContentDigest,
    pub elements: Vec<FigureElement>,
    pub status: AttemptStatus,
}

impl GenerationAttempt {
    /// Record a freshly drafted attempt, pending validation.
    pub fn drafted(index: u32, context: DraftContext, draft: &Draft) -> Self {
        GenerationAttempt {
            index,
            context,
            svg_digest: draft.svg_digest(),
            elements: draft.elements.clone(),
            status: AttemptStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_digest_is_content_derived() {
        let a = Draft {
            svg: "<svg/>".to_string(),
            elements: vec![],
        };
        let b = Draft {
            svg: "<svg/>".to_string(),
            elements: vec![],
        };
        assert_eq!(a.svg_digest(), b.svg_digest());

        let c = Draft {
            svg: "<svg></svg>".to_string(),
            elements: vec![],
        };
        assert_ne!(a.svg_digest(), c.svg_digest());
    }

    #[test]
    fn test_drafted_attempt_starts_pending() {
        let draft = Draft {
            svg: "<svg/>".to_string(),
            elements: vec![],
        };
        let attempt = GenerationAttempt::drafted(2, DraftContext::first(), &draft);
        assert_eq!(attempt.index, 2);
        assert_eq!(attempt.status, AttemptStatus::Pending);
        assert_eq!(attempt.svg_digest, draft.svg_digest());
    }
}
