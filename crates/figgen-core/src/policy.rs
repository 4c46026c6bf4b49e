//! Critique policy: the pure accept/revise decision.
//!
//! Acceptance requires the overall score to meet the overall threshold AND
//! every dimension to meet the per-dimension threshold. Deterministic by
//! construction — no state, no clock, no randomness — which is what lets
//! replay reproduce decisions from the ledger alone.

use serde::{Deserialize, Serialize};

use crate::domain::critique::{CritiqueReport, Dimension};

/// Acceptance thresholds, both in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub overall: f64,
    pub dimension: f64,
}

/// Outcome of applying the policy to one critique report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Revise { failed_dimensions: Vec<Dimension> },
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Revise { .. } => "revise",
        }
    }
}

/// Decide accept/revise for a critique report.
///
/// Accept iff `report.overall >= thresholds.overall` and every dimension
/// score `>= thresholds.dimension` (boundary equality accepts). Otherwise
/// revise, carrying the dimensions that failed so the loop can surface them
/// as feedback.
pub fn decide(report: &CritiqueReport, thresholds: &Thresholds) -> Decision {
    let failed_dimensions: Vec<Dimension> = Dimension::ALL
        .iter()
        .copied()
        .filter(|d| report.scores.get(*d) < thresholds.dimension)
        .collect();

    if report.overall >= thresholds.overall && failed_dimensions.is_empty() {
        Decision::Accept
    } else {
        Decision::Revise { failed_dimensions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::critique::{QualityScores, Recommendation};

    fn report(scores: QualityScores) -> CritiqueReport {
        CritiqueReport {
            entry_id: "fig-1".to_string(),
            attempt: 1,
            scores,
            overall: scores.overall(),
            issues: vec![],
            recommendations: vec![],
            recommendation: Recommendation::Revise,
        }
    }

    #[test]
    fn test_accept_when_all_thresholds_met() {
        let t = Thresholds {
            overall: 0.75,
            dimension: 0.55,
        };
        let decision = decide(&report(QualityScores::uniform(0.8)), &t);
        assert!(decision.is_accept());
    }

    #[test]
    fn test_boundary_equality_accepts() {
        // Both thresholds hit exactly: >= means accept.
        let t = Thresholds {
            overall: 0.75,
            dimension: 0.75,
        };
        let decision = decide(&report(QualityScores::uniform(0.75)), &t);
        assert!(decision.is_accept());
    }

    #[test]
    fn test_overall_below_threshold_revises() {
        let t = Thresholds {
            overall: 0.85,
            dimension: 0.5,
        };
        let decision = decide(&report(QualityScores::uniform(0.8)), &t);
        assert!(matches!(
            decision,
            Decision::Revise { ref failed_dimensions } if failed_dimensions.is_empty()
        ));
    }

    #[test]
    fn test_single_failing_dimension_revises_despite_high_overall() {
        let t = Thresholds {
            overall: 0.6,
            dimension: 0.5,
        };
        let scores = QualityScores {
            faithfulness: 1.0,
            readability: 1.0,
            conciseness: 1.0,
            aesthetics: 0.4,
        };
        match decide(&report(scores), &t) {
            Decision::Revise { failed_dimensions } => {
                assert_eq!(failed_dimensions, vec![Dimension::Aesthetics]);
            }
            Decision::Accept => panic!("should revise on failing dimension"),
        }
    }

    #[test]
    fn test_all_failing_dimensions_listed() {
        let t = Thresholds {
            overall: 0.9,
            dimension: 0.7,
        };
        let scores = QualityScores {
            faithfulness: 0.6,
            readability: 0.9,
            conciseness: 0.5,
            aesthetics: 0.9,
        };
        match decide(&report(scores), &t) {
            Decision::Revise { failed_dimensions } => {
                assert_eq!(
                    failed_dimensions,
                    vec![Dimension::Faithfulness, Dimension::Conciseness]
                );
            }
            Decision::Accept => panic!("should revise"),
        }
    }

    #[test]
    fn test_determinism_same_inputs_same_decision() {
        let t = Thresholds {
            overall: 0.75,
            dimension: 0.55,
        };
        let r = report(QualityScores::uniform(0.74999));
        for _ in 0..10 {
            assert_eq!(decide(&r, &t), decide(&r, &t));
        }
    }
}
