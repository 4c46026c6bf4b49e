//! Critique reports: scored evaluations of generation attempts.

use serde::{Deserialize, Serialize};

/// The four quality dimensions every critique scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Faithfulness,
    Readability,
    Conciseness,
    Aesthetics,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Faithfulness,
        Dimension::Readability,
        Dimension::Conciseness,
        Dimension::Aesthetics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Faithfulness => "faithfulness",
            Dimension::Readability => "readability",
            Dimension::Conciseness => "conciseness",
            Dimension::Aesthetics => "aesthetics",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-dimension scores in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub faithfulness: f64,
    pub readability: f64,
    pub conciseness: f64,
    pub aesthetics: f64,
}

impl QualityScores {
    /// Overall score: arithmetic mean of the four dimensions.
    pub fn overall(&self) -> f64 {
        (self.faithfulness + self.readability + self.conciseness + self.aesthetics) / 4.0
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Faithfulness => self.faithfulness,
            Dimension::Readability => self.readability,
            Dimension::Conciseness => self.conciseness,
            Dimension::Aesthetics => self.aesthetics,
        }
    }

    /// Uniform scores across all four dimensions (test and fake helper).
    pub fn uniform(value: f64) -> Self {
        QualityScores {
            faithfulness: value,
            readability: value,
            conciseness: value,
            aesthetics: value,
        }
    }
}

/// One issue raised by a critique, optionally pointing at a specific element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueIssue {
    pub element_id: Option<String>,
    pub description: String,
}

impl CritiqueIssue {
    pub fn general(description: impl Into<String>) -> Self {
        CritiqueIssue {
            element_id: None,
            description: description.into(),
        }
    }

    pub fn on_element(element_id: impl Into<String>, description: impl Into<String>) -> Self {
        CritiqueIssue {
            element_id: Some(element_id.into()),
            description: description.into(),
        }
    }
}

/// The critic's own recommendation. Advisory only — the critique policy is
/// the authoritative accept/revise decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Accept,
    Revise,
}

/// Scored evaluation of one generation attempt. Immutable once produced;
/// tied 1:1 to the attempt it evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueReport {
    pub entry_id: String,
    /// Attempt index this report evaluates (1-based).
    pub attempt: u32,
    pub scores: QualityScores,
    /// Overall score, equal to `scores.overall()` at construction time.
    pub overall: f64,
    pub issues: Vec<CritiqueIssue>,
    pub recommendations: Vec<String>,
    pub recommendation: Recommendation,
}

/// Structured feedback folded into the next drafting iteration's input
/// context. Carries the score and failed dimensions, not just a pass flag,
/// so the generator can target specific weaknesses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueFeedback {
    /// Attempt this feedback was derived from.
    pub attempt: u32,
    pub previous_score: f64,
    pub failed_dimensions: Vec<Dimension>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl CritiqueFeedback {
    /// Derive feedback from a revise-decided critique report.
    pub fn from_report(report: &CritiqueReport, failed_dimensions: Vec<Dimension>) -> Self {
        CritiqueFeedback {
            attempt: report.attempt,
            previous_score: report.overall,
            failed_dimensions,
            issues: report.issues.iter().map(|i| i.description.clone()).collect(),
            recommendations: report.recommendations.clone(),
        }
    }

    /// Synthetic feedback for a traceability failure: the attempt never
    /// reached the critic, so it scores zero and names the broken elements.
    pub fn traceability(attempt: u32, issues: Vec<String>) -> Self {
        CritiqueFeedback {
            attempt,
            previous_score: 0.0,
            failed_dimensions: vec![Dimension::Faithfulness],
            issues,
            recommendations: vec![
                "Tie every element to a valid source span inside the extracted sections."
                    .to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_is_mean() {
        let scores = QualityScores {
            faithfulness: 0.8,
            readability: 0.6,
            conciseness: 1.0,
            aesthetics: 0.6,
        };
        assert!((scores.overall() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_dimension_accessor_matches_fields() {
        let scores = QualityScores {
            faithfulness: 0.1,
            readability: 0.2,
            conciseness: 0.3,
            aesthetics: 0.4,
        };
        for (dim, expected) in Dimension::ALL.iter().zip([0.1, 0.2, 0.3, 0.4]) {
            assert_eq!(scores.get(*dim), expected);
        }
    }

    #[test]
    fn test_dimension_serializes_snake_case() {
        let json = serde_json::to_string(&Dimension::Faithfulness).unwrap();
        assert_eq!(json, "\"faithfulness\"");
    }
}
