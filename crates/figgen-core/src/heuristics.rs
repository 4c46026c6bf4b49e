//! Built-in deterministic capability providers.
//!
//! `HeuristicGenerator` renders a plain mock SVG from the plan entry;
//! `HeuristicCritic` scores drafts from SVG text features. Both are
//! deterministic for identical inputs, which makes them usable for
//! capability-level reproducibility checks as well as for the CLI default
//! path when no external rendering service is configured.

use async_trait::async_trait;

use crate::capability::{FigureCritic, FigureGenerator};
use crate::domain::attempt::{Draft, DraftContext};
use crate::domain::critique::{
    CritiqueIssue, CritiqueReport, Dimension, QualityScores, Recommendation,
};
use crate::domain::error::Result;
use crate::domain::plan::{FigureElement, FigurePlanEntry, SectionSet};

/// Deterministic local generator producing mock SVG output.
#[derive(Debug, Default)]
pub struct HeuristicGenerator;

impl HeuristicGenerator {
    pub fn new() -> Self {
        HeuristicGenerator
    }

    fn render_svg(entry: &FigurePlanEntry, context: &DraftContext) -> String {
        let mut body = String::new();
        body.push_str(
            "<rect x='40' y='40' width='720' height='370' fill='white' stroke='black'/>",
        );
        body.push_str(&format!(
            "<text x='60' y='90' font-family='Times New Roman' font-size='24'>{}</text>",
            entry.title
        ));
        body.push_str("<line x1='60' y1='120' x2='740' y2='120' stroke='black'/>");
        body.push_str(
            "<text x='60' y='170' font-family='Times New Roman' font-size='16'>\
             Figgen draft output</text>",
        );

        // Revisions render one label per claimed span and note the targeted
        // dimensions, so redrafts are visibly (and measurably) richer.
        if context.iteration > 1 {
            let mut y = 210;
            for span in &entry.source_spans {
                body.push_str(&format!(
                    "<text x='80' y='{y}' font-family='Times New Roman' font-size='14'>\
                     {}: {}</text>",
                    span.section, span.quote
                ));
                y += 30;
            }
            for feedback in &context.feedback {
                for dimension in &feedback.failed_dimensions {
                    body.push_str(&format!(
                        "<text x='80' y='{y}' font-family='Times New Roman' font-size='12'>\
                         revised for {dimension}</text>"
                    ));
                    y += 24;
                }
            }
        }

        format!(
            "<svg xmlns='http://www.w3.org/2000/svg' width='800' height='450' \
             viewBox='0 0 800 450'>{body}</svg>"
        )
    }

    fn build_elements(entry: &FigurePlanEntry) -> Vec<FigureElement> {
        let mut elements = vec![FigureElement {
            id: format!("{}-title", entry.entry_id),
            kind: "text".to_string(),
            label: entry.title.clone(),
            source_spans: entry.source_spans.clone(),
        }];
        for (i, span) in entry.source_spans.iter().enumerate() {
            elements.push(FigureElement {
                id: format!("{}-claim-{}", entry.entry_id, i + 1),
                kind: "text".to_string(),
                label: span.quote.clone(),
                source_spans: vec![span.clone()],
            });
        }
        elements
    }
}

#[async_trait]
impl FigureGenerator for HeuristicGenerator {
    async fn generate(&self, entry: &FigurePlanEntry, context: &DraftContext) -> Result<Draft> {
        Ok(Draft {
            svg: Self::render_svg(entry, context),
            elements: Self::build_elements(entry),
        })
    }
}

/// Deterministic local critic scoring the four quality dimensions from SVG
/// text features. Thresholds shape the issue list and the advisory
/// recommendation; the critique policy remains the authoritative decision.
#[derive(Debug)]
pub struct HeuristicCritic {
    overall_threshold: f64,
    dimension_threshold: f64,
}

impl HeuristicCritic {
    pub fn new(overall_threshold: f64, dimension_threshold: f64) -> Self {
        HeuristicCritic {
            overall_threshold,
            dimension_threshold,
        }
    }

    fn score_faithfulness(
        svg: &str,
        entry: &FigurePlanEntry,
        sections: &SectionSet,
    ) -> f64 {
        let mut score: f64 = 0.35;
        if !entry.source_spans.is_empty() {
            score += 0.3;
        }
        if entry.description.trim().len() > 20 {
            score += 0.1;
        }
        if entry.kind == "results_plot" && sections.get("results").is_some() {
            score += 0.15;
        }
        if svg.to_lowercase().contains("figgen draft output") {
            score += 0.05;
        }
        score.min(1.0)
    }

    fn score_readability(svg: &str) -> f64 {
        let mut score: f64 = 0.3;
        let text_count = svg.matches("<text").count();
        if text_count >= 2 {
            score += 0.25;
        } else if text_count == 1 {
            score += 0.15;
        }
        if ["<rect", "<path", "<line", "<circle"]
            .iter()
            .any(|tag| svg.contains(tag))
        {
            score += 0.2;
        }
        if svg.contains("font-size") {
            score += 0.1;
        }
        if svg.contains("viewBox") {
            score += 0.1;
        }
        score.min(1.0)
    }

    fn score_conciseness(svg: &str) -> f64 {
        let mut score: f64 = 0.5;
        let length = svg.len();
        if (250..=9000).contains(&length) {
            score += 0.25;
        } else if length > 12_000 {
            score -= 0.2;
        } else {
            score -= 0.1;
        }
        let primitive_count: usize = ["<rect", "<path", "<line", "<circle", "<polygon"]
            .iter()
            .map(|tag| svg.matches(tag).count())
            .sum();
        if (1..=40).contains(&primitive_count) {
            score += 0.2;
        } else if primitive_count > 120 {
            score -= 0.2;
        }
        score.clamp(0.0, 1.0)
    }

    fn score_aesthetics(svg: &str) -> f64 {
        let mut score: f64 = 0.35;
        if svg.contains("viewBox") && svg.contains("width") && svg.contains("height") {
            score += 0.2;
        }
        if svg.contains("stroke") {
            score += 0.15;
        }
        if svg.contains("fill") {
            score += 0.15;
        }
        if svg.contains("font-family") {
            score += 0.1;
        }
        score.min(1.0)
    }
}

#[async_trait]
impl FigureCritic for HeuristicCritic {
    async fn critique(
        &self,
        entry: &FigurePlanEntry,
        draft: &Draft,
        attempt: u32,
        sections: &SectionSet,
    ) -> Result<CritiqueReport> {
        let scores = QualityScores {
            faithfulness: Self::score_faithfulness(&draft.svg, entry, sections),
            readability: Self::score_readability(&draft.svg),
            conciseness: Self::score_conciseness(&draft.svg),
            aesthetics: Self::score_aesthetics(&draft.svg),
        };
        let overall = scores.overall();

        let failed: Vec<Dimension> = Dimension::ALL
            .iter()
            .copied()
            .filter(|d| scores.get(*d) < self.dimension_threshold)
            .collect();

        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        for dimension in &failed {
            match dimension {
                Dimension::Readability => {
                    issues.push(CritiqueIssue::general(
                        "Readability below threshold: labels or visual structure are insufficient.",
                    ));
                    recommendations.push(
                        "Add clear labels, improve hierarchy, and avoid dense overlaps."
                            .to_string(),
                    );
                }
                Dimension::Faithfulness => {
                    issues.push(CritiqueIssue::general(
                        "Faithfulness below threshold: figure support from source spans is weak.",
                    ));
                    recommendations.push(
                        "Tie every key label and relation to explicit source text spans."
                            .to_string(),
                    );
                }
                Dimension::Conciseness => {
                    issues.push(CritiqueIssue::general(
                        "Conciseness below threshold: figure is either too sparse or overloaded.",
                    ));
                    recommendations.push(
                        "Keep only essential elements and remove decorative clutter.".to_string(),
                    );
                }
                Dimension::Aesthetics => {
                    issues.push(CritiqueIssue::general(
                        "Aesthetics below threshold: layout balance and presentation need refinement.",
                    ));
                    recommendations.push(
                        "Improve alignment, spacing, and consistent visual encoding.".to_string(),
                    );
                }
            }
        }

        let accept = overall >= self.overall_threshold && failed.is_empty();
        if !accept {
            recommendations
                .push("Revise layout to improve clarity and alignment with the paper.".to_string());
        }

        Ok(CritiqueReport {
            entry_id: entry.entry_id.clone(),
            attempt,
            scores,
            overall: (overall.min(1.0) * 1000.0).round() / 1000.0,
            issues,
            recommendations,
            recommendation: if accept {
                Recommendation::Accept
            } else {
                Recommendation::Revise
            },
        })
    }
}
