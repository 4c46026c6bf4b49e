//! Figure plan entries and the source-span universe they reference.
//!
//! A plan is produced once by the planner capability at run creation and is
//! immutable for the life of the run. Every visual element a generator emits
//! claims one or more [`SourceSpan`]s, which the traceability validator
//! resolves against the run's [`SectionSet`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Half-open character range `[start, end)` into a named extracted section,
/// with the quoted text for human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub section: String,
    pub start: usize,
    pub end: usize,
    pub quote: String,
}

/// Character range covered by one extracted section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRange {
    pub start: usize,
    pub end: usize,
}

/// The valid span universe for a run: named sections each covering a
/// character range of the source document. Supplied by the external section
/// extractor; the validator rejects any span that falls outside these ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionSet {
    sections: BTreeMap<String, SectionRange>,
}

impl SectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, start: usize, end: usize) {
        self.sections.insert(name.into(), SectionRange { start, end });
    }

    pub fn get(&self, name: &str) -> Option<&SectionRange> {
        self.sections.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

impl FromIterator<(String, SectionRange)> for SectionSet {
    fn from_iter<I: IntoIterator<Item = (String, SectionRange)>>(iter: I) -> Self {
        SectionSet {
            sections: iter.into_iter().collect(),
        }
    }
}

/// One planned figure within a run.
///
/// Created once during planning, never mutated during generation/critique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigurePlanEntry {
    /// Stable identifier, unique within the run (e.g. "fig-architecture").
    pub entry_id: String,
    /// Human-readable title used in captions and mock output.
    pub title: String,
    /// Figure type (e.g. "system_architecture", "results_plot").
    pub kind: String,
    /// Position in plan order; entries are processed in this order.
    pub order: u32,
    /// Abstraction level hint for the generator ("high", "medium", "low").
    pub abstraction_level: String,
    /// What the figure should show.
    pub description: String,
    /// Why this figure earns its place in the paper.
    pub justification: String,
    /// Source-text spans this figure is planned against.
    pub source_spans: Vec<SourceSpan>,
}

/// One element of a generated figure's metadata. Each element claims the
/// source spans it visualizes; acceptance requires every claim to validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureElement {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub source_spans: Vec<SourceSpan>,
}
