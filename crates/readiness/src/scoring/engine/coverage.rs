use std::collections::HashMap;

use super::super::domain::{CoverageLevel, CoverageOverride, QuestionRecord};

/// Resolved coverage per question id, always within `[0, 1]`.
pub type CoverageMap = HashMap<String, f64>;

/// Coverage recorded for a question: the discrete level when present, otherwise
/// the continuous value, otherwise nothing.
pub fn stored_coverage(question: &QuestionRecord) -> f64 {
    let raw = question
        .coverage_level
        .map(CoverageLevel::decimal)
        .or(question.coverage_decimal)
        .unwrap_or(0.0);

    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Build the coverage map for a scoring run. Overrides are snapped to the
/// five-level grid; entries for unknown questions are ignored.
pub fn resolve_coverage(questions: &[QuestionRecord], overrides: &[CoverageOverride]) -> CoverageMap {
    let mut coverage: CoverageMap = questions
        .iter()
        .map(|question| (question.id.clone(), stored_coverage(question)))
        .collect();

    for entry in overrides {
        let Some(level) = entry.resolved_level() else {
            continue;
        };
        if let Some(slot) = coverage.get_mut(&entry.question_id) {
            *slot = level.decimal();
        }
    }

    coverage
}

pub(crate) fn coverage_of(coverage: &CoverageMap, question: &QuestionRecord) -> f64 {
    coverage.get(&question.id).copied().unwrap_or(0.0)
}
