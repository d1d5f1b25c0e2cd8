use std::collections::HashMap;

use super::super::domain::{round_to, CoverageLevel, Dimension, PrioritizedQuestion, QuestionRecord};
use super::coverage::{coverage_of, CoverageMap};

/// Capped ranking plus the score reachable by completing every listed question.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedQuestions {
    pub questions: Vec<PrioritizedQuestion>,
    pub max_potential_score: f64,
}

struct Candidate<'a> {
    question: &'a QuestionRecord,
    dimension_key: &'a str,
    dimension_name: String,
    coverage: f64,
    lift: f64,
}

/// Rank under-covered questions by expected score lift:
/// `ΔScore = 100 · W_d · S_i · (1 − C_i) / (Σ_d S + ε)`.
///
/// The severity sum spans every question of the dimension, covered or not, so
/// all candidates in a dimension share one denominator. Ties keep input order.
pub fn rank_questions(
    questions: &[QuestionRecord],
    dimensions: &[Dimension],
    coverage: &CoverageMap,
    current_score: f64,
    limit: usize,
    epsilon: f64,
) -> RankedQuestions {
    let catalog: HashMap<&str, &Dimension> = dimensions
        .iter()
        .map(|dimension| (dimension.key.as_str(), dimension))
        .collect();

    let mut severity_sums: HashMap<&str, f64> = HashMap::new();
    for question in questions {
        if let Some(key) = question.dimension_key.as_deref() {
            *severity_sums.entry(key).or_insert(0.0) += question.severity();
        }
    }

    let mut candidates: Vec<Candidate<'_>> = questions
        .iter()
        .filter_map(|question| {
            let dimension_key = question.dimension_key.as_deref()?;
            let current = coverage_of(coverage, question);
            if current >= 1.0 {
                return None;
            }

            let dimension = catalog.get(dimension_key);
            let weight = dimension.map(|dimension| dimension.weight).unwrap_or(0.0);
            let severity_sum = severity_sums.get(dimension_key).copied().unwrap_or(0.0);
            let lift =
                100.0 * weight * question.severity() * (1.0 - current) / (severity_sum + epsilon);

            Some(Candidate {
                question,
                dimension_key,
                dimension_name: dimension
                    .map(|dimension| dimension.display_name.clone())
                    .unwrap_or_else(|| dimension_key.to_string()),
                coverage: current,
                lift,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.lift.total_cmp(&a.lift));
    candidates.truncate(limit);

    let total_lift: f64 = candidates.iter().map(|candidate| candidate.lift).sum();
    let max_potential_score = round_to((current_score + total_lift).min(100.0), 2);

    let questions = candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| PrioritizedQuestion {
            question_id: candidate.question.id.clone(),
            text: candidate.question.text.clone(),
            dimension_key: candidate.dimension_key.to_string(),
            rationale: rationale(candidate.lift, &candidate.dimension_name, candidate.coverage),
            dimension_name: candidate.dimension_name,
            severity: candidate.question.severity(),
            current_coverage: candidate.coverage,
            current_coverage_level: CoverageLevel::from_decimal(candidate.coverage),
            expected_score_lift: round_to(candidate.lift, 2),
            rank: index + 1,
        })
        .collect();

    RankedQuestions {
        questions,
        max_potential_score,
    }
}

fn rationale(lift: f64, dimension_name: &str, coverage: f64) -> String {
    if coverage <= 0.0 {
        return format!(
            "Answering this {dimension_name} question could improve your score by up to {lift:.1} points. This question has no coverage yet."
        );
    }

    format!(
        "Improving coverage on this {dimension_name} question from {:.0}% to 100% could add {lift:.1} points to your readiness score.",
        coverage * 100.0
    )
}
