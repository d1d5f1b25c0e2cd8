use super::super::domain::{round_to, Dimension, DimensionResidual, QuestionRecord, ScoreTrend};
use super::coverage::{coverage_of, CoverageMap};

/// Outcome of aggregating every active dimension into the portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioScore {
    pub dimensions: Vec<DimensionResidual>,
    pub portfolio_residual: f64,
    pub score: f64,
    pub total_questions: usize,
    pub answered_questions: usize,
    pub completion_percentage: f64,
}

/// `Σ S·(1−C) / (Σ S + ε)` over `(severity, coverage)` pairs.
pub fn residual_risk<I>(pairs: I, epsilon: f64) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (numerator, severity_sum) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(numerator, severity_sum), (severity, coverage)| {
            (numerator + severity * (1.0 - coverage), severity_sum + severity)
        });

    numerator / (severity_sum + epsilon)
}

/// Residual for one dimension. A dimension without questions carries no risk.
pub fn dimension_residual(
    dimension: &Dimension,
    questions: &[QuestionRecord],
    coverage: &CoverageMap,
    epsilon: f64,
) -> DimensionResidual {
    measure_dimension(dimension, questions, coverage, epsilon).0
}

/// Returns the display residual alongside the unrounded weighted contribution.
fn measure_dimension(
    dimension: &Dimension,
    questions: &[QuestionRecord],
    coverage: &CoverageMap,
    epsilon: f64,
) -> (DimensionResidual, f64) {
    let members: Vec<&QuestionRecord> = questions
        .iter()
        .filter(|question| question.belongs_to(&dimension.key))
        .collect();

    if members.is_empty() {
        let empty = DimensionResidual {
            dimension_key: dimension.key.clone(),
            display_name: dimension.display_name.clone(),
            weight: dimension.weight,
            residual_risk: 0.0,
            weighted_contribution: 0.0,
            question_count: 0,
            answered_count: 0,
            average_coverage: 0.0,
        };
        return (empty, 0.0);
    }

    let residual = residual_risk(
        members
            .iter()
            .map(|question| (question.severity(), coverage_of(coverage, question))),
        epsilon,
    );
    let contribution = dimension.weight * residual;
    let answered_count = members.iter().filter(|question| question.has_response).count();
    let coverage_total: f64 = members
        .iter()
        .map(|question| coverage_of(coverage, question))
        .sum();

    let breakdown = DimensionResidual {
        dimension_key: dimension.key.clone(),
        display_name: dimension.display_name.clone(),
        weight: dimension.weight,
        residual_risk: round_to(residual, 4),
        weighted_contribution: round_to(contribution, 4),
        question_count: members.len(),
        answered_count,
        average_coverage: round_to(coverage_total / members.len() as f64, 2),
    };
    (breakdown, contribution)
}

/// Combine dimension residuals into the portfolio residual and 0–100 score.
///
/// Weights are assumed to sum to 1.0; nothing here renormalises them.
pub fn aggregate_portfolio(
    dimensions: &[Dimension],
    questions: &[QuestionRecord],
    coverage: &CoverageMap,
    epsilon: f64,
) -> PortfolioScore {
    let mut residuals = Vec::with_capacity(dimensions.len());
    let mut portfolio_residual = 0.0;
    for dimension in dimensions {
        let (residual, contribution) = measure_dimension(dimension, questions, coverage, epsilon);
        portfolio_residual += contribution;
        residuals.push(residual);
    }

    let score = (100.0 * (1.0 - portfolio_residual)).clamp(0.0, 100.0);

    let total_questions = questions.len();
    let answered_questions = questions.iter().filter(|question| question.has_response).count();
    let completion_percentage = if total_questions > 0 {
        answered_questions as f64 / total_questions as f64 * 100.0
    } else {
        0.0
    };

    PortfolioScore {
        dimensions: residuals,
        portfolio_residual: round_to(portfolio_residual, 4),
        score: round_to(score, 2),
        total_questions,
        answered_questions,
        completion_percentage: round_to(completion_percentage, 1),
    }
}

/// Compare against the previously persisted score with a symmetric dead band.
pub fn classify_trend(previous: Option<f64>, score: f64, dead_band: f64) -> ScoreTrend {
    match previous {
        None => ScoreTrend::First,
        Some(previous) if score > previous + dead_band => ScoreTrend::Up,
        Some(previous) if score < previous - dead_band => ScoreTrend::Down,
        Some(_) => ScoreTrend::Stable,
    }
}

#[cfg(test)]
mod tests {
    use super::super::coverage::resolve_coverage;
    use super::*;
    use crate::scoring::domain::CoverageLevel;

    const EPSILON: f64 = 1e-10;

    fn dimension(key: &str, weight: f64) -> Dimension {
        Dimension {
            key: key.to_string(),
            display_name: key.to_uppercase(),
            weight,
        }
    }

    fn question(id: &str, dim: &str, severity: f64, coverage: Option<f64>) -> QuestionRecord {
        QuestionRecord {
            id: id.to_string(),
            text: format!("Question {id}"),
            dimension_key: Some(dim.to_string()),
            severity: Some(severity),
            coverage_level: None,
            coverage_decimal: coverage,
            has_response: coverage.is_some(),
        }
    }

    #[test]
    fn residual_matches_weighted_formula() {
        let dims = vec![dimension("arch_sec", 0.15)];
        let questions = vec![
            question("q1", "arch_sec", 0.8, Some(0.75)),
            question("q2", "arch_sec", 0.6, Some(0.5)),
        ];
        let coverage = resolve_coverage(&questions, &[]);

        let residual = dimension_residual(&dims[0], &questions, &coverage, EPSILON);

        // (0.8 * 0.25 + 0.6 * 0.5) / 1.4
        let expected = 0.5 / 1.4;
        assert!((residual.residual_risk - round_to(expected, 4)).abs() < 1e-9);
        assert!((residual.weighted_contribution - round_to(0.15 * expected, 4)).abs() < 1e-9);
        assert_eq!(residual.question_count, 2);
        assert_eq!(residual.answered_count, 2);
        assert_eq!(residual.average_coverage, 0.63);
    }

    #[test]
    fn zero_severity_dimension_does_not_divide_by_zero() {
        let questions = vec![question("q1", "finance", 0.0, None)];
        let coverage = resolve_coverage(&questions, &[]);
        let residual = dimension_residual(&dimension("finance", 0.1), &questions, &coverage, EPSILON);
        assert_eq!(residual.residual_risk, 0.0);
        assert!(residual.residual_risk.is_finite());
    }

    #[test]
    fn empty_dimension_contributes_nothing_regardless_of_weight() {
        let dims = vec![dimension("empty", 0.9), dimension("arch_sec", 0.1)];
        let questions = vec![question("q1", "arch_sec", 1.0, None)];
        let coverage = resolve_coverage(&questions, &[]);

        let portfolio = aggregate_portfolio(&dims, &questions, &coverage, EPSILON);

        assert_eq!(portfolio.dimensions[0].weighted_contribution, 0.0);
        assert_eq!(portfolio.dimensions[0].residual_risk, 0.0);
        assert!((portfolio.portfolio_residual - 0.1).abs() < 1e-4);
        assert!((portfolio.score - 90.0).abs() < 0.01);
    }

    #[test]
    fn full_coverage_scores_one_hundred() {
        let dims = vec![dimension("a", 0.6), dimension("b", 0.4)];
        let mut questions = vec![
            question("q1", "a", 0.9, None),
            question("q2", "b", 0.3, None),
        ];
        for q in &mut questions {
            q.coverage_level = Some(CoverageLevel::Full);
            q.has_response = true;
        }
        let coverage = resolve_coverage(&questions, &[]);

        let portfolio = aggregate_portfolio(&dims, &questions, &coverage, EPSILON);

        assert!(portfolio.portfolio_residual.abs() < 1e-4);
        assert!((portfolio.score - 100.0).abs() < 1e-4);
        assert_eq!(portfolio.completion_percentage, 100.0);
    }

    #[test]
    fn zero_coverage_scores_below_one_hundred() {
        let dims = vec![dimension("a", 0.5), dimension("b", 0.5)];
        let questions = vec![question("q1", "a", 0.4, None)];
        let coverage = resolve_coverage(&questions, &[]);

        let portfolio = aggregate_portfolio(&dims, &questions, &coverage, EPSILON);

        assert!(portfolio.score < 100.0);
        assert!((portfolio.score - 100.0 * (1.0 - portfolio.portfolio_residual)).abs() < 0.01);
        assert_eq!(portfolio.completion_percentage, 0.0);
    }

    #[test]
    fn answered_count_ignores_coverage_value() {
        let questions = vec![
            question("q1", "a", 0.5, Some(0.0)),
            question("q2", "a", 0.5, None),
        ];
        let coverage = resolve_coverage(&questions, &[]);
        let residual = dimension_residual(&dimension("a", 1.0), &questions, &coverage, EPSILON);
        assert_eq!(residual.answered_count, 1);
        assert_eq!(residual.unanswered_count(), 1);
    }

    #[test]
    fn empty_questionnaire_has_zero_completion() {
        let dims = vec![dimension("a", 1.0)];
        let portfolio = aggregate_portfolio(&dims, &[], &CoverageMap::new(), EPSILON);
        assert_eq!(portfolio.total_questions, 0);
        assert_eq!(portfolio.completion_percentage, 0.0);
        assert_eq!(portfolio.score, 100.0);
    }

    #[test]
    fn overweighted_catalog_is_clamped_not_rejected() {
        let dims = vec![dimension("a", 0.9), dimension("b", 0.9)];
        let questions = vec![question("q1", "a", 1.0, None), question("q2", "b", 1.0, None)];
        let coverage = resolve_coverage(&questions, &[]);

        let portfolio = aggregate_portfolio(&dims, &questions, &coverage, EPSILON);

        assert_eq!(portfolio.score, 0.0);
        assert!(portfolio.portfolio_residual > 1.0);
    }

    #[test]
    fn trend_uses_half_point_dead_band() {
        assert_eq!(classify_trend(None, 40.0, 0.5), ScoreTrend::First);
        assert_eq!(classify_trend(Some(40.0), 40.6, 0.5), ScoreTrend::Up);
        assert_eq!(classify_trend(Some(40.0), 40.5, 0.5), ScoreTrend::Stable);
        assert_eq!(classify_trend(Some(40.0), 39.4, 0.5), ScoreTrend::Down);
        assert_eq!(classify_trend(Some(40.0), 39.5, 0.5), ScoreTrend::Stable);
    }
}
