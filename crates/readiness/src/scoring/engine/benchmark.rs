use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::super::domain::{round_to, DimensionAverage, DimensionResidual, SessionId};

/// Cohort used when neither the caller nor the session names an industry.
pub const GENERAL_COHORT: &str = "general";

/// Residual gap beyond which a dimension is considered ahead of or behind peers.
const DIMENSION_GAP_THRESHOLD: f64 = 0.1;

/// Summary statistics over a cohort of completed sessions' final scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortStatistics {
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub percentile25: f64,
    pub percentile75: f64,
    pub sample_size: usize,
}

impl CohortStatistics {
    /// Non-finite scores are discarded; an empty cohort yields all zeros.
    pub fn from_scores(scores: &[f64]) -> Self {
        let mut sorted: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);

        if sorted.is_empty() {
            return Self {
                average: 0.0,
                median: 0.0,
                min: 0.0,
                max: 0.0,
                percentile25: 0.0,
                percentile75: 0.0,
                sample_size: 0,
            };
        }

        let sum: f64 = sorted.iter().sum();
        Self {
            average: sum / sorted.len() as f64,
            median: percentile(&sorted, 0.5),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            percentile25: percentile(&sorted, 0.25),
            percentile75: percentile(&sorted, 0.75),
            sample_size: sorted.len(),
        }
    }

    fn rounded(&self) -> Self {
        Self {
            average: round_to(self.average, 2),
            median: round_to(self.median, 2),
            min: round_to(self.min, 2),
            max: round_to(self.max, 2),
            percentile25: round_to(self.percentile25, 2),
            percentile75: round_to(self.percentile75, 2),
            sample_size: self.sample_size,
        }
    }
}

/// Continuous percentile with linear interpolation between closest ranks.
/// `sorted` must be ascending; `fraction` is in `[0, 1]`.
pub fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = fraction.clamp(0.0, 1.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Share of the cohort scoring at or below `score`, as a percentage.
/// An empty cohort reports the midpoint rather than a degenerate 0.
pub fn percentile_rank(scores: &[f64], score: f64) -> f64 {
    let cohort: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
    if cohort.is_empty() {
        return 50.0;
    }
    let at_or_below = cohort.iter().filter(|&&other| other <= score).count();
    at_or_below as f64 / cohort.len() as f64 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceCategory {
    Leading,
    AboveAverage,
    Average,
    BelowAverage,
    Lagging,
}

impl PerformanceCategory {
    pub fn classify(score: f64, stats: &CohortStatistics) -> Self {
        if score >= stats.percentile75 {
            Self::Leading
        } else if score >= stats.median {
            Self::AboveAverage
        } else if score >= stats.percentile25 {
            Self::Average
        } else if score >= stats.min {
            Self::BelowAverage
        } else {
            Self::Lagging
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Leading => "Leading",
            Self::AboveAverage => "Above average",
            Self::Average => "Average",
            Self::BelowAverage => "Below average",
            Self::Lagging => "Lagging",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub session_id: SessionId,
    pub current_score: f64,
    pub industry: String,
    pub benchmark: CohortStatistics,
    pub percentile_rank: f64,
    pub performance_category: PerformanceCategory,
    pub gap_to_median: f64,
    pub gap_to_leading: f64,
}

/// Position `score` within the cohort described by `cohort_scores`.
pub fn benchmark_score(
    session_id: SessionId,
    industry: String,
    score: f64,
    cohort_scores: &[f64],
) -> BenchmarkResult {
    let stats = CohortStatistics::from_scores(cohort_scores);
    let performance_category = PerformanceCategory::classify(score, &stats);

    BenchmarkResult {
        session_id,
        current_score: round_to(score, 2),
        industry,
        percentile_rank: round_to(percentile_rank(cohort_scores, score), 2),
        performance_category,
        gap_to_median: round_to(score - stats.median, 2),
        gap_to_leading: round_to(stats.percentile75 - score, 2),
        benchmark: stats.rounded(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DimensionPerformance {
    Above,
    Average,
    Below,
}

impl DimensionPerformance {
    /// `gap` is current residual minus the historical average; lower residual is better.
    pub fn from_gap(gap: f64) -> Self {
        if gap < -DIMENSION_GAP_THRESHOLD {
            Self::Above
        } else if gap > DIMENSION_GAP_THRESHOLD {
            Self::Below
        } else {
            Self::Average
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionBenchmarkResult {
    pub dimension_key: String,
    pub display_name: String,
    pub current_residual: f64,
    pub industry_average_residual: f64,
    pub gap_to_average: f64,
    pub performance: DimensionPerformance,
    pub recommendation: String,
}

/// Compare each scored dimension against its historical average residual.
/// Dimensions with no questions are skipped; dimensions without history are
/// compared against themselves.
pub fn benchmark_dimensions(
    residuals: &[DimensionResidual],
    averages: &[DimensionAverage],
) -> Vec<DimensionBenchmarkResult> {
    let history: HashMap<&str, f64> = averages
        .iter()
        .filter(|average| average.average_residual.is_finite())
        .map(|average| (average.dimension_key.as_str(), average.average_residual))
        .collect();

    residuals
        .iter()
        .filter(|residual| residual.question_count > 0)
        .map(|residual| {
            let average = history
                .get(residual.dimension_key.as_str())
                .copied()
                .unwrap_or(residual.residual_risk);
            let gap = residual.residual_risk - average;
            let performance = DimensionPerformance::from_gap(gap);

            DimensionBenchmarkResult {
                dimension_key: residual.dimension_key.clone(),
                display_name: residual.display_name.clone(),
                current_residual: residual.residual_risk,
                industry_average_residual: round_to(average, 4),
                gap_to_average: round_to(gap, 4),
                performance,
                recommendation: recommendation(performance, residual),
            }
        })
        .collect()
}

fn recommendation(performance: DimensionPerformance, residual: &DimensionResidual) -> String {
    let name = &residual.display_name;
    let open = residual.unanswered_count();
    match performance {
        DimensionPerformance::Above => {
            format!("{name} is ahead of peers; keep evidence current.")
        }
        DimensionPerformance::Average => format!(
            "{name} is in line with peers; answering the {open} open question(s) would move it ahead."
        ),
        DimensionPerformance::Below => format!(
            "{name} trails peers; prioritise the {open} unanswered question(s) in this area."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residual(key: &str, name: &str, risk: f64, questions: usize, answered: usize) -> DimensionResidual {
        DimensionResidual {
            dimension_key: key.to_string(),
            display_name: name.to_string(),
            weight: 0.1,
            residual_risk: risk,
            weighted_contribution: 0.1 * risk,
            question_count: questions,
            answered_count: answered,
            average_coverage: 1.0 - risk,
        }
    }

    fn average(key: &str, value: f64) -> DimensionAverage {
        DimensionAverage {
            dimension_key: key.to_string(),
            average_residual: value,
            sample_size: 12,
        }
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&sorted, 0.0), 10.0);
        assert_eq!(percentile(&sorted, 1.0), 40.0);
        assert!((percentile(&sorted, 0.5) - 25.0).abs() < 1e-9);
        assert!((percentile(&sorted, 0.25) - 17.5).abs() < 1e-9);
        assert!((percentile(&sorted, 0.75) - 32.5).abs() < 1e-9);
    }

    #[test]
    fn statistics_cover_the_cohort() {
        let stats = CohortStatistics::from_scores(&[95.0, 45.0, 72.0, 60.0, 85.0]);
        assert_eq!(stats.sample_size, 5);
        assert_eq!(stats.min, 45.0);
        assert_eq!(stats.max, 95.0);
        assert_eq!(stats.median, 72.0);
        assert_eq!(stats.percentile25, 60.0);
        assert_eq!(stats.percentile75, 85.0);
        assert!((stats.average - 71.4).abs() < 1e-9);
    }

    #[test]
    fn percentile_rank_counts_ties_as_at_or_below() {
        let scores = [50.0, 60.0, 60.0, 90.0];
        assert_eq!(percentile_rank(&scores, 60.0), 75.0);
        assert_eq!(percentile_rank(&scores, 10.0), 0.0);
        assert_eq!(percentile_rank(&scores, 90.0), 100.0);
    }

    #[test]
    fn empty_cohort_defaults_to_midpoint() {
        assert_eq!(percentile_rank(&[], 42.0), 50.0);
        let result = benchmark_score(SessionId::from("s"), GENERAL_COHORT.to_string(), 42.0, &[]);
        assert_eq!(result.benchmark.sample_size, 0);
        assert_eq!(result.percentile_rank, 50.0);
        assert_eq!(result.performance_category, PerformanceCategory::Leading);
    }

    #[test]
    fn categories_follow_quartile_boundaries() {
        let stats = CohortStatistics::from_scores(&[45.0, 60.0, 72.0, 85.0, 95.0]);
        assert_eq!(PerformanceCategory::classify(85.0, &stats), PerformanceCategory::Leading);
        assert_eq!(PerformanceCategory::classify(80.0, &stats), PerformanceCategory::AboveAverage);
        assert_eq!(PerformanceCategory::classify(65.0, &stats), PerformanceCategory::Average);
        assert_eq!(PerformanceCategory::classify(50.0, &stats), PerformanceCategory::BelowAverage);
        assert_eq!(PerformanceCategory::classify(30.0, &stats), PerformanceCategory::Lagging);
    }

    #[test]
    fn gaps_are_relative_to_median_and_upper_quartile() {
        let result = benchmark_score(
            SessionId::from("s"),
            "technology".to_string(),
            80.0,
            &[45.0, 60.0, 72.0, 85.0, 95.0],
        );
        assert_eq!(result.gap_to_median, 8.0);
        assert_eq!(result.gap_to_leading, 5.0);
        assert_eq!(result.percentile_rank, 60.0);
        assert_eq!(result.performance_category, PerformanceCategory::AboveAverage);
    }

    #[test]
    fn dimension_performance_uses_tenth_threshold() {
        let residuals = vec![
            residual("arch_sec", "Architecture & Security", 0.05, 4, 4),
            residual("devops_iac", "DevOps & Infrastructure", 0.5, 3, 1),
            residual("finance", "Finance", 0.3, 2, 1),
            residual("empty", "Empty", 0.0, 0, 0),
        ];
        let averages = vec![
            average("arch_sec", 0.25),
            average("devops_iac", 0.3),
            average("finance", 0.25),
        ];

        let results = benchmark_dimensions(&residuals, &averages);

        assert_eq!(results.len(), 3, "dimensions without questions are skipped");
        assert_eq!(results[0].performance, DimensionPerformance::Above);
        assert_eq!(results[1].performance, DimensionPerformance::Below);
        assert_eq!(results[2].performance, DimensionPerformance::Average);
        assert!((results[1].gap_to_average - 0.2).abs() < 1e-9);
        assert!(results[1].recommendation.contains("2 unanswered"));
        for result in &results {
            let first_word = result.display_name.split(' ').next().unwrap_or_default();
            assert!(result.recommendation.contains(first_word));
        }
    }

    #[test]
    fn dimension_without_history_is_average() {
        let residuals = vec![residual("data_ai", "Data & AI", 0.4, 2, 0)];
        let results = benchmark_dimensions(&residuals, &[]);
        assert_eq!(results[0].performance, DimensionPerformance::Average);
        assert_eq!(results[0].gap_to_average, 0.0);
    }
}
