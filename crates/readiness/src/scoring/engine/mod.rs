mod benchmark;
mod coverage;
mod heatmap;
mod ranking;
mod residual;
mod trend;

pub use benchmark::{
    benchmark_dimensions, benchmark_score, percentile, percentile_rank, BenchmarkResult,
    CohortStatistics, DimensionBenchmarkResult, DimensionPerformance, PerformanceCategory,
    GENERAL_COHORT,
};
pub use coverage::{resolve_coverage, stored_coverage, CoverageMap};
pub use heatmap::{
    build_heatmap, summarize, HeatColor, HeatmapCell, HeatmapResult, HeatmapSummary,
    SeverityBucket,
};
pub use ranking::{rank_questions, RankedQuestions};
pub use residual::{
    aggregate_portfolio, classify_trend, dimension_residual, residual_risk, PortfolioScore,
};
pub use trend::{ScoreHistoryResult, TrendAnalysis, TrendDirection};

use super::domain::{CoverageOverride, Dimension, QuestionRecord, ScoreTrend};
use crate::config::ScoringConfig;

/// Stateless calculator applying the scoring configuration to one session's data.
pub struct ScoreCalculator {
    epsilon: f64,
    trend_dead_band: f64,
    target_score: f64,
}

impl ScoreCalculator {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            epsilon: config.epsilon,
            trend_dead_band: config.trend_dead_band,
            target_score: config.target_score,
        }
    }

    pub fn coverage(
        &self,
        questions: &[QuestionRecord],
        overrides: &[CoverageOverride],
    ) -> CoverageMap {
        resolve_coverage(questions, overrides)
    }

    pub fn portfolio(
        &self,
        dimensions: &[Dimension],
        questions: &[QuestionRecord],
        coverage: &CoverageMap,
    ) -> PortfolioScore {
        aggregate_portfolio(dimensions, questions, coverage, self.epsilon)
    }

    pub fn trend(&self, previous: Option<f64>, score: f64) -> ScoreTrend {
        classify_trend(previous, score, self.trend_dead_band)
    }

    pub fn meets_threshold(&self, score: f64) -> bool {
        score >= self.target_score
    }

    pub fn rank(
        &self,
        questions: &[QuestionRecord],
        dimensions: &[Dimension],
        coverage: &CoverageMap,
        current_score: f64,
        limit: usize,
    ) -> RankedQuestions {
        rank_questions(
            questions,
            dimensions,
            coverage,
            current_score,
            limit,
            self.epsilon,
        )
    }

    pub fn heatmap(
        &self,
        dimensions: &[Dimension],
        questions: &[QuestionRecord],
        coverage: &CoverageMap,
    ) -> Vec<HeatmapCell> {
        build_heatmap(dimensions, questions, coverage)
    }
}
