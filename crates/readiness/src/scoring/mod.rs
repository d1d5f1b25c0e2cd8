//! Risk-weighted readiness scoring for assessment sessions.
//!
//! Pure computation lives under [`engine`]; [`service::ScoringEngineService`] wires
//! it to the session store and the score cache, and [`router::scoring_router`]
//! exposes the service over HTTP.

pub mod cache;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use cache::{CacheError, InMemoryCache, KeyValueCache, ScoreCacheGateway};
pub use domain::{
    BatchScoreRequest, CalculateScoreRequest, CoverageLevel, CoverageOverride, Dimension,
    DimensionAverage, DimensionResidual, NextQuestionsRequest, NextQuestionsResult,
    PrioritizedQuestion, QuestionRecord, ReadinessScoreResult, ScoreSnapshot, ScoreTrend,
    SessionId, SessionRecord, SessionStatus, DEFAULT_SEVERITY,
};
pub use engine::{
    BenchmarkResult, CohortStatistics, DimensionBenchmarkResult, DimensionPerformance, HeatColor,
    HeatmapCell, HeatmapResult, HeatmapSummary, PerformanceCategory, ScoreCalculator,
    ScoreHistoryResult, SeverityBucket, TrendAnalysis, TrendDirection, GENERAL_COHORT,
};
pub use repository::{AssessmentRepository, RepositoryError};
pub use router::scoring_router;
pub use service::{ScoringEngineService, ScoringError};
