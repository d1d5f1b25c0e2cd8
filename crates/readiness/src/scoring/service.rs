use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::cache::{KeyValueCache, ScoreCacheGateway};
use super::domain::{
    round_to, CalculateScoreRequest, Dimension, NextQuestionsRequest, NextQuestionsResult,
    QuestionRecord, ReadinessScoreResult, ScoreSnapshot, SessionId, SessionRecord,
};
use super::engine::{
    benchmark_dimensions, benchmark_score, summarize, BenchmarkResult, DimensionBenchmarkResult,
    HeatmapResult, ScoreCalculator, ScoreHistoryResult, TrendAnalysis, GENERAL_COHORT,
};
use super::repository::{AssessmentRepository, RepositoryError};
use crate::config::ScoringConfig;

/// Service composing the score calculator, the assessment repository, and the
/// score cache.
pub struct ScoringEngineService<R, C> {
    repository: Arc<R>,
    cache: ScoreCacheGateway<C>,
    calculator: ScoreCalculator,
    config: ScoringConfig,
}

impl<R, C> ScoringEngineService<R, C>
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>, config: ScoringConfig) -> Self {
        let calculator = ScoreCalculator::new(&config);
        let cache = ScoreCacheGateway::new(cache, config.cache_ttl);

        Self {
            repository,
            cache,
            calculator,
            config,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Compute, persist and cache the readiness score for a session.
    ///
    /// The write-back to the session store must succeed; cache and history
    /// writes are best-effort.
    pub async fn calculate_score(
        &self,
        request: CalculateScoreRequest,
    ) -> Result<ReadinessScoreResult, ScoringError> {
        let started = Instant::now();
        let session = self.load_session(&request.session_id).await?;
        let (dimensions, questions) = self.load_inputs(&session).await?;

        let coverage = self
            .calculator
            .coverage(&questions, &request.coverage_overrides);
        let portfolio = self.calculator.portfolio(&dimensions, &questions, &coverage);
        let trend = self.calculator.trend(session.last_score, portfolio.score);
        let calculated_at = Utc::now();

        self.repository
            .update_session_score(&session.id, portfolio.score, calculated_at)
            .await
            .map_err(ScoringError::Persistence)?;

        let result = ReadinessScoreResult {
            session_id: session.id,
            meets_threshold: self.calculator.meets_threshold(portfolio.score),
            score: portfolio.score,
            portfolio_residual: portfolio.portfolio_residual,
            dimensions: portfolio.dimensions,
            total_questions: portfolio.total_questions,
            answered_questions: portfolio.answered_questions,
            completion_percentage: portfolio.completion_percentage,
            calculated_at,
            trend,
        };

        self.cache.put(&result).await;
        if let Err(error) = self.repository.record_score_run(&result).await {
            warn!(session_id = %result.session_id, %error, "failed to record score history");
        }

        info!(
            session_id = %result.session_id,
            score = result.score,
            overrides = request.coverage_overrides.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "readiness score calculated"
        );

        Ok(result)
    }

    /// Rank the session's under-covered questions by expected score lift.
    pub async fn get_next_questions(
        &self,
        request: NextQuestionsRequest,
    ) -> Result<NextQuestionsResult, ScoringError> {
        let limit = self.config.question_limit(request.limit);
        let current = self.current_result(&request.session_id).await?;

        let session = self.load_session(&request.session_id).await?;
        let (dimensions, questions) = self.load_inputs(&session).await?;
        let coverage = self.calculator.coverage(&questions, &[]);
        let ranked = self
            .calculator
            .rank(&questions, &dimensions, &coverage, current.score, limit);

        debug!(
            session_id = %session.id,
            ranked = ranked.questions.len(),
            limit,
            "next questions ranked"
        );

        Ok(NextQuestionsResult {
            session_id: session.id,
            current_score: current.score,
            questions: ranked.questions,
            max_potential_score: ranked.max_potential_score,
        })
    }

    /// Compare the session's persisted score with its industry cohort. A blank
    /// or missing industry falls back to the session's own, then to the general cohort.
    pub async fn get_industry_benchmark(
        &self,
        session_id: &SessionId,
        industry: Option<&str>,
    ) -> Result<BenchmarkResult, ScoringError> {
        let session = self.load_session(session_id).await?;
        let score = match session.last_score {
            Some(score) => score,
            None => {
                self.calculate_score(CalculateScoreRequest::for_session(session.id.clone()))
                    .await?
                    .score
            }
        };

        let industry = industry
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .or_else(|| session.industry.clone())
            .unwrap_or_else(|| GENERAL_COHORT.to_string());

        let cohort = self.repository.cohort_scores(&industry).await?;
        Ok(benchmark_score(session.id, industry, score, &cohort))
    }

    pub async fn get_dimension_benchmarks(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<DimensionBenchmarkResult>, ScoringError> {
        let current = self.current_result(session_id).await?;
        let averages = self.repository.dimension_averages().await?;
        Ok(benchmark_dimensions(&current.dimensions, &averages))
    }

    /// Recorded snapshots (newest first) with the persisted score prepended when
    /// it is newer than the last recorded run.
    pub async fn get_score_history(
        &self,
        session_id: &SessionId,
        limit: Option<usize>,
    ) -> Result<ScoreHistoryResult, ScoringError> {
        let session = self.load_session(session_id).await?;
        let limit = limit.unwrap_or(self.config.default_history_limit).max(1);
        let mut history = self.repository.score_history(&session.id, limit).await?;

        if let Some(point) = persisted_snapshot(&session, &history) {
            history.insert(0, point);
        }

        let trend = TrendAnalysis::from_history(&history);
        Ok(ScoreHistoryResult {
            session_id: session.id,
            current_score: session.last_score,
            history,
            trend,
        })
    }

    pub async fn get_heatmap(&self, session_id: &SessionId) -> Result<HeatmapResult, ScoringError> {
        let session = self.load_session(session_id).await?;
        let (dimensions, questions) = self.load_inputs(&session).await?;
        let coverage = self.calculator.coverage(&questions, &[]);
        let cells = self.calculator.heatmap(&dimensions, &questions, &coverage);

        Ok(HeatmapResult {
            session_id: session.id,
            summary: summarize(&cells),
            cells,
        })
    }

    pub async fn meets_readiness_threshold(
        &self,
        session_id: &SessionId,
    ) -> Result<bool, ScoringError> {
        let result = self
            .calculate_score(CalculateScoreRequest::for_session(session_id.clone()))
            .await?;
        Ok(result.meets_threshold)
    }

    /// Drop the cached score. Never fails, even when the cache backend does.
    pub async fn invalidate_score_cache(&self, session_id: &SessionId) {
        self.cache.invalidate(session_id).await;
    }

    /// Score many sessions, a chunk at a time. Failed sessions are logged and
    /// left out of the returned map.
    pub async fn calculate_batch_scores(
        &self,
        session_ids: &[SessionId],
    ) -> HashMap<SessionId, ReadinessScoreResult> {
        let mut results = HashMap::with_capacity(session_ids.len());

        for chunk in session_ids.chunks(self.config.batch_chunk_size.max(1)) {
            let outcomes = join_all(chunk.iter().map(|session_id| async move {
                let outcome = self
                    .calculate_score(CalculateScoreRequest::for_session(session_id.clone()))
                    .await;
                (session_id, outcome)
            }))
            .await;

            for (session_id, outcome) in outcomes {
                match outcome {
                    Ok(result) => {
                        results.insert(session_id.clone(), result);
                    }
                    Err(error) => {
                        error!(session_id = %session_id, %error, "failed to calculate batch score");
                    }
                }
            }
        }

        info!(
            requested = session_ids.len(),
            succeeded = results.len(),
            "batch scoring finished"
        );
        results
    }

    async fn current_result(
        &self,
        session_id: &SessionId,
    ) -> Result<ReadinessScoreResult, ScoringError> {
        if let Some(cached) = self.cache.get(session_id).await {
            return Ok(cached);
        }
        self.calculate_score(CalculateScoreRequest::for_session(session_id.clone()))
            .await
    }

    async fn load_session(&self, session_id: &SessionId) -> Result<SessionRecord, ScoringError> {
        self.repository
            .fetch_session(session_id)
            .await?
            .ok_or_else(|| ScoringError::SessionNotFound(session_id.clone()))
    }

    async fn load_inputs(
        &self,
        session: &SessionRecord,
    ) -> Result<(Vec<Dimension>, Vec<QuestionRecord>), ScoringError> {
        let dimensions = self.repository.active_dimensions().await?;
        let questions = self
            .repository
            .questions_for(&session.questionnaire_id, &session.id)
            .await?;
        Ok((dimensions, questions))
    }
}

fn persisted_snapshot(session: &SessionRecord, history: &[ScoreSnapshot]) -> Option<ScoreSnapshot> {
    let score = session.last_score?;
    let newest = history.first();
    let timestamp = match (newest, session.last_scored_at) {
        (Some(newest), Some(scored_at)) if newest.timestamp >= scored_at => return None,
        // without a timestamp the persisted score cannot be placed against recorded runs
        (Some(_), None) => return None,
        (_, Some(scored_at)) => scored_at,
        (None, None) => Utc::now(),
    };

    Some(ScoreSnapshot {
        timestamp,
        score,
        portfolio_residual: round_to(1.0 - score / 100.0, 4),
        completion_percentage: newest.map(|point| point.completion_percentage).unwrap_or(0.0),
    })
}

/// Error raised by the scoring service.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("failed to persist readiness score: {0}")]
    Persistence(#[source] RepositoryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ScoringError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_) | Self::Repository(RepositoryError::NotFound(_))
        )
    }
}
