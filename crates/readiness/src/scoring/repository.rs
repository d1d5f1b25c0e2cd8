use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{
    Dimension, DimensionAverage, QuestionRecord, ReadinessScoreResult, ScoreSnapshot, SessionId,
    SessionRecord,
};

/// Storage abstraction over sessions, the questionnaire catalog, and scoring
/// history so the engine can be exercised without a database.
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    async fn fetch_session(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;

    /// Active dimensions in catalog order.
    async fn active_dimensions(&self) -> Result<Vec<Dimension>, RepositoryError>;

    /// Questions of a questionnaire joined with the session's response, if any.
    async fn questions_for(
        &self,
        questionnaire_id: &str,
        session_id: &SessionId,
    ) -> Result<Vec<QuestionRecord>, RepositoryError>;

    async fn update_session_score(
        &self,
        session_id: &SessionId,
        score: f64,
        calculated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Final scores of completed sessions in the given industry cohort.
    async fn cohort_scores(&self, industry: &str) -> Result<Vec<f64>, RepositoryError>;

    /// Mean residual per dimension across all recorded scoring runs.
    async fn dimension_averages(&self) -> Result<Vec<DimensionAverage>, RepositoryError>;

    /// Most recent snapshots for a session, newest first.
    async fn score_history(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ScoreSnapshot>, RepositoryError>;

    async fn record_score_run(&self, result: &ReadinessScoreResult) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
