use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::ScoringConfig;
use crate::scoring::cache::{CacheError, InMemoryCache, KeyValueCache};
use crate::scoring::domain::{
    CoverageLevel, Dimension, DimensionAverage, QuestionRecord, ReadinessScoreResult,
    ScoreSnapshot, SessionId, SessionRecord, SessionStatus,
};
use crate::scoring::repository::{AssessmentRepository, RepositoryError};
use crate::scoring::service::ScoringEngineService;

pub(super) const QUESTIONNAIRE: &str = "qn-readiness";
pub(super) const TOLERANCE: f64 = 1e-4;

pub(super) fn catalog() -> Vec<Dimension> {
    [
        ("arch_sec", "Architecture & Security", 0.15),
        ("devops_iac", "DevOps & Infrastructure as Code", 0.12),
        ("quality_test", "Quality & Testing", 0.10),
        ("finance", "Finance & Cost Management", 0.10),
        ("strategy", "Strategy & Vision", 0.08),
        ("requirements", "Requirements & Specifications", 0.08),
        ("data_ai", "Data & AI", 0.08),
        ("privacy_legal", "Privacy & Legal", 0.08),
        ("service_ops", "Service Operations", 0.08),
        ("compliance_policy", "Compliance & Policy", 0.07),
        ("people_change", "People & Change Management", 0.06),
    ]
    .into_iter()
    .map(|(key, name, weight)| Dimension {
        key: key.to_string(),
        display_name: name.to_string(),
        weight,
    })
    .collect()
}

pub(super) fn question(
    id: &str,
    dimension: &str,
    severity: f64,
    level: Option<CoverageLevel>,
) -> QuestionRecord {
    QuestionRecord {
        id: id.to_string(),
        text: format!("Readiness question {id}"),
        dimension_key: Some(dimension.to_string()),
        severity: Some(severity),
        coverage_level: level,
        coverage_decimal: None,
        has_response: level.is_some(),
    }
}

/// Two architecture questions partly covered, one fully covered DevOps question
/// and one unanswered DevOps question. Scores 89.64.
pub(super) fn fixture_questions() -> Vec<QuestionRecord> {
    vec![
        question("q1", "arch_sec", 0.8, Some(CoverageLevel::Substantial)),
        question("q2", "arch_sec", 0.6, Some(CoverageLevel::Half)),
        question("q3", "devops_iac", 0.7, Some(CoverageLevel::Full)),
        question("q4", "devops_iac", 0.5, None),
    ]
}

pub(super) fn session(id: &str) -> SessionRecord {
    SessionRecord {
        id: SessionId::from(id),
        questionnaire_id: QUESTIONNAIRE.to_string(),
        status: SessionStatus::InProgress,
        last_score: None,
        last_scored_at: None,
        industry: Some("technology".to_string()),
    }
}

pub(super) fn snapshot(at: DateTime<Utc>, score: f64) -> ScoreSnapshot {
    ScoreSnapshot {
        timestamp: at,
        score,
        portfolio_residual: (100.0 - score) / 100.0,
        completion_percentage: 75.0,
    }
}

#[derive(Default)]
struct RepositoryState {
    sessions: HashMap<SessionId, SessionRecord>,
    dimensions: Vec<Dimension>,
    questions: HashMap<String, Vec<QuestionRecord>>,
    cohorts: HashMap<String, Vec<f64>>,
    averages: Vec<DimensionAverage>,
    history: HashMap<SessionId, Vec<ScoreSnapshot>>,
    score_writes: Vec<(SessionId, f64)>,
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    state: Mutex<RepositoryState>,
    reject_score_updates: AtomicBool,
    reject_history_writes: AtomicBool,
}

impl MemoryRepository {
    pub(super) fn with_fixture() -> Self {
        let repository = Self::default();
        repository.set_dimensions(catalog());
        repository.set_questions(QUESTIONNAIRE, fixture_questions());
        repository.insert_session(session("s-1"));
        repository
    }

    fn lock(&self) -> Result<MutexGuard<'_, RepositoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
    }

    fn state(&self) -> MutexGuard<'_, RepositoryState> {
        self.state.lock().expect("repository lock")
    }

    pub(super) fn insert_session(&self, session: SessionRecord) {
        self.state().sessions.insert(session.id.clone(), session);
    }

    pub(super) fn set_dimensions(&self, dimensions: Vec<Dimension>) {
        self.state().dimensions = dimensions;
    }

    pub(super) fn set_questions(&self, questionnaire_id: &str, questions: Vec<QuestionRecord>) {
        self.state()
            .questions
            .insert(questionnaire_id.to_string(), questions);
    }

    pub(super) fn set_cohort(&self, industry: &str, scores: Vec<f64>) {
        self.state().cohorts.insert(industry.to_string(), scores);
    }

    pub(super) fn set_averages(&self, averages: Vec<DimensionAverage>) {
        self.state().averages = averages;
    }

    /// Snapshots are stored newest first.
    pub(super) fn set_history(&self, session_id: &str, history: Vec<ScoreSnapshot>) {
        self.state().history.insert(SessionId::from(session_id), history);
    }

    pub(super) fn session(&self, session_id: &str) -> Option<SessionRecord> {
        self.state().sessions.get(&SessionId::from(session_id)).cloned()
    }

    pub(super) fn score_writes(&self) -> Vec<(SessionId, f64)> {
        self.state().score_writes.clone()
    }

    pub(super) fn reject_score_updates(&self) {
        self.reject_score_updates.store(true, Ordering::SeqCst);
    }

    pub(super) fn reject_history_writes(&self) {
        self.reject_history_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssessmentRepository for MemoryRepository {
    async fn fetch_session(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Ok(self.lock()?.sessions.get(id).cloned())
    }

    async fn active_dimensions(&self) -> Result<Vec<Dimension>, RepositoryError> {
        Ok(self.lock()?.dimensions.clone())
    }

    async fn questions_for(
        &self,
        questionnaire_id: &str,
        _session_id: &SessionId,
    ) -> Result<Vec<QuestionRecord>, RepositoryError> {
        self.lock()?
            .questions
            .get(questionnaire_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("questionnaire {questionnaire_id}")))
    }

    async fn update_session_score(
        &self,
        session_id: &SessionId,
        score: f64,
        calculated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        if self.reject_score_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("session store is read-only".to_string()));
        }

        let mut state = self.lock()?;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| RepositoryError::NotFound(session_id.to_string()))?;
        session.last_score = Some(score);
        session.last_scored_at = Some(calculated_at);
        state.score_writes.push((session_id.clone(), score));
        Ok(())
    }

    async fn cohort_scores(&self, industry: &str) -> Result<Vec<f64>, RepositoryError> {
        Ok(self.lock()?.cohorts.get(industry).cloned().unwrap_or_default())
    }

    async fn dimension_averages(&self) -> Result<Vec<DimensionAverage>, RepositoryError> {
        Ok(self.lock()?.averages.clone())
    }

    async fn score_history(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ScoreSnapshot>, RepositoryError> {
        Ok(self
            .lock()?
            .history
            .get(session_id)
            .map(|history| history.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn record_score_run(&self, result: &ReadinessScoreResult) -> Result<(), RepositoryError> {
        if self.reject_history_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("history table locked".to_string()));
        }

        self.lock()?
            .history
            .entry(result.session_id.clone())
            .or_default()
            .insert(0, result.snapshot());
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

#[async_trait]
impl AssessmentRepository for UnavailableRepository {
    async fn fetch_session(&self, _id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Err(unavailable())
    }

    async fn active_dimensions(&self) -> Result<Vec<Dimension>, RepositoryError> {
        Err(unavailable())
    }

    async fn questions_for(
        &self,
        _questionnaire_id: &str,
        _session_id: &SessionId,
    ) -> Result<Vec<QuestionRecord>, RepositoryError> {
        Err(unavailable())
    }

    async fn update_session_score(
        &self,
        _session_id: &SessionId,
        _score: f64,
        _calculated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        Err(unavailable())
    }

    async fn cohort_scores(&self, _industry: &str) -> Result<Vec<f64>, RepositoryError> {
        Err(unavailable())
    }

    async fn dimension_averages(&self) -> Result<Vec<DimensionAverage>, RepositoryError> {
        Err(unavailable())
    }

    async fn score_history(
        &self,
        _session_id: &SessionId,
        _limit: usize,
    ) -> Result<Vec<ScoreSnapshot>, RepositoryError> {
        Err(unavailable())
    }

    async fn record_score_run(&self, _result: &ReadinessScoreResult) -> Result<(), RepositoryError> {
        Err(unavailable())
    }
}

fn unavailable() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

/// Cache whose every operation is rejected by the backend.
pub(super) struct RejectingCache;

#[async_trait]
impl KeyValueCache for RejectingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Backend("connection reset".to_string()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection reset".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection reset".to_string()))
    }
}

pub(super) type MemoryService = ScoringEngineService<MemoryRepository, InMemoryCache>;

pub(super) fn build_service() -> (Arc<MemoryService>, Arc<MemoryRepository>, Arc<InMemoryCache>) {
    build_service_with(MemoryRepository::with_fixture(), ScoringConfig::default())
}

pub(super) fn build_service_with(
    repository: MemoryRepository,
    config: ScoringConfig,
) -> (Arc<MemoryService>, Arc<MemoryRepository>, Arc<InMemoryCache>) {
    let repository = Arc::new(repository);
    let cache = Arc::new(InMemoryCache::new());
    let service = Arc::new(ScoringEngineService::new(
        repository.clone(),
        cache.clone(),
        config,
    ));
    (service, repository, cache)
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < TOLERANCE
}
