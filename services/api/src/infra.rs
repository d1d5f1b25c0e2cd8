use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use readiness::scoring::{
    AssessmentRepository, CoverageLevel, Dimension, DimensionAverage, QuestionRecord,
    ReadinessScoreResult, RepositoryError, ScoreSnapshot, SessionId, SessionRecord,
    SessionStatus, GENERAL_COHORT,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Question as stored in the questionnaire catalog, before joining a session's answer.
#[derive(Debug, Clone)]
pub(crate) struct CatalogQuestion {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) dimension_key: Option<String>,
    pub(crate) severity: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum StoredResponse {
    Level(CoverageLevel),
    Decimal(f64),
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) dimensions: Vec<Dimension>,
    pub(crate) questionnaires: HashMap<String, Vec<CatalogQuestion>>,
    pub(crate) sessions: HashMap<SessionId, SessionRecord>,
    pub(crate) responses: HashMap<SessionId, HashMap<String, StoredResponse>>,
    /// Scores of completed sessions that live outside this store, by industry.
    pub(crate) external_cohorts: HashMap<String, Vec<f64>>,
    pub(crate) residual_samples: HashMap<String, Vec<f64>>,
    pub(crate) history: HashMap<SessionId, Vec<ScoreSnapshot>>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAssessmentRepository {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryAssessmentRepository {
    pub(crate) fn from_state(state: StoreState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("assessment store mutex poisoned".to_string()))
    }

    pub(crate) fn session_ids(&self) -> Result<Vec<SessionId>, RepositoryError> {
        let mut ids: Vec<SessionId> = self.lock()?.sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryAssessmentRepository {
    async fn fetch_session(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Ok(self.lock()?.sessions.get(id).cloned())
    }

    async fn active_dimensions(&self) -> Result<Vec<Dimension>, RepositoryError> {
        Ok(self.lock()?.dimensions.clone())
    }

    async fn questions_for(
        &self,
        questionnaire_id: &str,
        session_id: &SessionId,
    ) -> Result<Vec<QuestionRecord>, RepositoryError> {
        let state = self.lock()?;
        let catalog = state
            .questionnaires
            .get(questionnaire_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("questionnaire {questionnaire_id}")))?;
        let responses = state.responses.get(session_id);

        Ok(catalog
            .iter()
            .map(|question| {
                let response = responses.and_then(|answers| answers.get(&question.id)).copied();
                let (coverage_level, coverage_decimal) = match response {
                    Some(StoredResponse::Level(level)) => (Some(level), None),
                    Some(StoredResponse::Decimal(value)) => (None, Some(value)),
                    None => (None, None),
                };

                QuestionRecord {
                    id: question.id.clone(),
                    text: question.text.clone(),
                    dimension_key: question.dimension_key.clone(),
                    severity: question.severity,
                    coverage_level,
                    coverage_decimal,
                    has_response: response.is_some(),
                }
            })
            .collect())
    }

    async fn update_session_score(
        &self,
        session_id: &SessionId,
        score: f64,
        calculated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("session {session_id}")))?;
        session.last_score = Some(score);
        session.last_scored_at = Some(calculated_at);
        Ok(())
    }

    async fn cohort_scores(&self, industry: &str) -> Result<Vec<f64>, RepositoryError> {
        let state = self.lock()?;
        let mut scores = state
            .external_cohorts
            .get(industry)
            .cloned()
            .unwrap_or_default();

        scores.extend(
            state
                .sessions
                .values()
                .filter(|session| session.status == SessionStatus::Completed)
                .filter(|session| {
                    session.industry.as_deref().unwrap_or(GENERAL_COHORT) == industry
                })
                .filter_map(|session| session.last_score),
        );
        Ok(scores)
    }

    async fn dimension_averages(&self) -> Result<Vec<DimensionAverage>, RepositoryError> {
        let state = self.lock()?;
        let mut averages: Vec<DimensionAverage> = state
            .residual_samples
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(key, samples)| DimensionAverage {
                dimension_key: key.clone(),
                average_residual: samples.iter().sum::<f64>() / samples.len() as f64,
                sample_size: samples.len(),
            })
            .collect();
        averages.sort_by(|a, b| a.dimension_key.cmp(&b.dimension_key));
        Ok(averages)
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
        let mut state = self.lock()?;
        state
            .history
            .entry(result.session_id.clone())
            .or_default()
            .insert(0, result.snapshot());

        for dimension in result.dimensions.iter().filter(|dim| dim.question_count > 0) {
            state
                .residual_samples
                .entry(dimension.dimension_key.clone())
                .or_default()
                .push(dimension.residual_risk);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store() -> InMemoryAssessmentRepository {
        let mut state = StoreState::default();
        state.questionnaires.insert(
            "qn".to_string(),
            vec![
                CatalogQuestion {
                    id: "a".to_string(),
                    text: "Answered".to_string(),
                    dimension_key: Some("arch_sec".to_string()),
                    severity: Some(0.9),
                },
                CatalogQuestion {
                    id: "b".to_string(),
                    text: "Open".to_string(),
                    dimension_key: Some("arch_sec".to_string()),
                    severity: None,
                },
            ],
        );
        let id = SessionId::from("s");
        state.sessions.insert(
            id.clone(),
            SessionRecord {
                id: id.clone(),
                questionnaire_id: "qn".to_string(),
                status: SessionStatus::Completed,
                last_score: Some(81.0),
                last_scored_at: Some(Utc::now()),
                industry: Some("fintech".to_string()),
            },
        );
        state.responses.insert(
            id,
            HashMap::from([("a".to_string(), StoredResponse::Decimal(0.6))]),
        );
        state
            .external_cohorts
            .insert("fintech".to_string(), vec![70.0, 90.0]);
        state
            .residual_samples
            .insert("arch_sec".to_string(), vec![0.2, 0.4]);
        InMemoryAssessmentRepository::from_state(state)
    }

    #[tokio::test]
    async fn questions_join_session_responses() {
        let questions = store()
            .questions_for("qn", &SessionId::from("s"))
            .await
            .expect("questions");

        assert_eq!(questions.len(), 2);
        assert!(questions[0].has_response);
        assert_eq!(questions[0].coverage_decimal, Some(0.6));
        assert!(!questions[1].has_response);
        assert_eq!(questions[1].severity, None);
    }

    #[tokio::test]
    async fn unknown_questionnaire_is_not_found() {
        let error = store()
            .questions_for("missing", &SessionId::from("s"))
            .await
            .expect_err("no questionnaire");

        assert!(matches!(error, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn cohort_includes_completed_sessions() {
        let scores = store().cohort_scores("fintech").await.expect("cohort");

        assert_eq!(scores, vec![70.0, 90.0, 81.0]);
    }

    #[tokio::test]
    async fn sessions_without_industry_join_general_cohort() {
        let repository = store();
        {
            let mut state = repository.state.lock().expect("state");
            for (id, score) in [("unclassified", 64.0), ("classified", 88.0)] {
                state.sessions.insert(
                    SessionId::from(id),
                    SessionRecord {
                        id: SessionId::from(id),
                        questionnaire_id: "qn".to_string(),
                        status: SessionStatus::Completed,
                        last_score: Some(score),
                        last_scored_at: Some(Utc::now()),
                        industry: (id == "classified").then(|| GENERAL_COHORT.to_string()),
                    },
                );
            }
        }

        let mut general = repository.cohort_scores(GENERAL_COHORT).await.expect("cohort");
        general.sort_by(f64::total_cmp);
        assert_eq!(general, vec![64.0, 88.0]);

        let fintech = repository.cohort_scores("fintech").await.expect("cohort");
        assert_eq!(fintech, vec![70.0, 90.0, 81.0]);
    }

    #[tokio::test]
    async fn dimension_averages_are_sample_means() {
        let averages = store().dimension_averages().await.expect("averages");

        assert_eq!(averages.len(), 1);
        assert!((averages[0].average_residual - 0.3).abs() < 1e-9);
        assert_eq!(averages[0].sample_size, 2);
    }
}
