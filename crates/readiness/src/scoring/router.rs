use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::error;

use super::cache::KeyValueCache;
use super::domain::{BatchScoreRequest, CalculateScoreRequest, NextQuestionsRequest, SessionId};
use super::repository::AssessmentRepository;
use super::service::{ScoringEngineService, ScoringError};
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BenchmarkQuery {
    pub industry: Option<String>,
}

/// Router builder exposing the scoring engine under `/api/v1/scoring`.
pub fn scoring_router<R, C>(service: Arc<ScoringEngineService<R, C>>) -> Router
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    Router::new()
        .route("/api/v1/scoring/calculate", post(calculate_handler::<R, C>))
        .route(
            "/api/v1/scoring/next-questions",
            post(next_questions_handler::<R, C>),
        )
        .route("/api/v1/scoring/batch", post(batch_handler::<R, C>))
        .route("/api/v1/scoring/:session_id", get(score_handler::<R, C>))
        .route(
            "/api/v1/scoring/:session_id/history",
            get(history_handler::<R, C>),
        )
        .route(
            "/api/v1/scoring/:session_id/benchmark",
            get(benchmark_handler::<R, C>),
        )
        .route(
            "/api/v1/scoring/:session_id/benchmark/dimensions",
            get(dimension_benchmark_handler::<R, C>),
        )
        .route(
            "/api/v1/scoring/:session_id/heatmap",
            get(heatmap_handler::<R, C>),
        )
        .route(
            "/api/v1/scoring/:session_id/invalidate",
            post(invalidate_handler::<R, C>),
        )
        .with_state(service)
}

fn failure(error: ScoringError) -> Response {
    if !error.is_not_found() {
        error!(%error, "scoring request failed");
    }
    AppError::from(error).into_response()
}

pub(crate) async fn calculate_handler<R, C>(
    State(service): State<Arc<ScoringEngineService<R, C>>>,
    Json(request): Json<CalculateScoreRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    match service.calculate_score(request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn score_handler<R, C>(
    State(service): State<Arc<ScoringEngineService<R, C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    let request = CalculateScoreRequest::for_session(SessionId(session_id));
    match service.calculate_score(request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn next_questions_handler<R, C>(
    State(service): State<Arc<ScoringEngineService<R, C>>>,
    Json(request): Json<NextQuestionsRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    match service.get_next_questions(request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn batch_handler<R, C>(
    State(service): State<Arc<ScoringEngineService<R, C>>>,
    Json(request): Json<BatchScoreRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    let results: BTreeMap<_, _> = service
        .calculate_batch_scores(&request.session_ids)
        .await
        .into_iter()
        .collect();
    (StatusCode::OK, Json(results)).into_response()
}

pub(crate) async fn history_handler<R, C>(
    State(service): State<Arc<ScoringEngineService<R, C>>>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    match service
        .get_score_history(&SessionId(session_id), query.limit)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn benchmark_handler<R, C>(
    State(service): State<Arc<ScoringEngineService<R, C>>>,
    Path(session_id): Path<String>,
    Query(query): Query<BenchmarkQuery>,
) -> Response
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    match service
        .get_industry_benchmark(&SessionId(session_id), query.industry.as_deref())
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn dimension_benchmark_handler<R, C>(
    State(service): State<Arc<ScoringEngineService<R, C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    match service.get_dimension_benchmarks(&SessionId(session_id)).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn heatmap_handler<R, C>(
    State(service): State<Arc<ScoringEngineService<R, C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    match service.get_heatmap(&SessionId(session_id)).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn invalidate_handler<R, C>(
    State(service): State<Arc<ScoringEngineService<R, C>>>,
    Path(session_id): Path<String>,
) -> StatusCode
where
    R: AssessmentRepository + 'static,
    C: KeyValueCache + 'static,
{
    service.invalidate_score_cache(&SessionId(session_id)).await;
    StatusCode::NO_CONTENT
}
