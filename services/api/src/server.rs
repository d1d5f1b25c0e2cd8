use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_scoring_routes;
use crate::seed::seeded_repository;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use readiness::config::{AppConfig, ScoringConfig, ServerConfig};
use readiness::error::AppError;
use readiness::scoring::{InMemoryCache, ScoringEngineService};
use readiness::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

fn apply_overrides(server: &mut ServerConfig, args: ServeArgs) {
    if let Some(host) = args.host {
        server.host = host;
    }
    if let Some(port) = args.port {
        server.port = port;
    }
}

fn build_app(scoring: ScoringConfig, state: AppState) -> Router {
    let service = ScoringEngineService::new(
        Arc::new(seeded_repository()),
        Arc::new(InMemoryCache::new()),
        scoring,
    );

    with_scoring_routes(Arc::new(service)).layer(Extension(state))
}

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    apply_overrides(&mut config.server, args);
    telemetry::init(&config.telemetry)?;

    let (metrics_layer, metrics_handle) = PrometheusMetricLayer::pair();
    let ready = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: ready.clone(),
        metrics: Arc::new(metrics_handle),
    };
    let app = build_app(config.scoring.clone(), state).layer(metrics_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    ready.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cache_ttl_secs = config.scoring.cache_ttl.as_secs(),
        "readiness scoring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
