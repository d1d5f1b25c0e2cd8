use crate::infra::InMemoryAssessmentRepository;
use crate::seed::{seeded_repository, DEMO_SESSION};
use clap::Args;
use readiness::config::AppConfig;
use readiness::error::AppError;
use readiness::scoring::{
    CalculateScoreRequest, InMemoryCache, NextQuestionsRequest, ReadinessScoreResult,
    ScoreTrend, ScoringEngineService, SessionId,
};
use readiness::telemetry;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

type DemoService = ScoringEngineService<InMemoryAssessmentRepository, InMemoryCache>;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Seeded session to score
    #[arg(long, default_value = DEMO_SESSION)]
    pub(crate) session: String,
    /// Number of next questions to list (clamped to the configured maximum)
    #[arg(long)]
    pub(crate) limit: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct BatchArgs {
    /// Write the CSV export to this path instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct BatchRow<'a> {
    session_id: &'a str,
    score: f64,
    portfolio_residual: f64,
    completion_percentage: f64,
    trend: ScoreTrend,
}

fn demo_service(repository: Arc<InMemoryAssessmentRepository>) -> Result<DemoService, AppError> {
    let config = AppConfig::load()?;
    Ok(ScoringEngineService::new(
        repository,
        Arc::new(InMemoryCache::new()),
        config.scoring,
    ))
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = demo_service(Arc::new(seeded_repository()))?;
    let session_id = SessionId(args.session);

    println!("Readiness scoring demo for session {session_id}");
    let result = service
        .calculate_score(CalculateScoreRequest::for_session(session_id.clone()))
        .await?;
    render_score(&result);

    let next = service
        .get_next_questions(NextQuestionsRequest {
            session_id: session_id.clone(),
            limit: args.limit,
        })
        .await?;
    if next.questions.is_empty() {
        println!("\nNext questions: none, every question is fully covered");
    } else {
        println!("\nNext questions (max potential score {:.2})", next.max_potential_score);
        for question in &next.questions {
            println!(
                "{:>2}. [{}] {} (+{:.2})",
                question.rank, question.dimension_name, question.text, question.expected_score_lift
            );
            println!("    {}", question.rationale);
        }
    }

    let benchmark = service.get_industry_benchmark(&session_id, None).await?;
    println!(
        "\nBenchmark vs {} cohort ({} sessions): {} | percentile {:.0} | median {:.2} | gap to leading {:.2}",
        benchmark.industry,
        benchmark.benchmark.sample_size,
        benchmark.performance_category.label(),
        benchmark.percentile_rank,
        benchmark.benchmark.median,
        benchmark.gap_to_leading
    );

    let dimensions = service.get_dimension_benchmarks(&session_id).await?;
    if !dimensions.is_empty() {
        println!("\nDimension benchmarks");
        for dimension in &dimensions {
            println!("- {}", dimension.recommendation);
        }
    }

    let heatmap = service.get_heatmap(&session_id).await?;
    println!(
        "\nRisk heatmap: {} cells, {} green / {} amber / {} red, {} critical gaps, overall risk {:.2}",
        heatmap.summary.total_cells,
        heatmap.summary.green_cells,
        heatmap.summary.amber_cells,
        heatmap.summary.red_cells,
        heatmap.summary.critical_gap_count,
        heatmap.summary.overall_risk_score
    );

    let history = service.get_score_history(&session_id, None).await?;
    println!(
        "Trend over {} runs: {:?} (avg change {:+.2}, projected {:.2})",
        history.history.len(),
        history.trend.direction,
        history.trend.average_change,
        history.trend.projected_score
    );

    Ok(())
}

fn render_score(result: &ReadinessScoreResult) {
    println!(
        "Score {:.2} | residual {:.4} | {}/{} answered ({:.1}%) | trend {:?}{}",
        result.score,
        result.portfolio_residual,
        result.answered_questions,
        result.total_questions,
        result.completion_percentage,
        result.trend,
        if result.meets_threshold {
            " | meets readiness threshold"
        } else {
            ""
        }
    );

    println!("\n{:<34} {:>6} {:>9} {:>10} {:>9}", "Dimension", "Weight", "Residual", "Answered", "Coverage");
    for dimension in &result.dimensions {
        if dimension.question_count == 0 {
            println!("{:<34} {:>6.2} {:>9} {:>10} {:>9}", dimension.display_name, dimension.weight, "-", "-", "-");
            continue;
        }
        println!(
            "{:<34} {:>6.2} {:>9.4} {:>10} {:>8.0}%",
            dimension.display_name,
            dimension.weight,
            dimension.residual_risk,
            format!("{}/{}", dimension.answered_count, dimension.question_count),
            dimension.average_coverage * 100.0
        );
    }
}

pub(crate) async fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let repository = Arc::new(seeded_repository());
    let session_ids = repository
        .session_ids()
        .map_err(readiness::scoring::ScoringError::from)?;
    let service = ScoringEngineService::new(
        repository,
        Arc::new(InMemoryCache::new()),
        config.scoring,
    );
    let results = service.calculate_batch_scores(&session_ids).await;

    match args.output {
        Some(path) => write_batch_csv(File::create(path)?, &results),
        None => write_batch_csv(io::stdout().lock(), &results),
    }
}

/// Write one row per scored session, ordered by session id.
pub(crate) fn write_batch_csv<W: Write>(
    writer: W,
    results: &HashMap<SessionId, ReadinessScoreResult>,
) -> Result<(), AppError> {
    let mut rows: Vec<&ReadinessScoreResult> = results.values().collect();
    rows.sort_by(|a, b| a.session_id.cmp(&b.session_id));

    let mut csv = csv::Writer::from_writer(writer);
    for result in rows {
        csv.serialize(BatchRow {
            session_id: result.session_id.as_str(),
            score: result.score,
            portfolio_residual: result.portfolio_residual,
            completion_percentage: result.completion_percentage,
            trend: result.trend,
        })
        .map_err(io::Error::from)?;
    }
    csv.flush()?;
    Ok(())
}
