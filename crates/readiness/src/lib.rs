//! Readiness scoring for structured assessment sessions.
//!
//! The [`scoring`] module holds the engine: coverage resolution, residual-risk
//! aggregation, next-question ranking, cohort benchmarks, trend analysis, and the
//! cache/batch plumbing around them. Storage and caching backends are consumed
//! through the traits in [`scoring::repository`] and [`scoring::cache`].

pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
