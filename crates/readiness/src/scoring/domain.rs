use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity assumed for questions the catalog left unweighted.
pub const DEFAULT_SEVERITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

/// Session as seen by the scoring engine; owned by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: SessionId,
    pub questionnaire_id: String,
    pub status: SessionStatus,
    pub last_score: Option<f64>,
    pub last_scored_at: Option<DateTime<Utc>>,
    pub industry: Option<String>,
}

/// Scoring dimension from the active catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimension {
    pub key: String,
    pub display_name: String,
    pub weight: f64,
}

/// Five-level evidence scale used by respondents and overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoverageLevel {
    None,
    Partial,
    Half,
    Substantial,
    Full,
}

impl CoverageLevel {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::None,
            Self::Partial,
            Self::Half,
            Self::Substantial,
            Self::Full,
        ]
    }

    pub const fn decimal(self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Partial => 0.25,
            Self::Half => 0.5,
            Self::Substantial => 0.75,
            Self::Full => 1.0,
        }
    }

    /// Snap a continuous coverage value onto the grid. Boundaries sit halfway
    /// between levels and belong to the higher level.
    pub fn from_decimal(value: f64) -> Self {
        if value < 0.125 {
            Self::None
        } else if value < 0.375 {
            Self::Partial
        } else if value < 0.625 {
            Self::Half
        } else if value < 0.875 {
            Self::Substantial
        } else {
            Self::Full
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Partial => "Partial",
            Self::Half => "Half",
            Self::Substantial => "Substantial",
            Self::Full => "Full",
        }
    }
}

/// A question joined with the session's stored response, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: String,
    pub text: String,
    pub dimension_key: Option<String>,
    pub severity: Option<f64>,
    pub coverage_level: Option<CoverageLevel>,
    pub coverage_decimal: Option<f64>,
    pub has_response: bool,
}

impl QuestionRecord {
    pub fn severity(&self) -> f64 {
        self.severity.unwrap_or(DEFAULT_SEVERITY)
    }

    pub fn belongs_to(&self, dimension_key: &str) -> bool {
        self.dimension_key.as_deref() == Some(dimension_key)
    }
}

/// Per-invocation coverage substitution used for what-if simulations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageOverride {
    pub question_id: String,
    #[serde(default)]
    pub coverage_level: Option<CoverageLevel>,
    #[serde(default)]
    pub coverage: Option<f64>,
}

impl CoverageOverride {
    pub fn level(question_id: impl Into<String>, level: CoverageLevel) -> Self {
        Self {
            question_id: question_id.into(),
            coverage_level: Some(level),
            coverage: None,
        }
    }

    pub fn decimal(question_id: impl Into<String>, coverage: f64) -> Self {
        Self {
            question_id: question_id.into(),
            coverage_level: None,
            coverage: Some(coverage),
        }
    }

    /// The grid level this override resolves to; `None` when the entry carries no value.
    pub fn resolved_level(&self) -> Option<CoverageLevel> {
        self.coverage_level
            .or_else(|| self.coverage.map(CoverageLevel::from_decimal))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionResidual {
    pub dimension_key: String,
    pub display_name: String,
    pub weight: f64,
    pub residual_risk: f64,
    pub weighted_contribution: f64,
    pub question_count: usize,
    pub answered_count: usize,
    pub average_coverage: f64,
}

impl DimensionResidual {
    pub fn unanswered_count(&self) -> usize {
        self.question_count.saturating_sub(self.answered_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreTrend {
    Up,
    Down,
    Stable,
    First,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessScoreResult {
    pub session_id: SessionId,
    pub score: f64,
    pub portfolio_residual: f64,
    pub dimensions: Vec<DimensionResidual>,
    pub total_questions: usize,
    pub answered_questions: usize,
    pub completion_percentage: f64,
    pub calculated_at: DateTime<Utc>,
    pub trend: ScoreTrend,
    pub meets_threshold: bool,
}

impl ReadinessScoreResult {
    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            timestamp: self.calculated_at,
            score: self.score,
            portfolio_residual: self.portfolio_residual,
            completion_percentage: self.completion_percentage,
        }
    }

    pub fn dimension(&self, key: &str) -> Option<&DimensionResidual> {
        self.dimensions.iter().find(|dim| dim.dimension_key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateScoreRequest {
    pub session_id: SessionId,
    #[serde(default)]
    pub coverage_overrides: Vec<CoverageOverride>,
}

impl CalculateScoreRequest {
    pub fn for_session(session_id: SessionId) -> Self {
        Self {
            session_id,
            coverage_overrides: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextQuestionsRequest {
    pub session_id: SessionId,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizedQuestion {
    pub question_id: String,
    pub text: String,
    pub dimension_key: String,
    pub dimension_name: String,
    pub severity: f64,
    pub current_coverage: f64,
    pub current_coverage_level: CoverageLevel,
    pub expected_score_lift: f64,
    pub rationale: String,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextQuestionsResult {
    pub session_id: SessionId,
    pub current_score: f64,
    pub questions: Vec<PrioritizedQuestion>,
    pub max_potential_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchScoreRequest {
    pub session_ids: Vec<SessionId>,
}

/// Historical score point consumed by the trend analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSnapshot {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub portfolio_residual: f64,
    pub completion_percentage: f64,
}

/// Historical mean residual for one dimension across past scoring runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionAverage {
    pub dimension_key: String,
    pub average_residual: f64,
    pub sample_size: usize,
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
