use serde::{Deserialize, Serialize};

use super::super::domain::{round_to, ScoreSnapshot, SessionId};

/// Average per-step change (in points) needed before a history counts as moving.
const DIRECTION_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub average_change: f64,
    pub volatility: f64,
    pub projected_score: f64,
}

impl TrendAnalysis {
    /// Analyse snapshots ordered newest first.
    ///
    /// Volatility is the population standard deviation of consecutive deltas;
    /// the projection is a single step of the average change, not a regression.
    pub fn from_history(history: &[ScoreSnapshot]) -> Self {
        if history.len() < 2 {
            return Self {
                direction: TrendDirection::Stable,
                average_change: 0.0,
                volatility: 0.0,
                projected_score: history.first().map(|snapshot| snapshot.score).unwrap_or(0.0),
            };
        }

        let deltas: Vec<f64> = history
            .windows(2)
            .map(|pair| pair[0].score - pair[1].score)
            .collect();
        let count = deltas.len() as f64;
        let average_change = deltas.iter().sum::<f64>() / count;
        let variance = deltas
            .iter()
            .map(|delta| (delta - average_change).powi(2))
            .sum::<f64>()
            / count;

        let direction = if average_change > DIRECTION_THRESHOLD {
            TrendDirection::Up
        } else if average_change < -DIRECTION_THRESHOLD {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };

        Self {
            direction,
            average_change: round_to(average_change, 2),
            volatility: round_to(variance.sqrt(), 2),
            projected_score: round_to((history[0].score + average_change).clamp(0.0, 100.0), 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreHistoryResult {
    pub session_id: SessionId,
    pub current_score: Option<f64>,
    pub history: Vec<ScoreSnapshot>,
    pub trend: TrendAnalysis,
}
