use serde::{Deserialize, Serialize};

use super::super::domain::{round_to, Dimension, QuestionRecord, SessionId};
use super::coverage::{coverage_of, CoverageMap};

const GREEN_CEILING: f64 = 0.05;
const AMBER_CEILING: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBucket {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityBucket {
    pub const fn ordered() -> [Self; 4] {
        [Self::Low, Self::Medium, Self::High, Self::Critical]
    }

    /// Quarter-width buckets; the top bucket also holds severity 1.0.
    pub fn from_severity(severity: f64) -> Self {
        if severity < 0.25 {
            Self::Low
        } else if severity < 0.5 {
            Self::Medium
        } else if severity < 0.75 {
            Self::High
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatColor {
    Green,
    Amber,
    Red,
}

impl HeatColor {
    pub fn from_cell_value(value: f64) -> Self {
        if value <= GREEN_CEILING {
            Self::Green
        } else if value <= AMBER_CEILING {
            Self::Amber
        } else {
            Self::Red
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub dimension_key: String,
    pub dimension_name: String,
    pub severity_bucket: SeverityBucket,
    pub cell_value: f64,
    pub color: HeatColor,
    pub question_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapSummary {
    pub total_cells: usize,
    pub green_cells: usize,
    pub amber_cells: usize,
    pub red_cells: usize,
    /// Critical-severity cells that are also red.
    pub critical_gap_count: usize,
    pub overall_risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapResult {
    pub session_id: SessionId,
    pub cells: Vec<HeatmapCell>,
    pub summary: HeatmapSummary,
}

/// One cell per (dimension, severity bucket), empty buckets included.
///
/// A cell holds the uncovered severity `Σ S·(1−C)` of its questions. It is not
/// normalised, so a bucket with many open questions can exceed 1.
pub fn build_heatmap(
    dimensions: &[Dimension],
    questions: &[QuestionRecord],
    coverage: &CoverageMap,
) -> Vec<HeatmapCell> {
    let mut cells = Vec::with_capacity(dimensions.len() * 4);

    for dimension in dimensions {
        for bucket in SeverityBucket::ordered() {
            let (value, question_count) = questions
                .iter()
                .filter(|question| {
                    question.belongs_to(&dimension.key)
                        && SeverityBucket::from_severity(question.severity()) == bucket
                })
                .fold((0.0, 0), |(value, count), question| {
                    let gap = question.severity() * (1.0 - coverage_of(coverage, question));
                    (value + gap, count + 1)
                });

            cells.push(HeatmapCell {
                dimension_key: dimension.key.clone(),
                dimension_name: dimension.display_name.clone(),
                severity_bucket: bucket,
                cell_value: round_to(value, 4),
                color: HeatColor::from_cell_value(value),
                question_count,
            });
        }
    }

    cells
}

pub fn summarize(cells: &[HeatmapCell]) -> HeatmapSummary {
    let mut summary = cells
        .iter()
        .fold(HeatmapSummary::default(), |mut summary, cell| {
            match cell.color {
                HeatColor::Green => summary.green_cells += 1,
                HeatColor::Amber => summary.amber_cells += 1,
                HeatColor::Red => {
                    summary.red_cells += 1;
                    if cell.severity_bucket == SeverityBucket::Critical {
                        summary.critical_gap_count += 1;
                    }
                }
            }
            summary.overall_risk_score += cell.cell_value;
            summary
        });
    summary.total_cells = cells.len();
    summary.overall_risk_score = round_to(summary.overall_risk_score, 2);
    summary
}
