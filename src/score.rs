//! Health score (0-100)
//!
//! The backend normally supplies the score. The local formula is the fallback
//! used when it doesn't, and must produce the same clamped integer semantics.

use serde::{Deserialize, Serialize};

use crate::stats::{round_half_up, GlucoseStats};

/// Shown when there are too few readings to score
pub const DEMO_SCORE: u8 = 78;

/// Minimum number of readings for the local formula
pub const MIN_READINGS_FOR_SCORE: usize = 3;

/// Where a displayed score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Server,
    Computed,
    /// Too few readings; optimistic placeholder
    Default,
}

/// Display band of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreStatus {
    Excellent,
    Good,
    Fair,
    NeedsAttention,
}

impl ScoreStatus {
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            ScoreStatus::Excellent
        } else if score >= 60 {
            ScoreStatus::Good
        } else if score >= 40 {
            ScoreStatus::Fair
        } else {
            ScoreStatus::NeedsAttention
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreStatus::Excellent => "Excellent",
            ScoreStatus::Good => "Good",
            ScoreStatus::Fair => "Fair",
            ScoreStatus::NeedsAttention => "Needs attention",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthScore {
    pub score: u8,
    pub source: ScoreSource,
    pub status: ScoreStatus,
    pub label: &'static str,
}

impl HealthScore {
    fn new(score: u8, source: ScoreSource) -> Self {
        let status = ScoreStatus::from_score(score);
        Self { score, source, status, label: status.label() }
    }

    /// Server score when present and non-zero, local fallback otherwise
    pub fn resolve(server_score: Option<f64>, stats: &GlucoseStats) -> Self {
        match server_score.filter(|s| s.is_finite() && *s != 0.0) {
            Some(s) => Self::new(clamp_score(s), ScoreSource::Server),
            None => Self::from_stats(stats),
        }
    }

    pub fn from_stats(stats: &GlucoseStats) -> Self {
        if stats.total < MIN_READINGS_FOR_SCORE {
            return Self::new(DEMO_SCORE, ScoreSource::Default);
        }
        Self::new(clamp_score(raw_score(stats)), ScoreSource::Computed)
    }
}

/// Local score before rounding and clamping.
///
/// Penalties use the rounded integer percentages shown on the dashboard.
/// Severe lows and very highs are counted twice: once in the general hypo/high
/// penalty and once in their own.
pub fn raw_score(stats: &GlucoseStats) -> f64 {
    let tir = stats.time_in_range_percent as f64;
    let hypo = stats.hypo_percent as f64;
    let severe_hypo = stats.percentages.very_low as f64;
    let high = stats.hyper_percent as f64;
    let very_high = stats.percentages.very_high as f64;

    100.0
        - (100.0 - tir) * 0.4
        - hypo * 0.5
        - severe_hypo * 0.3
        - high * 0.2
        - very_high * 0.3
}

/// `clamp(round(score), 0, 100)`
pub fn clamp_score(score: f64) -> u8 {
    round_half_up(score).clamp(0.0, 100.0) as u8
}

/// Fallback score straight from mg/dL values
pub fn score_values(values: &[f64]) -> u8 {
    HealthScore::from_stats(&GlucoseStats::from_values(values)).score
}
