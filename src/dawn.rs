//! Dawn phenomenon detection
//!
//! Compares the mean of readings taken 03:00-05:59 (pre-dawn) with the mean
//! of readings taken 06:00-08:59 (dawn), in the caller's timezone policy.

use serde::{Deserialize, Serialize};

use crate::reading::{Reading, TimeZonePolicy};
use crate::stats::{mean, round_to};

pub const PRE_DAWN_HOURS: std::ops::RangeInclusive<u32> = 3..=5;
pub const DAWN_HOURS: std::ops::RangeInclusive<u32> = 6..=8;

/// Rise (mg/dL) above which the phenomenon is reported
pub const DETECTION_RISE: f64 = 20.0;
/// Rise (mg/dL) above which it is considered significant
pub const SIGNIFICANT_RISE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DawnSeverity {
    Normal,
    Moderate,
    Significant,
}

impl DawnSeverity {
    fn from_rise(rise: f64) -> Self {
        if rise > SIGNIFICANT_RISE {
            DawnSeverity::Significant
        } else if rise > DETECTION_RISE {
            DawnSeverity::Moderate
        } else {
            DawnSeverity::Normal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DawnSeverity::Normal => "normal",
            DawnSeverity::Moderate => "moderate",
            DawnSeverity::Significant => "significant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DawnAnalysis {
    pub pre_dawn_avg: f64,
    pub dawn_avg: f64,
    pub rise: f64,
    pub detected: bool,
    pub severity: DawnSeverity,
    pub pre_dawn_count: usize,
    pub dawn_count: usize,
}

/// Outcome of dawn analysis; missing data is its own state, never zeros
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DawnPhenomenon {
    InsufficientData { pre_dawn_count: usize, dawn_count: usize },
    Analyzed(DawnAnalysis),
}

impl DawnPhenomenon {
    pub fn detect(readings: &[Reading], tz: TimeZonePolicy) -> Self {
        let mut pre_dawn = Vec::new();
        let mut dawn = Vec::new();

        for reading in readings {
            let hour = tz.hour_of(&reading.timestamp);
            if PRE_DAWN_HOURS.contains(&hour) {
                pre_dawn.push(reading.glucose_value);
            } else if DAWN_HOURS.contains(&hour) {
                dawn.push(reading.glucose_value);
            }
        }

        Self::from_windows(&pre_dawn, &dawn)
    }

    /// Analyze already-bucketed pre-dawn and dawn values
    pub fn from_windows(pre_dawn: &[f64], dawn: &[f64]) -> Self {
        if pre_dawn.is_empty() || dawn.is_empty() {
            return DawnPhenomenon::InsufficientData {
                pre_dawn_count: pre_dawn.len(),
                dawn_count: dawn.len(),
            };
        }

        let pre_dawn_avg = mean(pre_dawn);
        let dawn_avg = mean(dawn);
        let rise = dawn_avg - pre_dawn_avg;

        DawnPhenomenon::Analyzed(DawnAnalysis {
            pre_dawn_avg: round_to(pre_dawn_avg, 1),
            dawn_avg: round_to(dawn_avg, 1),
            rise: round_to(rise, 1),
            detected: rise > DETECTION_RISE,
            severity: DawnSeverity::from_rise(rise),
            pre_dawn_count: pre_dawn.len(),
            dawn_count: dawn.len(),
        })
    }

    pub fn detected(&self) -> bool {
        matches!(self, DawnPhenomenon::Analyzed(a) if a.detected)
    }

    pub fn analysis(&self) -> Option<&DawnAnalysis> {
        match self {
            DawnPhenomenon::Analyzed(a) => Some(a),
            DawnPhenomenon::InsufficientData { .. } => None,
        }
    }

    /// One-line summary for the dashboard
    pub fn summary(&self) -> String {
        match self {
            DawnPhenomenon::InsufficientData { .. } => {
                "Insufficient data to analyze dawn phenomenon".to_string()
            }
            DawnPhenomenon::Analyzed(a) if a.detected => format!(
                "Dawn phenomenon detected: glucose rises {:.0} mg/dL from {:.0} (3-6 AM) to {:.0} (6-9 AM)",
                a.rise, a.pre_dawn_avg, a.dawn_avg
            ),
            DawnPhenomenon::Analyzed(a) => format!(
                "No dawn phenomenon: {:+.0} mg/dL change from {:.0} (3-6 AM) to {:.0} (6-9 AM)",
                a.rise, a.pre_dawn_avg, a.dawn_avg
            ),
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            DawnPhenomenon::InsufficientData { .. } => {
                "Log readings between 3 AM and 9 AM to check for a dawn phenomenon"
            }
            DawnPhenomenon::Analyzed(a) if a.detected => {
                "Consider adjusting basal insulin or timing of long-acting insulin"
            }
            DawnPhenomenon::Analyzed(_) => "Dawn glucose patterns appear normal",
        }
    }
}
