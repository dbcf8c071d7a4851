//! Glucose zones and unit formatting
//!
//! All computations run on mg/dL values as delivered by the backend. mmol/L is
//! a display concern only, derived with the same factor the report uses.
//!
//! Zone thresholds are fixed clinical constants, not user settings.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// mg/dL per mmol/L
pub const MGDL_PER_MMOL: f64 = 18.0;

/// Glucose value in mg/dL (milligrams per deciliter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MgDl(pub f64);

/// Glucose value in mmol/L (millimoles per liter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MmolL(pub f64);

impl MgDl {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{:.0} mg/dL", self.0)
    }

    pub fn to_mmol(self) -> MmolL {
        MmolL(self.0 / MGDL_PER_MMOL)
    }
}

impl MmolL {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{:.1} mmol/L", self.0)
    }
}

/// User's preferred display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlucoseUnit {
    #[serde(rename = "mg/dL")]
    #[default]
    MgDl,
    #[serde(rename = "mmol/L")]
    MmolL,
}

impl GlucoseUnit {
    /// Format an mg/dL value in this unit, with suffix
    pub fn format(self, mg_dl: f64) -> String {
        match self {
            GlucoseUnit::MgDl => MgDl(mg_dl).format(),
            GlucoseUnit::MmolL => MgDl(mg_dl).to_mmol().format(),
        }
    }

    /// Format an mg/dL value in this unit, without suffix
    pub fn format_value(self, mg_dl: f64) -> String {
        match self {
            GlucoseUnit::MgDl => format!("{:.0}", mg_dl),
            GlucoseUnit::MmolL => format!("{:.1}", mg_dl / MGDL_PER_MMOL),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }
}

impl FromStr for GlucoseUnit {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mg/dl" | "mgdl" => Ok(GlucoseUnit::MgDl),
            "mmol/l" | "mmol" => Ok(GlucoseUnit::MmolL),
            other => Err(AnalyticsError::InvalidUnit(other.to_string())),
        }
    }
}

/// Clinical zone boundaries in mg/dL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds;

impl Thresholds {
    /// Level 2 hypoglycemia: anything below is very low
    pub const VERY_LOW: f64 = 54.0;
    /// Lower bound of the target range (inclusive)
    pub const TARGET_LOW: f64 = 70.0;
    /// Upper bound of the target range (inclusive)
    pub const TARGET_HIGH: f64 = 180.0;
    /// Level 2 hyperglycemia: anything above is very high
    pub const VERY_HIGH: f64 = 250.0;

    /// Classify a reading in mg/dL
    pub fn classify(mg_dl: f64) -> GlucoseZone {
        if mg_dl < Self::VERY_LOW {
            GlucoseZone::VeryLow
        } else if mg_dl < Self::TARGET_LOW {
            GlucoseZone::Low
        } else if mg_dl <= Self::TARGET_HIGH {
            GlucoseZone::InRange
        } else if mg_dl <= Self::VERY_HIGH {
            GlucoseZone::High
        } else {
            GlucoseZone::VeryHigh
        }
    }

    pub fn is_in_range(mg_dl: f64) -> bool {
        (Self::TARGET_LOW..=Self::TARGET_HIGH).contains(&mg_dl)
    }

    /// Target range display string for the user's unit
    pub fn format_range(unit: GlucoseUnit) -> String {
        format!(
            "{}-{} {}",
            unit.format_value(Self::TARGET_LOW),
            unit.format_value(Self::TARGET_HIGH),
            unit.label()
        )
    }
}

/// Classification of a glucose value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlucoseZone {
    VeryLow,  // < 54 mg/dL - level 2 hypoglycemia
    Low,      // 54-69
    InRange,  // 70-180
    High,     // 181-250
    VeryHigh, // > 250 mg/dL
}

impl GlucoseZone {
    pub const ALL: [GlucoseZone; 5] = [
        GlucoseZone::VeryLow,
        GlucoseZone::Low,
        GlucoseZone::InRange,
        GlucoseZone::High,
        GlucoseZone::VeryHigh,
    ];

    /// Get a display label for the zone
    pub fn label(self) -> &'static str {
        match self {
            GlucoseZone::VeryLow => "Very Low",
            GlucoseZone::Low => "Low",
            GlucoseZone::InRange => "In Range",
            GlucoseZone::High => "High",
            GlucoseZone::VeryHigh => "Very High",
        }
    }

    /// Range description in mg/dL
    pub fn range_label(self) -> &'static str {
        match self {
            GlucoseZone::VeryLow => "< 54",
            GlucoseZone::Low => "54-69",
            GlucoseZone::InRange => "70-180",
            GlucoseZone::High => "181-250",
            GlucoseZone::VeryHigh => "> 250",
        }
    }

    pub fn is_low(self) -> bool {
        matches!(self, GlucoseZone::VeryLow | GlucoseZone::Low)
    }

    pub fn is_high(self) -> bool {
        matches!(self, GlucoseZone::High | GlucoseZone::VeryHigh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_classification() {
        assert_eq!(Thresholds::classify(50.0), GlucoseZone::VeryLow);
        assert_eq!(Thresholds::classify(54.0), GlucoseZone::Low);
        assert_eq!(Thresholds::classify(69.9), GlucoseZone::Low);
        assert_eq!(Thresholds::classify(100.0), GlucoseZone::InRange);
        assert_eq!(Thresholds::classify(200.0), GlucoseZone::High);
        assert_eq!(Thresholds::classify(250.0), GlucoseZone::High);
        assert_eq!(Thresholds::classify(300.0), GlucoseZone::VeryHigh);
    }

    #[test]
    fn test_zone_sides() {
        let low: Vec<_> = GlucoseZone::ALL.into_iter().filter(|z| z.is_low()).collect();
        let high: Vec<_> = GlucoseZone::ALL.into_iter().filter(|z| z.is_high()).collect();
        assert_eq!(low, [GlucoseZone::VeryLow, GlucoseZone::Low]);
        assert_eq!(high, [GlucoseZone::High, GlucoseZone::VeryHigh]);
        assert!(!GlucoseZone::InRange.is_low() && !GlucoseZone::InRange.is_high());
    }

    #[test]
    fn test_target_bounds_are_inclusive() {
        assert_eq!(Thresholds::classify(70.0), GlucoseZone::InRange);
        assert_eq!(Thresholds::classify(180.0), GlucoseZone::InRange);
        assert!(Thresholds::is_in_range(70.0));
        assert!(Thresholds::is_in_range(180.0));
        assert!(!Thresholds::is_in_range(180.5));
    }

    #[test]
    fn test_unit_formatting() {
        assert_eq!(GlucoseUnit::MgDl.format(180.0), "180 mg/dL");
        assert_eq!(GlucoseUnit::MmolL.format(180.0), "10.0 mmol/L");
        assert_eq!(Thresholds::format_range(GlucoseUnit::MgDl), "70-180 mg/dL");
        assert_eq!(Thresholds::format_range(GlucoseUnit::MmolL), "3.9-10.0 mmol/L");
    }

    #[test]
    fn test_unit_from_str() {
        assert_eq!("mg/dL".parse::<GlucoseUnit>().unwrap(), GlucoseUnit::MgDl);
        assert_eq!("mmol/L".parse::<GlucoseUnit>().unwrap(), GlucoseUnit::MmolL);
        assert!("furlongs".parse::<GlucoseUnit>().is_err());
    }
}
