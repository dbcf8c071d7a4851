//! Low/High Blood Glucose Index (Kovatchev risk model)
//!
//! Each reading is mapped into a symmetric risk space; negative values weigh
//! toward hypoglycemia (LBGI), positive toward hyperglycemia (HBGI). Both
//! indices are means over the valid readings.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::stats::round_to;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskCategory {
    /// First matching rule wins, most severe first
    pub fn classify(lbgi: f64, hbgi: f64, hypo_percent: f64) -> Self {
        if lbgi >= 10.0 || hypo_percent >= 50.0 {
            RiskCategory::Critical
        } else if lbgi >= 5.0 || hypo_percent >= 20.0 {
            RiskCategory::High
        } else if lbgi >= 2.5 || hbgi >= 5.0 {
            RiskCategory::Moderate
        } else {
            RiskCategory::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Moderate => "Moderate",
            RiskCategory::High => "High",
            RiskCategory::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskIndices {
    pub lbgi: f64,
    pub hbgi: f64,
    /// Readings that contributed (glucose > 0 with a finite transform)
    pub valid_count: usize,
    pub category: RiskCategory,
}

impl RiskIndices {
    /// Compute indices from mg/dL values; `hypo_percent` feeds the category only
    pub fn from_values(values: &[f64], hypo_percent: f64) -> Self {
        let mut lbgi_sum = 0.0;
        let mut hbgi_sum = 0.0;
        let mut n = 0usize;

        for &glucose in values {
            let Some(f) = risk_transform(glucose) else {
                continue;
            };
            let risk = 10.0 * f * f;
            if f < 0.0 {
                lbgi_sum += risk;
            } else {
                hbgi_sum += risk;
            }
            n += 1;
        }

        let (lbgi, hbgi) = if n == 0 {
            (0.0, 0.0)
        } else {
            (lbgi_sum / n as f64, hbgi_sum / n as f64)
        };
        let category = RiskCategory::classify(lbgi, hbgi, hypo_percent);
        debug!("Risk indices: LBGI {:.2}, HBGI {:.2} over {} readings -> {:?}", lbgi, hbgi, n, category);

        Self {
            lbgi: round_to(lbgi, 2),
            hbgi: round_to(hbgi, 2),
            valid_count: n,
            category,
        }
    }
}

/// `f = 1.509 * (ln(g)^1.084 - 5.381)`; `None` for g <= 0 or a non-finite result
pub fn risk_transform(glucose: f64) -> Option<f64> {
    if glucose.is_nan() || glucose <= 0.0 {
        return None;
    }
    let f = 1.509 * (glucose.ln().powf(1.084) - 5.381);
    f.is_finite().then_some(f)
}
