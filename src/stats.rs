//! Statistics calculations for glucose readings
//!
//! Everything here is recomputed from scratch on each call. Zone percentages
//! are rounded independently and are not corrected to sum to 100.

use serde::{Deserialize, Serialize};

use crate::reading::Reading;
use crate::units::{GlucoseZone, Thresholds};

/// Time in range shown for an empty series. Display placeholder, not data.
pub const PLACEHOLDER_TIME_IN_RANGE: u32 = 72;

/// Per-zone reading counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneCounts {
    pub very_low: usize,
    pub low: usize,
    pub in_range: usize,
    pub high: usize,
    pub very_high: usize,
}

impl ZoneCounts {
    /// Single-pass classification of mg/dL values
    pub fn from_values(values: &[f64]) -> Self {
        let mut counts = Self::default();
        for &v in values {
            match Thresholds::classify(v) {
                GlucoseZone::VeryLow => counts.very_low += 1,
                GlucoseZone::Low => counts.low += 1,
                GlucoseZone::InRange => counts.in_range += 1,
                GlucoseZone::High => counts.high += 1,
                GlucoseZone::VeryHigh => counts.very_high += 1,
            }
        }
        counts
    }

    pub fn get(&self, zone: GlucoseZone) -> usize {
        match zone {
            GlucoseZone::VeryLow => self.very_low,
            GlucoseZone::Low => self.low,
            GlucoseZone::InRange => self.in_range,
            GlucoseZone::High => self.high,
            GlucoseZone::VeryHigh => self.very_high,
        }
    }

    pub fn total(&self) -> usize {
        self.very_low + self.low + self.in_range + self.high + self.very_high
    }

    /// Below 70 mg/dL (very low + low)
    pub fn total_low(&self) -> usize {
        self.sum_where(GlucoseZone::is_low)
    }

    /// Above 180 mg/dL (high + very high)
    pub fn total_high(&self) -> usize {
        self.sum_where(GlucoseZone::is_high)
    }

    fn sum_where(&self, pred: fn(GlucoseZone) -> bool) -> usize {
        GlucoseZone::ALL.into_iter().filter(|z| pred(*z)).map(|z| self.get(z)).sum()
    }
}

/// Rounded per-zone percentages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonePercentages {
    pub very_low: u32,
    pub low: u32,
    pub in_range: u32,
    pub high: u32,
    pub very_high: u32,
}

impl ZonePercentages {
    pub fn from_counts(counts: &ZoneCounts, total: usize) -> Self {
        Self {
            very_low: percent_of(counts.very_low, total),
            low: percent_of(counts.low, total),
            in_range: percent_of(counts.in_range, total),
            high: percent_of(counts.high, total),
            very_high: percent_of(counts.very_high, total),
        }
    }

    pub fn get(&self, zone: GlucoseZone) -> u32 {
        match zone {
            GlucoseZone::VeryLow => self.very_low,
            GlucoseZone::Low => self.low,
            GlucoseZone::InRange => self.in_range,
            GlucoseZone::High => self.high,
            GlucoseZone::VeryHigh => self.very_high,
        }
    }
}

/// Snapshot of a reading series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseStats {
    pub total: usize,
    pub counts: ZoneCounts,
    pub percentages: ZonePercentages,
    /// Readings below 70 mg/dL, percent
    pub hypo_percent: u32,
    /// Readings above 180 mg/dL, percent
    pub hyper_percent: u32,
    pub time_in_range_percent: u32,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// Coefficient of variation (population), percent
    pub cv: f64,
    /// Glucose Management Indicator, percent
    pub gmi: f64,
    /// Set on the empty-series default only
    pub placeholder: bool,
}

impl Default for GlucoseStats {
    fn default() -> Self {
        Self {
            total: 0,
            counts: ZoneCounts::default(),
            percentages: ZonePercentages::default(),
            hypo_percent: 0,
            hyper_percent: 0,
            time_in_range_percent: PLACEHOLDER_TIME_IN_RANGE,
            min: 0.0,
            max: 0.0,
            avg: 0.0,
            cv: 0.0,
            gmi: 0.0,
            placeholder: true,
        }
    }
}

impl GlucoseStats {
    pub fn from_readings(readings: &[Reading]) -> Self {
        Self::from_values(&crate::reading::values(readings))
    }

    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let total = values.len();
        let counts = ZoneCounts::from_values(values);
        let percentages = ZonePercentages::from_counts(&counts, total);

        let avg = mean(values);
        let (min, max) = min_max(values);

        Self {
            total,
            counts,
            percentages,
            hypo_percent: percent_of(counts.total_low(), total),
            hyper_percent: percent_of(counts.total_high(), total),
            time_in_range_percent: percentages.in_range,
            min: round_to(min, 2),
            max: round_to(max, 2),
            avg,
            cv: coefficient_of_variation(values),
            gmi: gmi(avg),
            placeholder: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Summary statistics used for time-of-day breakdowns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl DescriptiveStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let count = sorted.len();
        let mean = mean(&sorted);

        Some(Self {
            count,
            mean,
            median: percentile(&sorted, 50.0).unwrap_or(mean),
            std_dev: population_std_dev(&sorted, mean),
            min: sorted[0],
            max: sorted[count - 1],
        })
    }
}

// ============= Helper Functions =============

/// Round half up, matching the dashboard's integer display
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Round to a number of decimals, half away from zero
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

/// Integer percentage of `count` over `total`, 0 when `total` is 0
pub fn percent_of(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    round_half_up(count as f64 / total as f64 * 100.0) as u32
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Population standard deviation (divides by n)
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// 100 * std / mean; 0 when the mean is 0 or the result is not finite
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let avg = mean(values);
    if values.is_empty() || avg == 0.0 {
        return 0.0;
    }
    let cv = 100.0 * population_std_dev(values, avg) / avg;
    if cv.is_finite() {
        cv
    } else {
        0.0
    }
}

/// GMI (%) = 3.31 + 0.02392 x mean glucose (mg/dL), Bergenstal et al. 2018
pub fn gmi(mean_glucose: f64) -> f64 {
    if mean_glucose <= 0.0 || !mean_glucose.is_finite() {
        return 0.0;
    }
    round_to(3.31 + 0.02392 * mean_glucose, 1)
}

/// Linear-interpolation percentile of ascending-sorted values
pub fn percentile(sorted_values: &[f64], pct: f64) -> Option<f64> {
    if sorted_values.is_empty() {
        return None;
    }
    let idx = (pct / 100.0).clamp(0.0, 1.0) * (sorted_values.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    let frac = idx - lo as f64;
    Some(sorted_values[lo] + (sorted_values[hi] - sorted_values[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_is_placeholder() {
        let stats = GlucoseStats::from_values(&[]);
        assert!(stats.placeholder);
        assert!(stats.is_empty());
        assert_eq!(stats.time_in_range_percent, 72);
        assert_eq!(stats.avg, 0.0);
        assert_eq!(stats.cv, 0.0);
    }

    #[test]
    fn test_zone_breakdown() {
        let stats = GlucoseStats::from_values(&[50.0, 65.0, 75.0, 90.0, 200.0, 300.0]);
        assert!(!stats.placeholder);
        assert_eq!(stats.counts.very_low, 1);
        assert_eq!(stats.counts.low, 1);
        assert_eq!(stats.counts.in_range, 2);
        assert_eq!(stats.counts.high, 1);
        assert_eq!(stats.counts.very_high, 1);
        assert_eq!(stats.counts.total(), stats.total);
        assert_eq!(stats.counts.total_low(), 2);
        assert_eq!(stats.counts.total_high(), 2);

        assert_eq!(stats.percentages.very_low, 17);
        assert_eq!(stats.percentages.in_range, 33);
        assert_eq!(stats.hypo_percent, 33);
        assert_eq!(stats.hyper_percent, 33);
        assert_eq!(stats.time_in_range_percent, 33);
        assert_eq!(stats.min, 50.0);
        assert_eq!(stats.max, 300.0);
    }

    #[test]
    fn test_percentages_round_independently() {
        // 1/3 each: 33 + 33 + 33 = 99, left as is
        let stats = GlucoseStats::from_values(&[60.0, 100.0, 200.0]);
        let p = stats.percentages;
        let sum = p.very_low + p.low + p.in_range + p.high + p.very_high;
        assert_eq!(sum, 99);
        assert_eq!(stats.counts.total(), 3);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(percent_of(1, 8), 13); // 12.5
        assert_eq!(percent_of(0, 0), 0);
    }

    #[test]
    fn test_cv_is_population() {
        let stats = GlucoseStats::from_values(&[100.0, 200.0]);
        // std = 50, mean = 150
        assert!((stats.cv - 100.0 / 3.0).abs() < 1e-9);
        assert!((stats.avg - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_cv_degenerate_inputs() {
        assert_eq!(GlucoseStats::from_values(&[120.0, 120.0, 120.0]).cv, 0.0);
        assert_eq!(GlucoseStats::from_values(&[95.0]).cv, 0.0);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
        assert!(coefficient_of_variation(&[-5.0, 5.0]).is_finite());
    }

    #[test]
    fn test_min_max_rounded() {
        let stats = GlucoseStats::from_values(&[101.236, 99.994]);
        assert_eq!(stats.min, 99.99);
        assert_eq!(stats.max, 101.24);
    }

    #[test]
    fn test_gmi() {
        assert_eq!(gmi(154.0), 7.0);
        assert_eq!(gmi(0.0), 0.0);
        assert_eq!(GlucoseStats::from_values(&[154.0]).gmi, 7.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&sorted, 0.0), Some(10.0));
        assert_eq!(percentile(&sorted, 100.0), Some(40.0));
        assert!((percentile(&sorted, 50.0).unwrap() - 25.0).abs() < 1e-9);
        assert!((percentile(&sorted, 10.0).unwrap() - 13.0).abs() < 1e-9);
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&[7.0], 90.0), Some(7.0));
    }

    #[test]
    fn test_descriptive_stats() {
        let stats = DescriptiveStats::from_values(&[140.0, 100.0, 120.0]).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.median, 120.0);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 140.0);
        assert!((stats.mean - 120.0).abs() < 1e-9);
        assert!(DescriptiveStats::from_values(&[]).is_none());
    }
}
