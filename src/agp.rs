//! Ambulatory Glucose Profile
//!
//! Readings from all days are folded onto a 24-hour clock and each hour gets
//! the 10/25/50/75/90th percentiles of its values. Hours without data get
//! placeholder bands so the chart still draws a continuous shape; those hours
//! are flagged in `placeholder` and must not be read as measurements.

use serde::{Deserialize, Serialize};

use crate::reading::{Reading, TimeZonePolicy};
use crate::stats::{percentile, round_to};

pub const HOURS: usize = 24;

/// Percentiles drawn by the chart, lowest first
pub const PERCENTILES: [f64; 5] = [10.0, 25.0, 50.0, 75.0, 90.0];

type Band = [f64; 5];

/// Hour-of-day percentile series, each of length 24
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgpProfile {
    pub p10: Vec<f64>,
    pub p25: Vec<f64>,
    pub p50: Vec<f64>,
    pub p75: Vec<f64>,
    pub p90: Vec<f64>,
    /// Readings per hour
    pub counts: Vec<usize>,
    /// True where the band is a placeholder rather than data
    pub placeholder: Vec<bool>,
}

impl AgpProfile {
    pub fn from_readings(readings: &[Reading], tz: TimeZonePolicy) -> Self {
        let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); HOURS];
        for reading in readings {
            let hour = tz.hour_of(&reading.timestamp) as usize;
            buckets[hour].push(reading.glucose_value);
        }

        let measured: Vec<Option<Band>> = buckets.iter_mut().map(|bucket| bucket_band(bucket)).collect();
        let counts = buckets.iter().map(Vec::len).collect();
        let placeholder: Vec<bool> = measured.iter().map(Option::is_none).collect();

        let bands: Vec<Band> = if measured.iter().all(Option::is_none) {
            (0..HOURS).map(default_band).collect()
        } else {
            (0..HOURS).map(|h| measured[h].unwrap_or_else(|| interpolated_band(&measured, h))).collect()
        };

        let series = |i: usize| bands.iter().map(|b| round_to(b[i], 1)).collect::<Vec<_>>();
        Self {
            p10: series(0),
            p25: series(1),
            p50: series(2),
            p75: series(3),
            p90: series(4),
            counts,
            placeholder,
        }
    }

    /// The five percentiles of one hour, lowest first
    pub fn band(&self, hour: usize) -> Option<Band> {
        if hour >= HOURS {
            return None;
        }
        Some([self.p10[hour], self.p25[hour], self.p50[hour], self.p75[hour], self.p90[hour]])
    }

    /// At least one hour is backed by real readings
    pub fn has_data(&self) -> bool {
        self.placeholder.iter().any(|p| !p)
    }

    pub fn time_labels() -> Vec<String> {
        (0..HOURS).map(|h| format!("{:02}:00", h)).collect()
    }
}

fn bucket_band(values: &mut [f64]) -> Option<Band> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut band = [0.0; 5];
    for (slot, pct) in band.iter_mut().zip(PERCENTILES) {
        *slot = percentile(values, pct)?;
    }
    Some(band)
}

/// Linear blend of the nearest measured hours on either side, wrapping midnight
fn interpolated_band(measured: &[Option<Band>], hour: usize) -> Band {
    let find = |step: usize| {
        (1..HOURS).find_map(|d| {
            let h = (hour + step * d) % HOURS;
            measured[h].map(|band| (d, band))
        })
    };
    // step of HOURS - 1 walks backwards modulo 24
    let (Some((d_prev, prev)), Some((d_next, next))) = (find(HOURS - 1), find(1)) else {
        return default_band(hour);
    };

    let t = d_prev as f64 / (d_prev + d_next) as f64;
    let mut band = [0.0; 5];
    for i in 0..5 {
        band[i] = prev[i] + (next[i] - prev[i]) * t;
    }
    band
}

/// Fixed daily shape used when there is no data at all
fn default_band(hour: usize) -> Band {
    let phase = 2.0 * std::f64::consts::PI * (hour as f64 - 10.0) / HOURS as f64;
    let median = 125.0 + 20.0 * phase.sin();
    [median - 30.0, median - 15.0, median, median + 20.0, median + 45.0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(day: u32, hour: u32, minute: u32, value: f64) -> Reading {
        Reading::new(value, Utc.with_ymd_and_hms(2024, 5, day, hour, minute, 0).unwrap())
    }

    fn assert_monotone(profile: &AgpProfile) {
        for h in 0..HOURS {
            let b = profile.band(h).unwrap();
            assert!(b.windows(2).all(|w| w[0] <= w[1]), "hour {} not monotone: {:?}", h, b);
        }
    }

    #[test]
    fn test_percentiles_for_one_hour() {
        let readings: Vec<Reading> = (1..=5).map(|d| at(d, 8, 15, 80.0 + 20.0 * d as f64)).collect();
        // 100, 120, 140, 160, 180
        let profile = AgpProfile::from_readings(&readings, TimeZonePolicy::Utc);
        assert_eq!(profile.band(8), Some([108.0, 120.0, 140.0, 160.0, 172.0]));
        assert_eq!(profile.counts[8], 5);
        assert!(!profile.placeholder[8]);
        assert!(profile.has_data());
    }

    #[test]
    fn test_monotone_with_mixed_data() {
        let values = [55.0, 240.0, 130.0, 90.0, 310.0, 75.0, 180.0, 66.0, 140.0];
        let mut readings = Vec::new();
        for (i, v) in values.iter().enumerate() {
            readings.push(at(1 + (i as u32 % 5), (i as u32 * 5) % 24, 0, *v));
            readings.push(at(2, (i as u32 * 5) % 24, 30, v * 0.8));
        }
        let profile = AgpProfile::from_readings(&readings, TimeZonePolicy::Utc);
        assert_monotone(&profile);
        assert_eq!(profile.counts.iter().sum::<usize>(), readings.len());
    }

    #[test]
    fn test_empty_series_uses_default_curve() {
        let profile = AgpProfile::from_readings(&[], TimeZonePolicy::Utc);
        assert!(!profile.has_data());
        assert!(profile.placeholder.iter().all(|p| *p));
        assert_eq!(profile.p50.len(), HOURS);
        assert_monotone(&profile);
        assert!(profile.p50.iter().all(|v| v.is_finite() && *v > 0.0));
    }

    #[test]
    fn test_gap_is_interpolated_between_neighbours() {
        let readings = vec![at(1, 4, 0, 100.0), at(1, 6, 0, 140.0)];
        let profile = AgpProfile::from_readings(&readings, TimeZonePolicy::Utc);
        assert!(profile.placeholder[5]);
        assert_eq!(profile.p50[5], 120.0);
        assert_monotone(&profile);
    }

    #[test]
    fn test_gap_wraps_around_midnight() {
        let readings = vec![at(1, 22, 0, 100.0), at(1, 1, 0, 160.0)];
        let profile = AgpProfile::from_readings(&readings, TimeZonePolicy::Utc);
        // 23h is 1 from 22h and 2 from 1h
        assert_eq!(profile.p50[23], 120.0);
        assert_eq!(profile.p50[0], 140.0);
    }

    #[test]
    fn test_single_measured_hour_fills_flat() {
        let readings = vec![at(1, 12, 0, 150.0)];
        let profile = AgpProfile::from_readings(&readings, TimeZonePolicy::Utc);
        assert!(profile.p50.iter().all(|v| *v == 150.0));
        assert_eq!(profile.placeholder.iter().filter(|p| !**p).count(), 1);
    }

    #[test]
    fn test_timezone_policy_moves_bucket() {
        let readings = vec![at(1, 23, 30, 100.0)];
        let tz: TimeZonePolicy = "+02:00".parse().unwrap();
        let profile = AgpProfile::from_readings(&readings, tz);
        assert_eq!(profile.counts[1], 1);
        assert_eq!(profile.counts[23], 0);
    }

    #[test]
    fn test_time_labels() {
        let labels = AgpProfile::time_labels();
        assert_eq!(labels.len(), 24);
        assert_eq!(labels[0], "00:00");
        assert_eq!(labels[23], "23:00");
    }
}
