//! Time-of-day patterns and short-term trend

use serde::{Deserialize, Serialize};

use crate::reading::{Reading, TimeZonePolicy};
use crate::stats::{coefficient_of_variation, mean, percent_of, round_to, DescriptiveStats};
use crate::units::Thresholds;

// ============= Trend =============

/// Number of most recent readings the trend looks at
const TREND_WINDOW: usize = 5;
/// mg/dL difference between the window's ends that counts as movement
const TREND_SLOPE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

impl TrendDirection {
    pub fn label(self) -> &'static str {
        match self {
            TrendDirection::Rising => "Rising",
            TrendDirection::Falling => "Falling",
            TrendDirection::Stable => "Stable",
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            TrendDirection::Rising => "↗",
            TrendDirection::Falling => "↘",
            TrendDirection::Stable => "→",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Mean of the last two minus mean of the first two readings in the window
    pub slope: f64,
}

impl Trend {
    /// Trend over the last few readings of a chronological series
    pub fn from_readings(readings: &[Reading]) -> Self {
        if readings.len() < 2 {
            return Self { direction: TrendDirection::Stable, slope: 0.0 };
        }

        let recent = &readings[readings.len().saturating_sub(TREND_WINDOW)..];
        let head: Vec<f64> = recent.iter().take(2).map(|r| r.glucose_value).collect();
        let tail: Vec<f64> = recent.iter().rev().take(2).map(|r| r.glucose_value).collect();
        let slope = mean(&tail) - mean(&head);

        let direction = if slope > TREND_SLOPE {
            TrendDirection::Rising
        } else if slope < -TREND_SLOPE {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        };

        Self { direction, slope }
    }
}

// ============= Time periods =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Night,
    Dawn,
    Morning,
    Afternoon,
    Evening,
    LateNight,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 6] = [
        TimePeriod::Night,
        TimePeriod::Dawn,
        TimePeriod::Morning,
        TimePeriod::Afternoon,
        TimePeriod::Evening,
        TimePeriod::LateNight,
    ];

    /// Start and end hour, end exclusive
    pub fn hours(self) -> (u32, u32) {
        match self {
            TimePeriod::Night => (0, 6),
            TimePeriod::Dawn => (6, 9),
            TimePeriod::Morning => (9, 12),
            TimePeriod::Afternoon => (12, 17),
            TimePeriod::Evening => (17, 21),
            TimePeriod::LateNight => (21, 24),
        }
    }

    pub fn from_hour(hour: u32) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| {
                let (start, end) = p.hours();
                (start..end).contains(&hour)
            })
            .unwrap_or(TimePeriod::Night)
    }

    pub fn label(self) -> &'static str {
        match self {
            TimePeriod::Night => "Night",
            TimePeriod::Dawn => "Dawn",
            TimePeriod::Morning => "Morning",
            TimePeriod::Afternoon => "Afternoon",
            TimePeriod::Evening => "Evening",
            TimePeriod::LateNight => "Late night",
        }
    }
}

/// Statistics for one time-of-day period, rounded to 1 decimal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub time_in_range_percent: u32,
    pub cv: f64,
}

impl PeriodStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let d = DescriptiveStats::from_values(values)?;
        let in_range = values.iter().filter(|&&v| Thresholds::is_in_range(v)).count();
        Some(Self {
            count: d.count,
            mean: round_to(d.mean, 1),
            median: round_to(d.median, 1),
            std_dev: round_to(d.std_dev, 1),
            min: round_to(d.min, 1),
            max: round_to(d.max, 1),
            time_in_range_percent: percent_of(in_range, values.len()),
            cv: round_to(coefficient_of_variation(values), 1),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBreakdown {
    pub period: TimePeriod,
    /// `None` when no readings fall in the period
    pub stats: Option<PeriodStats>,
}

/// Per-period statistics, in [`TimePeriod::ALL`] order
pub fn analyze_by_time_period(readings: &[Reading], tz: TimeZonePolicy) -> Vec<PeriodBreakdown> {
    TimePeriod::ALL
        .into_iter()
        .map(|period| {
            let values: Vec<f64> = readings
                .iter()
                .filter(|r| TimePeriod::from_hour(tz.hour_of(&r.timestamp)) == period)
                .map(|r| r.glucose_value)
                .collect();
            PeriodBreakdown { period, stats: PeriodStats::from_values(&values) }
        })
        .collect()
}

// ============= Heatmap =============

pub const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Mean glucose by weekday (rows, Monday first) and hour (columns)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternHeatmap {
    pub days: Vec<String>,
    pub hours: Vec<u32>,
    pub data: Vec<Vec<Option<f64>>>,
}

impl PatternHeatmap {
    pub fn from_readings(readings: &[Reading], tz: TimeZonePolicy) -> Self {
        let mut cells: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); 24]; 7];
        for reading in readings {
            let day = tz.weekday_of(&reading.timestamp) as usize;
            let hour = tz.hour_of(&reading.timestamp) as usize;
            cells[day][hour].push(reading.glucose_value);
        }

        let data = cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| (!cell.is_empty()).then(|| round_to(mean(cell), 1)))
                    .collect()
            })
            .collect();

        Self {
            days: WEEKDAYS.iter().map(|d| d.to_string()).collect(),
            hours: (0..24).collect(),
            data,
        }
    }

    pub fn cell(&self, weekday: usize, hour: usize) -> Option<f64> {
        self.data.get(weekday)?.get(hour).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(values: &[f64]) -> Vec<Reading> {
        let start = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Reading::new(v, start + Duration::minutes(5 * i as i64)))
            .collect()
    }

    #[test]
    fn test_trend_directions() {
        let rising = Trend::from_readings(&series(&[100.0, 104.0, 110.0, 118.0, 126.0]));
        assert_eq!(rising.direction, TrendDirection::Rising);
        assert!((rising.slope - 20.0).abs() < 1e-9);

        let falling = Trend::from_readings(&series(&[150.0, 140.0, 130.0]));
        assert_eq!(falling.direction, TrendDirection::Falling);

        let stable = Trend::from_readings(&series(&[120.0, 122.0, 119.0, 121.0]));
        assert_eq!(stable.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_trend_uses_last_five_only() {
        // Early spike is outside the window
        let trend = Trend::from_readings(&series(&[300.0, 300.0, 100.0, 100.0, 100.0, 100.0, 100.0]));
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.slope, 0.0);
    }

    #[test]
    fn test_trend_short_series() {
        assert_eq!(Trend::from_readings(&[]).direction, TrendDirection::Stable);
        assert_eq!(Trend::from_readings(&series(&[90.0])).direction, TrendDirection::Stable);
        assert_eq!(TrendDirection::Rising.arrow(), "↗");
    }

    #[test]
    fn test_period_from_hour() {
        assert_eq!(TimePeriod::from_hour(0), TimePeriod::Night);
        assert_eq!(TimePeriod::from_hour(5), TimePeriod::Night);
        assert_eq!(TimePeriod::from_hour(6), TimePeriod::Dawn);
        assert_eq!(TimePeriod::from_hour(12), TimePeriod::Afternoon);
        assert_eq!(TimePeriod::from_hour(17), TimePeriod::Evening);
        assert_eq!(TimePeriod::from_hour(23), TimePeriod::LateNight);
    }

    #[test]
    fn test_analyze_by_time_period() {
        // 08:00 .. 08:10 falls in dawn
        let readings = series(&[100.0, 200.0, 150.0]);
        let periods = analyze_by_time_period(&readings, TimeZonePolicy::Utc);
        assert_eq!(periods.len(), 6);

        let dawn = periods.iter().find(|p| p.period == TimePeriod::Dawn).unwrap();
        let stats = dawn.stats.as_ref().unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, 150.0);
        assert_eq!(stats.median, 150.0);
        assert_eq!(stats.time_in_range_percent, 67);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 200.0);

        let night = periods.iter().find(|p| p.period == TimePeriod::Night).unwrap();
        assert!(night.stats.is_none());
    }

    #[test]
    fn test_heatmap_cells() {
        // 2024-04-01 is a Monday
        let mut readings = series(&[100.0, 120.0]);
        readings.push(Reading::new(200.0, Utc.with_ymd_and_hms(2024, 4, 7, 22, 0, 0).unwrap()));
        let heatmap = PatternHeatmap::from_readings(&readings, TimeZonePolicy::Utc);

        assert_eq!(heatmap.data.len(), 7);
        assert!(heatmap.data.iter().all(|row| row.len() == 24));
        assert_eq!(heatmap.cell(0, 8), Some(110.0));
        assert_eq!(heatmap.cell(6, 22), Some(200.0));
        assert_eq!(heatmap.cell(3, 3), None);
        assert_eq!(heatmap.cell(9, 0), None);
        assert_eq!(heatmap.days[6], "Sun");
    }
}
