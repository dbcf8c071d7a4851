//! Meal impact on glucose
//!
//! Pairs each logged meal with the readings around it: one pre-meal baseline
//! 15-45 minutes before, and everything up to 150 minutes after.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::reading::{parse_timestamp, NumberOrText, Reading};
use crate::stats::{mean, round_to};

/// Baseline window before the meal, minutes
const PRE_MEAL_WINDOW: (f64, f64) = (-45.0, -15.0);
/// Follow-up window after the meal, minutes (start exclusive)
const POST_MEAL_WINDOW: (f64, f64) = (0.0, 150.0);
/// Target offset for the "2 hour" value
const TWO_HOURS: f64 = 120.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealLog {
    pub timestamp: DateTime<Utc>,
    pub carb_count: f64,
    pub meal_description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawMealLog {
    #[serde(default)]
    timestamp: Option<NumberOrText>,
    #[serde(default)]
    carb_count: Option<NumberOrText>,
    #[serde(default)]
    meal_description: Option<String>,
}

/// Meal logs from raw JSON, skipping entries without a usable timestamp
pub fn ingest_meals(records: &[serde_json::Value]) -> Vec<MealLog> {
    let meals: Vec<MealLog> = records
        .iter()
        .filter_map(|record| serde_json::from_value::<RawMealLog>(record.clone()).ok())
        .filter_map(|raw| {
            Some(MealLog {
                timestamp: parse_timestamp(raw.timestamp.as_ref()?)?,
                carb_count: raw
                    .carb_count
                    .and_then(|c| c.as_f64())
                    .filter(|c| c.is_finite())
                    .unwrap_or(0.0),
                meal_description: raw.meal_description.unwrap_or_else(|| "Unknown".to_string()),
            })
        })
        .collect();

    if meals.len() < records.len() {
        warn!("Skipped {} malformed meal logs", records.len() - meals.len());
    }
    meals
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealImpact {
    pub meal_time: DateTime<Utc>,
    pub description: String,
    pub carbs: f64,
    pub pre_meal_glucose: f64,
    pub peak_glucose: f64,
    pub time_to_peak_min: i64,
    pub glucose_rise: f64,
    pub post_2hr_glucose: f64,
}

impl MealImpact {
    /// `None` without a pre-meal baseline or any follow-up reading
    pub fn for_meal(meal: &MealLog, readings: &[Reading]) -> Option<Self> {
        let mut pre_meal = None;
        let mut post: Vec<(f64, f64)> = Vec::new();

        for reading in readings {
            let minutes = (reading.timestamp - meal.timestamp).num_seconds() as f64 / 60.0;
            if (PRE_MEAL_WINDOW.0..=PRE_MEAL_WINDOW.1).contains(&minutes) {
                pre_meal = Some(reading.glucose_value);
            } else if minutes > POST_MEAL_WINDOW.0 && minutes <= POST_MEAL_WINDOW.1 {
                post.push((minutes, reading.glucose_value));
            }
        }

        let pre_meal = pre_meal.filter(|v| *v > 0.0)?;
        let (peak_at, peak) = post
            .iter()
            .copied()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;
        let (_, two_hour) = post.iter().copied().min_by(|a, b| {
            (a.0 - TWO_HOURS)
                .abs()
                .partial_cmp(&(b.0 - TWO_HOURS).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

        Some(Self {
            meal_time: meal.timestamp,
            description: meal.meal_description.clone(),
            carbs: meal.carb_count,
            pre_meal_glucose: pre_meal,
            peak_glucose: peak,
            time_to_peak_min: peak_at.round() as i64,
            glucose_rise: round_to(peak - pre_meal, 1),
            post_2hr_glucose: two_hour,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealImpactSummary {
    pub avg_glucose_rise: f64,
    pub avg_time_to_peak: i64,
    pub meals_analyzed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealAnalysis {
    pub meal_impacts: Vec<MealImpact>,
    pub summary: MealImpactSummary,
}

impl MealAnalysis {
    pub fn analyze(readings: &[Reading], meals: &[MealLog]) -> Self {
        let meal_impacts: Vec<MealImpact> =
            meals.iter().filter_map(|meal| MealImpact::for_meal(meal, readings)).collect();

        let summary = if meal_impacts.is_empty() {
            MealImpactSummary::default()
        } else {
            let rises: Vec<f64> = meal_impacts.iter().map(|m| m.glucose_rise).collect();
            let peaks: Vec<f64> = meal_impacts.iter().map(|m| m.time_to_peak_min as f64).collect();
            MealImpactSummary {
                avg_glucose_rise: round_to(mean(&rises), 1),
                avg_time_to_peak: mean(&peaks).round() as i64,
                meals_analyzed: meal_impacts.len(),
            }
        };

        Self { meal_impacts, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn meal_at_noon() -> MealLog {
        MealLog {
            timestamp: Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap(),
            carb_count: 60.0,
            meal_description: "Pasta".to_string(),
        }
    }

    fn around(meal: &MealLog, offsets: &[(i64, f64)]) -> Vec<Reading> {
        offsets
            .iter()
            .map(|&(m, v)| Reading::new(v, meal.timestamp + Duration::minutes(m)))
            .collect()
    }

    #[test]
    fn test_meal_impact() {
        let meal = meal_at_noon();
        let readings = around(&meal, &[(-60, 90.0), (-30, 100.0), (-20, 105.0), (30, 150.0), (60, 180.0), (115, 140.0), (200, 110.0)]);
        let impact = MealImpact::for_meal(&meal, &readings).unwrap();

        // Latest reading in the baseline window wins
        assert_eq!(impact.pre_meal_glucose, 105.0);
        assert_eq!(impact.peak_glucose, 180.0);
        assert_eq!(impact.time_to_peak_min, 60);
        assert_eq!(impact.glucose_rise, 75.0);
        assert_eq!(impact.post_2hr_glucose, 140.0);
        assert_eq!(impact.carbs, 60.0);
    }

    #[test]
    fn test_meal_without_baseline_is_skipped() {
        let meal = meal_at_noon();
        let readings = around(&meal, &[(-10, 100.0), (45, 170.0)]);
        assert!(MealImpact::for_meal(&meal, &readings).is_none());

        let readings = around(&meal, &[(-30, 100.0), (160, 170.0)]);
        assert!(MealImpact::for_meal(&meal, &readings).is_none());
    }

    #[test]
    fn test_summary() {
        let lunch = meal_at_noon();
        let dinner = MealLog { timestamp: lunch.timestamp + Duration::hours(6), ..meal_at_noon() };
        let mut readings = around(&lunch, &[(-30, 100.0), (60, 160.0)]);
        readings.extend(around(&dinner, &[(-30, 110.0), (90, 150.0)]));

        let analysis = MealAnalysis::analyze(&readings, &[lunch, dinner]);
        assert_eq!(analysis.summary.meals_analyzed, 2);
        assert_eq!(analysis.summary.avg_glucose_rise, 50.0);
        assert_eq!(analysis.summary.avg_time_to_peak, 75);
    }

    #[test]
    fn test_no_meals() {
        let analysis = MealAnalysis::analyze(&[], &[]);
        assert!(analysis.meal_impacts.is_empty());
        assert_eq!(analysis.summary, MealImpactSummary::default());
    }

    #[test]
    fn test_ingest_meals() {
        let records = vec![
            json!({"timestamp": "2024-02-10T12:00:00Z", "carb_count": 45, "meal_description": "Oats"}),
            json!({"timestamp": "2024-02-10T18:00:00Z"}),
            json!({"carb_count": 30}),
            json!({"timestamp": "2024-02-10T20:00:00Z", "carb_count": "45", "meal_description": "Rice"}),
            json!({"timestamp": "2024-02-10T21:00:00Z", "carb_count": "a handful"}),
        ];
        let meals = ingest_meals(&records);
        assert_eq!(meals.len(), 4);
        assert_eq!(meals[0].carb_count, 45.0);
        assert_eq!(meals[1].meal_description, "Unknown");
        // Text carb counts are read like numbers; unreadable ones fall back to 0
        assert_eq!(meals[2].carb_count, 45.0);
        assert_eq!(meals[3].carb_count, 0.0);
    }
}
