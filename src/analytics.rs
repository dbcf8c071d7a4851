//! One-call analytics over a dashboard payload
//!
//! [`AnalysisContext`] carries everything that used to live in dashboard
//! globals (current user, timezone, server-computed score). Each call is
//! independent; nothing is cached between calls.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::agp::AgpProfile;
use crate::dawn::DawnPhenomenon;
use crate::error::AnalyticsError;
use crate::meals::{ingest_meals, MealAnalysis, MealLog};
use crate::patterns::{analyze_by_time_period, PatternHeatmap, PeriodBreakdown, Trend};
use crate::reading::{self, Reading, TimeZonePolicy};
use crate::risk::RiskIndices;
use crate::score::HealthScore;
use crate::stats::GlucoseStats;
use crate::units::GlucoseZone;

/// Health score block precomputed by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerHealthScore {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub time_in_range_percent: Option<f64>,
    #[serde(default)]
    pub hypo_events_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
}

/// Dashboard payload as served by the backend
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardPayload {
    #[serde(default)]
    pub glucose_readings: Vec<serde_json::Value>,
    #[serde(default)]
    pub health_score: Option<ServerHealthScore>,
    #[serde(default)]
    pub recent_meals: Vec<serde_json::Value>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
}

impl DashboardPayload {
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Valid readings, malformed records dropped
    pub fn readings(&self) -> Vec<Reading> {
        reading::ingest(&self.glucose_readings)
    }

    pub fn meals(&self) -> Vec<MealLog> {
        ingest_meals(&self.recent_meals)
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_profile.as_ref()?.name.as_deref()
    }
}

/// Per-call inputs besides the readings themselves
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisContext {
    pub user_id: Option<i64>,
    pub timezone: TimeZonePolicy,
    pub server_score: Option<ServerHealthScore>,
}

impl AnalysisContext {
    pub fn new(timezone: TimeZonePolicy) -> Self {
        Self { timezone, ..Self::default() }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_server_score(mut self, server_score: Option<ServerHealthScore>) -> Self {
        self.server_score = server_score;
        self
    }
}

/// Zone percentage row for the distribution display
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneShare {
    pub zone: GlucoseZone,
    pub label: &'static str,
    pub range: &'static str,
    pub count: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub user_id: Option<i64>,
    pub generated_at: DateTime<Utc>,
    pub timezone: String,
    pub total_readings: usize,
    pub first_reading: Option<DateTime<Utc>>,
    pub last_reading: Option<DateTime<Utc>>,
    pub latest_glucose: Option<f64>,

    pub health_score: HealthScore,
    /// Server value when supplied, otherwise computed
    pub time_in_range_percent: f64,
    pub stats: GlucoseStats,
    pub zones: Vec<ZoneShare>,
    pub risk: RiskIndices,
    pub risk_label: &'static str,
    pub trend: Trend,

    pub agp: AgpProfile,
    pub dawn_phenomenon: DawnPhenomenon,
    pub dawn_summary: String,
    pub dawn_recommendation: &'static str,

    pub time_periods: Vec<PeriodBreakdown>,
    pub heatmap: PatternHeatmap,
    pub meals: MealAnalysis,
}

/// Run every analysis over a reading series
pub fn analyze(readings: &[Reading], meals: &[MealLog], ctx: &AnalysisContext) -> AnalyticsReport {
    let tz = ctx.timezone;
    let values = reading::values(readings);
    let stats = GlucoseStats::from_values(&values);

    let server = ctx.server_score.as_ref();
    let health_score = HealthScore::resolve(server.and_then(|s| s.score), &stats);
    let time_in_range_percent = server
        .and_then(|s| s.time_in_range_percent)
        .filter(|v| v.is_finite())
        .unwrap_or(stats.time_in_range_percent as f64);

    let risk = RiskIndices::from_values(&values, stats.hypo_percent as f64);
    let dawn_phenomenon = DawnPhenomenon::detect(readings, tz);

    let zones = GlucoseZone::ALL
        .into_iter()
        .map(|zone| ZoneShare {
            zone,
            label: zone.label(),
            range: zone.range_label(),
            count: stats.counts.get(zone),
            percent: stats.percentages.get(zone),
        })
        .collect();

    debug!(
        "Analyzed {} readings for user {:?}: score {} ({:?}), TIR {}%",
        readings.len(),
        ctx.user_id,
        health_score.score,
        health_score.source,
        time_in_range_percent
    );

    AnalyticsReport {
        user_id: ctx.user_id,
        generated_at: Utc::now(),
        timezone: tz.to_string(),
        total_readings: readings.len(),
        first_reading: readings.first().map(|r| r.timestamp),
        last_reading: readings.last().map(|r| r.timestamp),
        latest_glucose: readings.last().map(|r| r.glucose_value),
        health_score,
        time_in_range_percent,
        stats,
        zones,
        risk_label: risk.category.label(),
        risk,
        trend: Trend::from_readings(readings),
        agp: AgpProfile::from_readings(readings, tz),
        dawn_summary: dawn_phenomenon.summary(),
        dawn_recommendation: dawn_phenomenon.recommendation(),
        dawn_phenomenon,
        time_periods: analyze_by_time_period(readings, tz),
        heatmap: PatternHeatmap::from_readings(readings, tz),
        meals: MealAnalysis::analyze(readings, meals),
    }
}

/// Ingest a payload and analyze it; the payload's health score seeds the context
pub fn analyze_payload(payload: &DashboardPayload, ctx: &AnalysisContext) -> AnalyticsReport {
    let readings = payload.readings();
    let meals = payload.meals();
    info!(
        "Analyzing {} readings ({} records) and {} meals",
        readings.len(),
        payload.glucose_readings.len(),
        meals.len()
    );

    let ctx = match (&ctx.server_score, &payload.health_score) {
        (None, Some(server)) => ctx.clone().with_server_score(Some(server.clone())),
        _ => ctx.clone(),
    };
    analyze(&readings, &meals, &ctx)
}
