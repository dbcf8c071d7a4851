//! Glucose analytics engine
//!
//! Turns a series of timestamped glucose readings (mg/dL) into a health
//! score, time-in-range breakdown, variability and risk indices, an hourly
//! ambulatory glucose profile and a dawn-phenomenon check. Supporting
//! analyses cover time-of-day patterns, a weekday/hour heatmap and meal
//! impact. Everything is synchronous and pure; [`analyze`] is the entry point.

pub mod agp;
pub mod analytics;
pub mod config;
pub mod dawn;
pub mod error;
pub mod export;
pub mod meals;
pub mod patterns;
pub mod reading;
pub mod risk;
pub mod score;
pub mod stats;
pub mod units;

pub use analytics::{analyze, analyze_payload, AnalysisContext, AnalyticsReport, DashboardPayload};
pub use config::Config;
pub use error::AnalyticsError;
pub use reading::{Reading, TimeZonePolicy};
pub use units::GlucoseUnit;
