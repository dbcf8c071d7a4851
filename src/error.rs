//! Error types for the analytics crate
//!
//! The computation modules never fail; these errors come from the layers that
//! touch the outside world (payload files, config, PDF export).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config line {line}: {reason}")]
    InvalidConfig { line: usize, reason: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid glucose unit: {0}")]
    InvalidUnit(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Export error: {0}")]
    Export(String),
}
