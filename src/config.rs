//! Configuration file parsing
//!
//! `config.txt` holds one `key value` pair per line; `#` starts a comment.
//! Unknown keys are ignored with a warning so older files keep loading.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::AnalyticsError;
use crate::reading::TimeZonePolicy;
use crate::units::GlucoseUnit;

const APP_DIR: &str = "aura-analytics";
const CONFIG_FILE: &str = "config.txt";

const DEFAULT_CONFIG: &str = "\
# aura-analytics configuration
#
# Timezone used for hour-of-day statistics (AGP, dawn phenomenon, heatmap).
# Either `utc` or a fixed offset such as `+05:30` or `-08:00`.
timezone utc

# Display unit for summaries and reports: mg/dL or mmol/L
unit mg/dL

# Directory for exported PDF reports (defaults to the documents folder)
# export_dir /path/to/reports
";

/// Configuration loaded from config.txt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub timezone: TimeZonePolicy,
    pub unit: GlucoseUnit,
    pub export_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AnalyticsError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from the data directory, then `./config.txt`, else defaults
    pub fn load_or_default() -> Self {
        Self::load_first(&[config_file_path(), PathBuf::from(CONFIG_FILE)]).unwrap_or_else(|e| {
            warn!("Could not load config: {}. Using defaults.", e);
            Config::default()
        })
    }

    /// First existing file wins; a file that exists but fails to parse is an error
    fn load_first(paths: &[PathBuf]) -> Result<Self, AnalyticsError> {
        let mut last_err = None;
        for path in paths {
            match Self::load(path) {
                Err(AnalyticsError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    last_err = Some(AnalyticsError::Io(e));
                }
                result => return result,
            }
        }
        Err(last_err.unwrap_or(AnalyticsError::MissingArgument("config file")))
    }

    pub fn parse(contents: &str) -> Result<Self, AnalyticsError> {
        let mut config = Config::default();

        for (idx, line) in contents.lines().enumerate() {
            // Skip empty lines and comments
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = Self::parse_line(line) else {
                return Err(AnalyticsError::InvalidConfig {
                    line: idx + 1,
                    reason: format!("expected `key value`, got `{}`", line),
                });
            };

            let invalid = |e: AnalyticsError| AnalyticsError::InvalidConfig {
                line: idx + 1,
                reason: e.to_string(),
            };
            match key {
                "timezone" => config.timezone = value.parse().map_err(invalid)?,
                "unit" => config.unit = value.parse().map_err(invalid)?,
                "export_dir" => config.export_dir = Some(PathBuf::from(value)),
                other => warn!("Ignoring unknown config key `{}` on line {}", other, idx + 1),
            }
        }

        Ok(config)
    }

    /// Parse a single config line, returning (key, value)
    fn parse_line(line: &str) -> Option<(&str, &str)> {
        // Find first whitespace to separate key from value
        let mut parts = line.splitn(2, |c: char| c.is_whitespace());
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();

        if key.is_empty() || value.is_empty() {
            return None;
        }

        Some((key, value))
    }

    /// Write the commented default config
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<(), AnalyticsError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG)?;
        Ok(())
    }

    /// Where PDF reports go by default
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(default_export_dir)
    }
}

/// OS-specific data directory for this application
pub fn get_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn config_file_path() -> PathBuf {
    get_data_dir().join(CONFIG_FILE)
}

pub fn default_export_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn ensure_data_dir() -> Result<PathBuf, AnalyticsError> {
    let dir = get_data_dir();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_parses_to_defaults() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_values_and_comments() {
        let config = Config::parse(
            "# comment\n\ntimezone   +05:30   # user profile zone\nunit mmol/L\nexport_dir /tmp/reports\n",
        )
        .unwrap();
        assert_eq!(config.timezone, TimeZonePolicy::Fixed { offset_minutes: 330 });
        assert_eq!(config.unit, GlucoseUnit::MmolL);
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = Config::parse("theme dark\nunit mg/dL\n").unwrap();
        assert_eq!(config.unit, GlucoseUnit::MgDl);
    }

    #[test]
    fn test_bad_values_report_line() {
        match Config::parse("unit mg/dL\ntimezone Mars/Olympus\n") {
            Err(AnalyticsError::InvalidConfig { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
        assert!(Config::parse("timezone\n").is_err());
    }

    #[test]
    fn test_oversized_timezone_offset_is_config_error() {
        match Config::parse("timezone +40000000\n") {
            Err(AnalyticsError::InvalidConfig { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
        assert!(Config::parse("timezone +-5\n").is_err());
    }

    #[test]
    fn test_malformed_file_is_not_skipped() {
        let dir = std::env::temp_dir().join(format!("aura-analytics-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let broken = dir.join("broken.txt");
        let fallback = dir.join("fallback.txt");
        fs::write(&broken, "unit mg/dL\nunit stones\n").unwrap();
        fs::write(&fallback, "unit mmol/L\n").unwrap();

        match Config::load_first(&[broken, fallback.clone()]) {
            Err(AnalyticsError::InvalidConfig { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }

        // A missing file falls through to the next candidate
        let missing = dir.join("missing.txt");
        let config = Config::load_first(&[missing.clone(), fallback]).unwrap();
        assert_eq!(config.unit, GlucoseUnit::MmolL);
        assert!(matches!(Config::load_first(&[missing]), Err(AnalyticsError::Io(_))));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_paths_live_under_app_dir() {
        assert!(config_file_path().ends_with("aura-analytics/config.txt"));
    }
}
