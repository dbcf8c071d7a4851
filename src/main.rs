//! Aura glucose analytics
//!
//! Reads a dashboard payload (JSON) and prints analytics or writes a PDF report.
//!
//! Usage:
//!   aura-analytics analyze payload.json       - Print the full report as JSON
//!   aura-analytics summary payload.json       - Print a short text summary
//!   aura-analytics report payload.json [pdf]  - Write a PDF report
//!   AURA_DBG=1 aura-analytics analyze -       - Enable debug output, read stdin

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use log::{info, warn};

use aura_analytics::config::{config_file_path, default_export_dir, ensure_data_dir, get_data_dir};
use aura_analytics::export::export_to_pdf;
use aura_analytics::{analyze_payload, AnalysisContext, AnalyticsError, AnalyticsReport, Config, DashboardPayload};

fn main() -> Result<(), AnalyticsError> {
    let args: Vec<String> = env::args().collect();

    // Check for debug mode
    let debug_mode = env::var("AURA_DBG").is_ok();

    // Initialize logger
    if debug_mode {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    }

    // Ensure data directory exists
    if let Err(e) = ensure_data_dir() {
        eprintln!("Warning: Could not create data directory: {}", e);
    }

    // Create default config if it doesn't exist
    let cfg_path = config_file_path();
    if !cfg_path.exists() {
        if let Err(e) = Config::create_default(&cfg_path) {
            warn!("Could not create default config: {}", e);
        }
    }

    let config = Config::load_or_default();

    match args.get(1).map(|s| s.as_str()) {
        Some("analyze") => cmd_analyze(&config, args.get(2))?,
        Some("summary") => cmd_summary(&config, args.get(2))?,
        Some("report") | Some("export") => cmd_report(&config, args.get(2), args.get(3))?,
        Some("path") | Some("paths") => cmd_show_paths(),
        Some("--version") | Some("-V") => {
            println!("aura-analytics {}", env!("CARGO_PKG_VERSION"));
        }
        Some("--help") | Some("-h") | Some("help") | None => print_help(),
        Some(other) => {
            print_help();
            return Err(AnalyticsError::UnknownCommand(other.to_string()));
        }
    }

    Ok(())
}

/// Read the payload from a file, or stdin for `-`
fn load_payload(source: Option<&String>) -> Result<DashboardPayload, AnalyticsError> {
    let source = source.ok_or(AnalyticsError::MissingArgument("payload file"))?;
    let json = if source == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(source)?
    };
    DashboardPayload::from_json(&json)
}

fn run(config: &Config, source: Option<&String>) -> Result<(DashboardPayload, AnalyticsReport), AnalyticsError> {
    let payload = load_payload(source)?;
    let ctx = AnalysisContext::new(config.timezone);
    let report = analyze_payload(&payload, &ctx);
    Ok((payload, report))
}

fn cmd_analyze(config: &Config, source: Option<&String>) -> Result<(), AnalyticsError> {
    let (_, report) = run(config, source)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_summary(config: &Config, source: Option<&String>) -> Result<(), AnalyticsError> {
    let (payload, report) = run(config, source)?;
    let unit = config.unit;

    if let Some(name) = payload.user_name() {
        println!("Patient:         {}", name);
    }
    println!("Readings:        {}", report.total_readings);
    println!(
        "Health score:    {} / 100 ({})",
        report.health_score.score, report.health_score.label
    );
    println!("Time in range:   {:.0}%", report.time_in_range_percent);
    for share in &report.zones {
        println!("  {:<10} {:>3}% ({})", share.label, share.percent, share.count);
    }

    if !report.stats.is_empty() {
        let stats = &report.stats;
        println!("Average:         {}", unit.format(stats.avg));
        println!("Range:           {} - {}", unit.format(stats.min), unit.format(stats.max));
        println!("GMI:             {:.1}%", stats.gmi);
        println!("CV:              {:.1}%", stats.cv);
        println!(
            "Trend:           {} {}",
            report.trend.direction.label(),
            report.trend.direction.arrow()
        );
    }

    println!(
        "Risk:            {} (LBGI {:.2}, HBGI {:.2})",
        report.risk_label, report.risk.lbgi, report.risk.hbgi
    );
    println!("Dawn:            {}", report.dawn_summary);
    println!("                 {}", report.dawn_recommendation);

    if report.meals.summary.meals_analyzed > 0 {
        println!(
            "Meals:           {} analyzed, avg rise {:.1} mg/dL, peak at {} min",
            report.meals.summary.meals_analyzed,
            report.meals.summary.avg_glucose_rise,
            report.meals.summary.avg_time_to_peak
        );
    }
    Ok(())
}

fn cmd_report(config: &Config, source: Option<&String>, output: Option<&String>) -> Result<(), AnalyticsError> {
    let (payload, report) = run(config, source)?;

    let path = match output {
        Some(p) => PathBuf::from(p),
        None => {
            let dir = config.export_dir();
            fs::create_dir_all(&dir)?;
            dir.join(format!("aura_report_{}.pdf", report.generated_at.format("%Y%m%d_%H%M%S")))
        }
    };

    info!("Writing PDF report to {}", path.display());
    export_to_pdf(&path, &report, config.unit, payload.user_name())?;
    eprintln!("Report saved to: {}", path.display());
    Ok(())
}

/// Show data paths
fn cmd_show_paths() {
    println!("Aura Analytics Paths:");
    println!("  Data directory:  {}", get_data_dir().display());
    println!("  Config file:     {}", config_file_path().display());
    println!("  Export default:  {}", default_export_dir().display());
}

fn print_help() {
    eprintln!("Aura Glucose Analytics v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  aura-analytics analyze <payload|->          Print the analytics report as JSON");
    eprintln!("  aura-analytics summary <payload|->          Print a text summary");
    eprintln!("  aura-analytics report <payload|-> [out.pdf] Write a PDF report");
    eprintln!("  aura-analytics path                         Show data file locations");
    eprintln!("  aura-analytics help                         Show this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  AURA_DBG=1                                  Enable debug output");
    eprintln!();
    eprintln!("DATA LOCATIONS:");
    eprintln!("  Config:    {}", config_file_path().display());
}
