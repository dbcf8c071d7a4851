//! PDF export of an analytics report

use printpdf::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::agp::HOURS;
use crate::analytics::AnalyticsReport;
use crate::error::AnalyticsError;
use crate::units::{GlucoseUnit, GlucoseZone, Thresholds};

/// PDF document dimensions (A4)
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;

/// Colors
const COLOR_RED: Color = Color::Rgb(Rgb { r: 0.9, g: 0.3, b: 0.3, icc_profile: None });
const COLOR_GREEN: Color = Color::Rgb(Rgb { r: 0.3, g: 0.7, b: 0.3, icc_profile: None });
const COLOR_ORANGE: Color = Color::Rgb(Rgb { r: 0.9, g: 0.6, b: 0.3, icc_profile: None });
const COLOR_BLUE: Color = Color::Rgb(Rgb { r: 0.3, g: 0.5, b: 0.8, icc_profile: None });
const COLOR_BLACK: Color = Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None });
const COLOR_GRAY: Color = Color::Rgb(Rgb { r: 0.5, g: 0.5, b: 0.5, icc_profile: None });
const COLOR_LIGHT_GRAY: Color = Color::Rgb(Rgb { r: 0.9, g: 0.9, b: 0.9, icc_profile: None });

fn color_tuple(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb { r, g, b, icc_profile: None })
}

/// Render the report and write it to `path`
pub fn export_to_pdf<P: AsRef<Path>>(
    path: P,
    report: &AnalyticsReport,
    unit: GlucoseUnit,
    patient: Option<&str>,
) -> Result<(), AnalyticsError> {
    let bytes = render_pdf(report, unit, patient);

    let mut file = File::create(path.as_ref())
        .map_err(|e| AnalyticsError::Export(format!("Failed to create file: {}", e)))?;
    file.write_all(&bytes)
        .map_err(|e| AnalyticsError::Export(format!("Failed to write PDF: {}", e)))?;

    Ok(())
}

/// Render the report to PDF bytes
pub fn render_pdf(report: &AnalyticsReport, unit: GlucoseUnit, patient: Option<&str>) -> Vec<u8> {
    let mut doc = PdfDocument::new("Aura Health Report");

    let pages = vec![
        PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), build_summary_page(report, unit, patient)),
        PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), build_agp_page(report)),
        PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), build_patterns_page(report, unit)),
    ];
    doc.with_pages(pages);

    let mut warnings = Vec::new();
    doc.save(&PdfSaveOptions::default(), &mut warnings)
}

// Helper to create text operations
fn text_ops(text: &str, size: f32, x: f32, y: f32, font: BuiltinFont, color: Color) -> Vec<Op> {
    vec![
        Op::SetFillColor { col: color },
        Op::StartTextSection,
        Op::SetFontSizeBuiltinFont { size: Pt(size), font },
        Op::SetTextCursor { pos: Point::new(Mm(x), Mm(y)) },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font,
        },
        Op::EndTextSection,
    ]
}

fn line_ops(x1: f32, y1: f32, x2: f32, y2: f32, color: Color, width: f32) -> Vec<Op> {
    vec![
        Op::SetOutlineColor { col: color },
        Op::SetOutlineThickness { pt: Pt(width) },
        Op::DrawLine {
            line: Line {
                points: vec![
                    LinePoint { p: Point::new(Mm(x1), Mm(y1)), bezier: false },
                    LinePoint { p: Point::new(Mm(x2), Mm(y2)), bezier: false },
                ],
                is_closed: false,
            },
        },
    ]
}

fn polygon_fill_ops(points: &[(f32, f32)], color: Color) -> Vec<Op> {
    vec![
        Op::SetFillColor { col: color },
        Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: points
                        .iter()
                        .map(|&(x, y)| LinePoint { p: Point::new(Mm(x), Mm(y)), bezier: false })
                        .collect(),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        },
    ]
}

fn rect_fill_ops(x: f32, y: f32, width: f32, height: f32, color: Color) -> Vec<Op> {
    polygon_fill_ops(&[(x, y), (x + width, y), (x + width, y + height), (x, y + height)], color)
}

fn rect_stroke_ops(x: f32, y: f32, width: f32, height: f32, color: Color, stroke_width: f32) -> Vec<Op> {
    vec![
        Op::SetOutlineColor { col: color },
        Op::SetOutlineThickness { pt: Pt(stroke_width) },
        Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: vec![
                        LinePoint { p: Point::new(Mm(x), Mm(y)), bezier: false },
                        LinePoint { p: Point::new(Mm(x + width), Mm(y)), bezier: false },
                        LinePoint { p: Point::new(Mm(x + width), Mm(y + height)), bezier: false },
                        LinePoint { p: Point::new(Mm(x), Mm(y + height)), bezier: false },
                    ],
                }],
                mode: PaintMode::Stroke,
                winding_order: WindingOrder::NonZero,
            },
        },
    ]
}

fn bar_ops(x: f32, y: f32, width: f32, height: f32, fill_pct: f32, fill_color: Color, bg_color: Color) -> Vec<Op> {
    let mut ops = Vec::new();
    // Background
    ops.extend(rect_fill_ops(x, y, width, height, bg_color));
    // Filled portion
    if fill_pct > 0.0 {
        ops.extend(rect_fill_ops(x, y, width * fill_pct.min(1.0), height, fill_color));
    }
    // Border
    ops.extend(rect_stroke_ops(x, y, width, height, COLOR_GRAY, 0.3));
    ops
}

fn zone_color(zone: GlucoseZone) -> Color {
    match zone {
        GlucoseZone::VeryLow => color_tuple(0.8, 0.2, 0.2),
        GlucoseZone::Low => COLOR_RED,
        GlucoseZone::InRange => COLOR_GREEN,
        GlucoseZone::High => COLOR_ORANGE,
        GlucoseZone::VeryHigh => color_tuple(0.9, 0.3, 0.2),
    }
}

fn score_color(score: u8) -> Color {
    if score >= 60 {
        COLOR_GREEN
    } else if score >= 40 {
        COLOR_ORANGE
    } else {
        COLOR_RED
    }
}

fn build_summary_page(report: &AnalyticsReport, unit: GlucoseUnit, patient: Option<&str>) -> Vec<Op> {
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
    let body = MARGIN_MM + 5.0;

    // Title
    ops.extend(text_ops("Aura Health Report", 24.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
    y -= 10.0;

    let generated = report.generated_at.format("%Y-%m-%d %H:%M UTC").to_string();
    let header = match patient {
        Some(name) => format!("Patient: {}  |  Generated: {}", name, generated),
        None => format!("Generated: {}", generated),
    };
    ops.extend(text_ops(&header, 10.0, MARGIN_MM, y, BuiltinFont::Helvetica, COLOR_GRAY));
    y -= 15.0;

    ops.extend(line_ops(MARGIN_MM, y, PAGE_WIDTH_MM - MARGIN_MM, y, COLOR_GRAY, 0.5));
    y -= 15.0;

    // Health score
    let score = report.health_score;
    ops.extend(text_ops("Health Score", 14.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
    y -= 12.0;
    ops.extend(text_ops(&format!("{} / 100", score.score), 20.0, body, y, BuiltinFont::HelveticaBold, score_color(score.score)));
    ops.extend(text_ops(score.label, 12.0, body + 45.0, y, BuiltinFont::Helvetica, COLOR_BLACK));
    y -= 7.0;
    ops.extend(bar_ops(body, y - 5.0, 120.0, 5.0, score.score as f32 / 100.0, score_color(score.score), COLOR_LIGHT_GRAY));
    y -= 18.0;

    // Summary statistics
    ops.extend(text_ops("Summary Statistics", 14.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
    y -= 10.0;

    let stats = &report.stats;
    if stats.is_empty() {
        ops.extend(text_ops("No readings in this period", 11.0, body, y, BuiltinFont::Helvetica, COLOR_GRAY));
        y -= 15.0;
    } else {
        let range = match (report.first_reading, report.last_reading) {
            (Some(first), Some(last)) => format!("{} to {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d")),
            _ => "N/A".to_string(),
        };
        let lines = [
            format!("Total Readings: {}", report.total_readings),
            format!("Date Range: {}", range),
            format!("Average: {}", unit.format(stats.avg)),
            format!("Minimum: {}   Maximum: {}", unit.format(stats.min), unit.format(stats.max)),
            format!("GMI: {:.1}%   CV: {:.1}%", stats.gmi, stats.cv),
            format!("Trend: {} {}", report.trend.direction.label(), report.trend.direction.arrow()),
        ];
        for line in lines {
            ops.extend(text_ops(&line, 11.0, body, y, BuiltinFont::Helvetica, COLOR_BLACK));
            y -= 7.0;
        }
        y -= 8.0;
    }

    // Time in range
    ops.extend(text_ops(
        &format!("Time in Range ({})  {:.0}%", Thresholds::format_range(unit), report.time_in_range_percent),
        14.0,
        MARGIN_MM,
        y,
        BuiltinFont::HelveticaBold,
        COLOR_BLACK,
    ));
    y -= 12.0;

    let label_width = 45.0;
    let bar_width = 70.0;
    let bar_x = MARGIN_MM + label_width;
    for share in &report.zones {
        ops.extend(text_ops(&format!("{} ({})", share.label, share.range), 9.0, MARGIN_MM, y - 2.0, BuiltinFont::Helvetica, COLOR_BLACK));
        ops.extend(bar_ops(bar_x, y - 4.0, bar_width, 8.0, share.percent as f32 / 100.0, zone_color(share.zone), COLOR_LIGHT_GRAY));
        ops.extend(text_ops(&format!("{}% ({} readings)", share.percent, share.count), 9.0, bar_x + bar_width + 3.0, y - 2.0, BuiltinFont::Helvetica, COLOR_BLACK));
        y -= 10.0;
    }
    y -= 8.0;

    // Risk
    ops.extend(text_ops("Glycemic Risk", 14.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
    y -= 10.0;
    let risk = &report.risk;
    ops.extend(text_ops(
        &format!("LBGI: {:.2}   HBGI: {:.2}   Category: {}", risk.lbgi, risk.hbgi, report.risk_label),
        11.0,
        body,
        y,
        BuiltinFont::Helvetica,
        COLOR_BLACK,
    ));
    y -= 15.0;

    // Dawn phenomenon
    ops.extend(text_ops("Dawn Phenomenon", 14.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
    y -= 10.0;
    let dawn_color = if report.dawn_phenomenon.detected() { COLOR_ORANGE } else { COLOR_BLACK };
    ops.extend(text_ops(&report.dawn_summary, 10.0, body, y, BuiltinFont::Helvetica, dawn_color));
    y -= 7.0;
    ops.extend(text_ops(report.dawn_recommendation, 10.0, body, y, BuiltinFont::HelveticaOblique, COLOR_GRAY));

    // Footer
    ops.extend(text_ops("Page 1 - Summary", 8.0, MARGIN_MM, MARGIN_MM, BuiltinFont::Helvetica, COLOR_GRAY));

    ops
}

fn build_agp_page(report: &AnalyticsReport) -> Vec<Op> {
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    ops.extend(text_ops("Ambulatory Glucose Profile", 16.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
    y -= 8.0;
    ops.extend(text_ops(
        &format!("Hour of day in {}; shaded bands are 10-90% and 25-75%", report.timezone),
        9.0,
        MARGIN_MM,
        y,
        BuiltinFont::Helvetica,
        COLOR_GRAY,
    ));
    y -= 12.0;

    let chart_x = MARGIN_MM + 15.0;
    let chart_y = y - 120.0;
    let chart_width = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - 20.0;
    let chart_height = 100.0;

    ops.extend(rect_stroke_ops(chart_x, chart_y, chart_width, chart_height, COLOR_BLACK, 0.5));

    let y_min: f32 = 40.0;
    let y_max: f32 = 350.0;
    let to_y = |mg_dl: f64| {
        let v = ((mg_dl as f32 - y_min) / (y_max - y_min)) * chart_height;
        chart_y + v.clamp(0.0, chart_height)
    };
    let to_x = |hour: usize| chart_x + chart_width * hour as f32 / (HOURS - 1) as f32;

    for mg_dl in [50.0, 100.0, 150.0, 200.0, 250.0, 300.0] {
        let y_pos = to_y(mg_dl);
        ops.extend(line_ops(chart_x, y_pos, chart_x + chart_width, y_pos, color_tuple(0.85, 0.85, 0.85), 0.3));
        ops.extend(text_ops(&format!("{:.0}", mg_dl), 7.0, MARGIN_MM, y_pos - 1.5, BuiltinFont::Helvetica, COLOR_GRAY));
    }

    let agp = &report.agp;
    let band = |lower: &[f64], upper: &[f64]| -> Vec<(f32, f32)> {
        let mut points: Vec<(f32, f32)> = (0..HOURS).map(|h| (to_x(h), to_y(upper[h]))).collect();
        points.extend((0..HOURS).rev().map(|h| (to_x(h), to_y(lower[h]))));
        points
    };
    ops.extend(polygon_fill_ops(&band(&agp.p10, &agp.p90), color_tuple(0.82, 0.88, 0.96)));
    ops.extend(polygon_fill_ops(&band(&agp.p25, &agp.p75), color_tuple(0.62, 0.74, 0.9)));

    for h in 0..HOURS - 1 {
        let color = if agp.placeholder[h] || agp.placeholder[h + 1] { COLOR_GRAY } else { COLOR_BLUE };
        ops.extend(line_ops(to_x(h), to_y(agp.p50[h]), to_x(h + 1), to_y(agp.p50[h + 1]), color, 1.0));
    }

    // Target range
    ops.extend(line_ops(chart_x, to_y(Thresholds::TARGET_LOW), chart_x + chart_width, to_y(Thresholds::TARGET_LOW), COLOR_RED, 0.8));
    ops.extend(line_ops(chart_x, to_y(Thresholds::TARGET_HIGH), chart_x + chart_width, to_y(Thresholds::TARGET_HIGH), COLOR_ORANGE, 0.8));

    for h in (0..HOURS).step_by(3) {
        ops.extend(text_ops(&format!("{:02}:00", h), 7.0, to_x(h) - 3.0, chart_y - 5.0, BuiltinFont::Helvetica, COLOR_GRAY));
    }

    y = chart_y - 15.0;
    if !agp.has_data() {
        ops.extend(text_ops("No readings: curve shows a placeholder shape only", 10.0, MARGIN_MM, y, BuiltinFont::HelveticaOblique, COLOR_GRAY));
    } else if agp.placeholder.iter().any(|p| *p) {
        let missing = agp.placeholder.iter().filter(|p| **p).count();
        ops.extend(text_ops(
            &format!("{} hour(s) without readings are interpolated (gray median)", missing),
            9.0,
            MARGIN_MM,
            y,
            BuiltinFont::HelveticaOblique,
            COLOR_GRAY,
        ));
    }

    ops.extend(text_ops("Page 2 - Ambulatory Glucose Profile", 8.0, MARGIN_MM, MARGIN_MM, BuiltinFont::Helvetica, COLOR_GRAY));

    ops
}

fn build_patterns_page(report: &AnalyticsReport, unit: GlucoseUnit) -> Vec<Op> {
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    ops.extend(text_ops("Time-of-Day Patterns", 16.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
    y -= 15.0;

    let columns = [MARGIN_MM, MARGIN_MM + 35.0, MARGIN_MM + 55.0, MARGIN_MM + 85.0, MARGIN_MM + 115.0, MARGIN_MM + 145.0];
    let headers = ["Period", "Count", "Mean", "Range", "In range", "CV"];
    for (x, header) in columns.iter().zip(headers) {
        ops.extend(text_ops(header, 10.0, *x, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
    }
    y -= 3.0;
    ops.extend(line_ops(MARGIN_MM, y, PAGE_WIDTH_MM - MARGIN_MM, y, COLOR_GRAY, 0.3));
    y -= 7.0;

    for breakdown in &report.time_periods {
        let (start, end) = breakdown.period.hours();
        let name = format!("{} ({:02}-{:02})", breakdown.period.label(), start, end);
        let cells = match &breakdown.stats {
            Some(s) => [
                name,
                s.count.to_string(),
                unit.format_value(s.mean),
                format!("{}-{}", unit.format_value(s.min), unit.format_value(s.max)),
                format!("{}%", s.time_in_range_percent),
                format!("{:.1}%", s.cv),
            ],
            None => [name, "0".into(), "-".into(), "-".into(), "-".into(), "-".into()],
        };
        for (x, cell) in columns.iter().zip(cells.iter()) {
            ops.extend(text_ops(cell, 9.0, *x, y, BuiltinFont::Helvetica, COLOR_BLACK));
        }
        y -= 7.0;
    }
    y -= 12.0;

    ops.extend(text_ops("Meal Impact", 14.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
    y -= 10.0;

    let meals = &report.meals;
    if meals.meal_impacts.is_empty() {
        ops.extend(text_ops("Insufficient data for meal impact analysis", 10.0, MARGIN_MM + 5.0, y, BuiltinFont::Helvetica, COLOR_GRAY));
    } else {
        ops.extend(text_ops(
            &format!(
                "{} meals analyzed: average rise {:.1} mg/dL, peak after {} min",
                meals.summary.meals_analyzed, meals.summary.avg_glucose_rise, meals.summary.avg_time_to_peak
            ),
            10.0,
            MARGIN_MM + 5.0,
            y,
            BuiltinFont::Helvetica,
            COLOR_BLACK,
        ));
        y -= 10.0;

        for impact in meals.meal_impacts.iter().take(20) {
            let description: String = impact.description.chars().take(40).collect();
            let line = format!(
                "{}  {}  ({:.0} g)  {} -> {}  (+{:.0})",
                impact.meal_time.format("%b %d %H:%M"),
                description,
                impact.carbs,
                unit.format_value(impact.pre_meal_glucose),
                unit.format_value(impact.peak_glucose),
                impact.glucose_rise,
            );
            ops.extend(text_ops(&line, 9.0, MARGIN_MM + 5.0, y, BuiltinFont::Helvetica, COLOR_BLACK));
            y -= 6.0;
        }
    }

    ops.extend(text_ops("Page 3 - Patterns", 8.0, MARGIN_MM, MARGIN_MM, BuiltinFont::Helvetica, COLOR_GRAY));

    ops
}
