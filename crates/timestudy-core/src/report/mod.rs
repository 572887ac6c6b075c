//! Report building and export.
//!
//! A [`Report`] is plain tabular data derived from a finalized shift or a
//! saved stopwatch run. Writers in [`csv_export`] and [`json_export`] turn it
//! into files; other renderers (PDF, spreadsheets) can consume the same value.

pub mod csv_export;
mod format;
pub mod json_export;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use format::{check_datetime_format, format_hms, format_stopwatch, TimestampStyle};

use crate::error::{CoreError, Result};
use crate::session::StoredSession;
use crate::shift::{FinalizedShift, IntervalKind};
use crate::timer::LapSession;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(CoreError::validation(format!(
                "Invalid export format: {s}. Use 'csv' or 'json'"
            ))),
        }
    }
}

impl ExportFormat {
    /// Get file extension for format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// A titled table with a fixed column set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    fn new(title: &str, headers: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    /// Used to name exported files, without extension.
    pub file_stem: String,
    pub summary: Vec<(String, String)>,
    pub tables: Vec<ReportTable>,
}

pub const CYCLE_HEADERS: [&str; 4] = ["Cycle #", "Start Time", "End Time", "Duration"];
pub const BREAK_HEADERS: [&str; 4] = ["Break #", "Start Time", "End Time", "Duration"];
pub const LAP_HEADERS: [&str; 4] = ["Lap #", "Lap Time", "Cumulative Time", "Note"];

impl Report {
    pub fn for_session(session: &StoredSession, style: &TimestampStyle) -> Self {
        match session {
            StoredSession::Shift(shift) => Self::for_shift(shift, style),
            StoredSession::Laps(laps) => Self::for_laps(laps, style),
        }
    }

    /// Shift report: summary plus cycle and break tables. Empty tables are
    /// left out.
    pub fn for_shift(shift: &FinalizedShift, style: &TimestampStyle) -> Self {
        let average = shift
            .average_cycle_ms()
            .map(format_hms)
            .unwrap_or_else(|| "-".into());
        let summary = vec![
            ("Worker Name".into(), shift.subject_name.clone()),
            ("Shift Start".into(), style.render(&shift.session_start)),
            ("Shift End".into(), style.render(&shift.session_end)),
            ("Total Duration".into(), format_hms(shift.total_duration_ms)),
            ("Total Cycles".into(), shift.cycles.len().to_string()),
            ("Total Breaks".into(), shift.breaks.len().to_string()),
            ("Total Cycle Time".into(), format_hms(shift.total_cycle_ms())),
            ("Total Break Time".into(), format_hms(shift.total_break_ms())),
            ("Average Cycle".into(), average),
        ];

        let mut tables = Vec::new();
        for (kind, title, headers) in [
            (IntervalKind::Cycle, "Cycles", &CYCLE_HEADERS),
            (IntervalKind::Break, "Breaks", &BREAK_HEADERS),
        ] {
            let intervals = shift.intervals(kind);
            if intervals.is_empty() {
                continue;
            }
            let mut table = ReportTable::new(title, headers);
            table.rows = intervals
                .iter()
                .map(|i| {
                    vec![
                        i.sequence_number.to_string(),
                        style.render(&i.true_start()),
                        style.render(&i.end),
                        format_hms(i.duration_ms),
                    ]
                })
                .collect();
            tables.push(table);
        }

        Self {
            title: "Shift Time Study Report".into(),
            file_stem: format!(
                "shift-report-{}-{}",
                sanitize(&shift.subject_name),
                shift.session_end.format("%Y-%m-%d")
            ),
            summary,
            tables,
        }
    }

    pub fn for_laps(session: &LapSession, style: &TimestampStyle) -> Self {
        let summary = vec![
            ("Session Name".into(), session.name.clone()),
            ("Started".into(), style.render(&session.start_time)),
            (
                "Ended".into(),
                session
                    .end_time
                    .as_ref()
                    .map(|t| style.render(t))
                    .unwrap_or_else(|| "-".into()),
            ),
            ("Total Laps".into(), session.total_laps.to_string()),
            ("Total Time".into(), format_stopwatch(session.total_ms())),
        ];

        let mut table = ReportTable::new("Laps", &LAP_HEADERS);
        table.rows = session
            .laps
            .iter()
            .map(|lap| {
                vec![
                    lap.sequence_number.to_string(),
                    format_stopwatch(lap.lap_duration_ms),
                    format_stopwatch(lap.cumulative_duration_ms),
                    lap.note.clone(),
                ]
            })
            .collect();

        let date = session.end_time.unwrap_or(session.start_time);
        Self {
            title: "Time Study Stopwatch Report".into(),
            file_stem: format!("stopwatch-{}-{}", sanitize(&session.name), date.format("%Y-%m-%d")),
            summary,
            tables: vec![table],
        }
    }

    pub fn table(&self, title: &str) -> Option<&ReportTable> {
        self.tables.iter().find(|t| t.title == title)
    }
}

/// Writes `report` into `dir` and returns the file path.
pub fn export_report(report: &Report, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", report.file_stem, format.extension()));
    match format {
        ExportFormat::Csv => csv_export::write_report_csv(report, &path)?,
        ExportFormat::Json => json_export::write_report_json(report, &path)?,
    }
    tracing::info!(path = %path.display(), "report exported");
    Ok(path)
}

/// Get the default export directory (Downloads folder or temp dir)
pub fn default_export_directory() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::document_dir)
        .unwrap_or_else(std::env::temp_dir)
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".into()
    } else {
        cleaned
    }
}
