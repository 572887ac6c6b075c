//! JSON export functionality

use std::path::Path;

use super::Report;
use crate::error::Result;

/// Write a report as pretty-printed JSON
pub fn write_report_json(report: &Report, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}
