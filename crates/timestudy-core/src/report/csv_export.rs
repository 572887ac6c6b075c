//! CSV export functionality
//!
//! A report becomes one CSV document: the title row, the summary as
//! key/value rows, then each table preceded by its title and header row.
//! Sections are separated by an empty record.

use std::io::Write;
use std::path::Path;

use csv::{Writer, WriterBuilder};

use super::Report;
use crate::error::Result;

/// Write a report to CSV format
pub fn write_report_csv(report: &Report, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_report(report, file)
}

/// Render a report to an in-memory CSV string.
pub fn report_to_csv_string(report: &Report) -> Result<String> {
    let mut buffer = Vec::new();
    write_report(report, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn write_report<W: Write>(report: &Report, sink: W) -> Result<()> {
    let mut writer: Writer<W> = WriterBuilder::new().flexible(true).from_writer(sink);

    writer.write_record([report.title.as_str()])?;
    for (key, value) in &report.summary {
        writer.write_record([key.as_str(), value.as_str()])?;
    }

    for table in &report.tables {
        writer.write_record([""])?;
        writer.write_record([table.title.as_str()])?;
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportTable;

    fn report() -> Report {
        Report {
            title: "Shift Time Study Report".into(),
            file_stem: "shift".into(),
            summary: vec![("Worker Name".into(), "Ana, Jr.".into())],
            tables: vec![ReportTable {
                title: "Cycles".into(),
                headers: vec!["Cycle #".into(), "Duration".into()],
                rows: vec![vec!["1".into(), "00:00:05".into()]],
            }],
        }
    }

    #[test]
    fn sections_are_written_in_order() {
        let csv = report_to_csv_string(&report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Shift Time Study Report");
        assert_eq!(lines[1], "Worker Name,\"Ana, Jr.\"");
        assert_eq!(lines[3], "Cycles");
        assert_eq!(lines[4], "Cycle #,Duration");
        assert_eq!(lines[5], "1,00:00:05");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report_csv(&report(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Cycle #,Duration"));
    }
}
