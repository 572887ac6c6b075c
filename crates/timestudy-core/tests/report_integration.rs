//! Reports built from real tracker output and written to disk.

use timestudy_core::report::csv_export::report_to_csv_string;
use timestudy_core::{
    export_report, AlwaysApprove, ExportFormat, LapTimer, ManualClock, MemoryStore, Report,
    ShiftTracker, TimestampStyle,
};

fn style() -> TimestampStyle {
    TimestampStyle::utc("%H:%M:%S")
}

fn finished_shift() -> timestudy_core::FinalizedShift {
    let clock = ManualClock::at_epoch();
    let mut tracker = ShiftTracker::new(clock.clone());
    let mut store = MemoryStore::new();
    tracker.start_session("Ana").unwrap();
    tracker.start_cycle().unwrap();
    clock.advance_ms(1000);
    tracker.start_break(&mut AlwaysApprove).unwrap();
    clock.advance_ms(500);
    tracker.end_break().unwrap();
    clock.advance_ms(500);
    tracker.end_cycle().unwrap();
    tracker.end_session(&mut store).unwrap()
}

#[test]
fn shift_report_lists_cycles_and_breaks() {
    let report = Report::for_shift(&finished_shift(), &style());
    let cycles = report.table("Cycles").unwrap();
    assert_eq!(cycles.rows, vec![vec!["1", "00:00:00", "00:00:02", "00:00:01"]]);
    let breaks = report.table("Breaks").unwrap();
    assert_eq!(breaks.rows, vec![vec!["1", "00:00:01", "00:00:01", "00:00:00"]]);
}

#[test]
fn shift_report_exports_as_csv_and_json() {
    let report = Report::for_shift(&finished_shift(), &style());
    let dir = tempfile::tempdir().unwrap();

    let csv_path = export_report(&report, ExportFormat::Csv, dir.path()).unwrap();
    assert_eq!(csv_path.extension().unwrap(), "csv");
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv, report_to_csv_string(&report).unwrap());
    assert!(csv.starts_with("Shift Time Study Report"));

    let json_path = export_report(&report, ExportFormat::Json, dir.path()).unwrap();
    let parsed: Report = serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(parsed, report);
}

#[test]
fn stopwatch_report_into_nested_directory() {
    let clock = ManualClock::at_epoch();
    let mut timer = LapTimer::new(clock.clone());
    let mut store = MemoryStore::new();
    timer.start().unwrap();
    clock.advance_ms(61_005);
    timer.record_lap(Some("Panel fit".into())).unwrap();
    timer.save("Line/B", &mut store).unwrap();

    let session = match timestudy_core::SessionStore::get(&store, timer.saved_id().unwrap()) {
        Ok(Some(timestudy_core::StoredSession::Laps(session))) => session,
        other => panic!("unexpected {other:?}"),
    };
    let report = Report::for_laps(&session, &style());
    assert_eq!(
        report.table("Laps").unwrap().rows[0],
        vec!["1", "01:01.005", "01:01.005", "Panel fit"]
    );

    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("reports").join("june");
    let path = export_report(&report, ExportFormat::Csv, &nested).unwrap();
    assert!(path.starts_with(&nested));
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("stopwatch-Line-B-"));
}
