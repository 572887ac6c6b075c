use std::path::PathBuf;

use timestudy_core::report::default_export_directory;
use timestudy_core::storage::Database;
use timestudy_core::{
    export_report, Config, CoreError, ExportFormat, Report, SessionId, SessionStore,
    TimestampStyle,
};

use super::CommandResult;

pub fn run(id: String, format: Option<String>, out: Option<PathBuf>) -> CommandResult {
    let db = Database::open()?;
    let config = Config::load_or_default();

    let id = SessionId::from(id);
    let session = db
        .get(&id)?
        .ok_or_else(|| CoreError::not_found(format!("session {id}")))?;

    let format: ExportFormat = format
        .as_deref()
        .unwrap_or(&config.export.default_format)
        .parse()?;
    let dir = out
        .or_else(|| config.export.directory.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_export_directory);
    let style = TimestampStyle::new(
        config.export.datetime_format.clone(),
        config.export.local_time,
    )?;

    let report = Report::for_session(&session, &style);
    let path = export_report(&report, format, &dir)?;
    println!("{}", path.display());
    Ok(())
}
