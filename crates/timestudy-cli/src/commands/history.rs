use clap::Subcommand;
use serde::Serialize;
use timestudy_core::storage::Database;
use timestudy_core::{
    format_hms, format_stopwatch, Confirmation, CoreError, SessionId, SessionKind, SessionStore,
    StoredSession,
};

use super::{gate, print_json, CommandResult, Declined};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List saved sessions
    List {
        /// Only this kind: shift or stopwatch
        #[arg(long)]
        kind: Option<String>,
    },
    /// Show one saved session in full
    Show {
        /// Session ID
        id: String,
    },
    /// Delete a saved session
    Delete {
        /// Session ID
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Delete every saved session
    Clear {
        /// Required; there is no undo
        #[arg(long)]
        yes: bool,
    },
}

/// One line of `history list`.
#[derive(Serialize)]
struct SessionRow<'a> {
    id: &'a SessionId,
    kind: SessionKind,
    name: &'a str,
    started_at: String,
    entries: usize,
    duration: String,
}

impl<'a> From<&'a StoredSession> for SessionRow<'a> {
    fn from(session: &'a StoredSession) -> Self {
        let (entries, duration) = match session {
            StoredSession::Shift(shift) => {
                (shift.cycles.len(), format_hms(shift.total_duration_ms))
            }
            StoredSession::Laps(laps) => (laps.total_laps, format_stopwatch(laps.total_ms())),
        };
        Self {
            id: session.id(),
            kind: session.kind(),
            name: session.display_name(),
            started_at: session.started_at().to_rfc3339(),
            entries,
            duration,
        }
    }
}

pub fn run(action: HistoryAction) -> CommandResult {
    let mut db = Database::open()?;

    match action {
        HistoryAction::List { kind } => {
            let kinds = match kind {
                Some(kind) => vec![kind.parse::<SessionKind>()?],
                None => vec![SessionKind::Shift, SessionKind::Stopwatch],
            };
            let mut sessions = Vec::new();
            for kind in kinds {
                sessions.extend(db.list(kind)?);
            }
            sessions.sort_by_key(StoredSession::started_at);
            let rows: Vec<SessionRow> = sessions.iter().map(SessionRow::from).collect();
            print_json(&rows)?;
        }
        HistoryAction::Show { id } => {
            let id = SessionId::from(id);
            let session = db
                .get(&id)?
                .ok_or_else(|| CoreError::not_found(format!("session {id}")))?;
            print_json(&session)?;
        }
        HistoryAction::Delete { id, yes } => {
            let id = SessionId::from(id);
            let session = db
                .get(&id)?
                .ok_or_else(|| CoreError::not_found(format!("session {id}")))?;
            let prompt = format!("Delete this {} session?", session.kind().as_str());
            if !gate(true, yes).confirm(&prompt) {
                return print_json(&Declined::DeleteDeclined);
            }
            db.delete(&id)?;
            println!("deleted {id}");
        }
        HistoryAction::Clear { yes } => {
            if !yes {
                return Err(CoreError::validation("history clear needs --yes").into());
            }
            db.delete_all()?;
            println!("history cleared");
        }
    }
    Ok(())
}
