pub mod config;
pub mod export;
pub mod history;
pub mod shift;
pub mod stopwatch;

use std::io::Write;

use serde::de::DeserializeOwned;
use serde::Serialize;
use timestudy_core::storage::Database;
use timestudy_core::{AlwaysApprove, Confirmation};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Loads a persisted engine state from the kv table.
///
/// A value that no longer parses is dropped with a warning.
pub fn load_state<T: DeserializeOwned>(
    db: &Database,
    key: &str,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let Some(json) = db.kv_get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&json) {
        Ok(state) => Ok(Some(state)),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding unreadable saved state");
            Ok(None)
        }
    }
}

/// Writes `state` under `key`, or clears the key when there is none.
pub fn save_state<T: Serialize>(db: &Database, key: &str, state: Option<&T>) -> CommandResult {
    match state {
        Some(state) => db.kv_set(key, &serde_json::to_string(state)?)?,
        None => db.kv_delete(key)?,
    }
    Ok(())
}

/// Printed when the operator answers no to a prompt.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type")]
pub enum Declined {
    BreakDeclined,
    ResetDeclined,
    DeleteDeclined,
}

pub fn print_json<T: Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Interactive y/N prompt on stdin. `--yes` answers for the operator.
pub struct StdinPrompt {
    assume_yes: bool,
}

impl Confirmation for StdinPrompt {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{prompt} [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Picks the confirmation gate for a command.
///
/// With `ask` disabled in the config every prompt is approved.
pub fn gate(ask: bool, assume_yes: bool) -> Box<dyn Confirmation> {
    if ask {
        Box::new(StdinPrompt { assume_yes })
    } else {
        Box::new(AlwaysApprove)
    }
}
