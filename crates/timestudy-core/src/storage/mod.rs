mod config;
pub mod database;
pub mod migrations;
mod store;

pub use config::{Config, ExportConfig, LoggingConfig, ShiftConfig, StopwatchConfig};
pub use database::Database;
pub use store::{MemoryStore, SessionStore};

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns the directory holding the database and config file.
///
/// `TIMESTUDY_DATA_DIR` overrides the location outright. Otherwise the
/// directory is `~/.config/timestudy[-dev]/`, with TIMESTUDY_ENV=dev
/// selecting the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("TIMESTUDY_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TIMESTUDY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("timestudy-dev")
            } else {
                base_dir.join("timestudy")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
