//! Identifiers and the record envelope kept by a [`SessionStore`].
//!
//! [`SessionStore`]: crate::storage::SessionStore

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::shift::FinalizedShift;
use crate::timer::LapSession;

/// Opaque identifier of a stored session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Shift,
    Stopwatch,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Shift => "shift",
            SessionKind::Stopwatch => "stopwatch",
        }
    }
}

impl FromStr for SessionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shift" => Ok(SessionKind::Shift),
            "stopwatch" | "laps" => Ok(SessionKind::Stopwatch),
            _ => Err(CoreError::validation(format!(
                "unknown session kind: {s}. Use 'shift' or 'stopwatch'"
            ))),
        }
    }
}

/// A finalized record as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoredSession {
    Shift(FinalizedShift),
    #[serde(rename = "stopwatch")]
    Laps(LapSession),
}

impl StoredSession {
    pub fn id(&self) -> &SessionId {
        match self {
            StoredSession::Shift(shift) => &shift.id,
            StoredSession::Laps(session) => &session.id,
        }
    }

    pub fn kind(&self) -> SessionKind {
        match self {
            StoredSession::Shift(_) => SessionKind::Shift,
            StoredSession::Laps(_) => SessionKind::Stopwatch,
        }
    }

    /// Instant the session began; the store orders listings by it.
    pub fn started_at(&self) -> DateTime<Utc> {
        match self {
            StoredSession::Shift(shift) => shift.session_start,
            StoredSession::Laps(session) => session.start_time,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            StoredSession::Shift(shift) => &shift.subject_name,
            StoredSession::Laps(session) => &session.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("SHIFT".parse::<SessionKind>().unwrap(), SessionKind::Shift);
        assert_eq!("stopwatch".parse::<SessionKind>().unwrap(), SessionKind::Stopwatch);
        assert!("calendar".parse::<SessionKind>().is_err());
    }

    #[test]
    fn session_id_serializes_as_plain_string() {
        let id = SessionId::from("abc-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
    }
}
