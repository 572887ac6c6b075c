use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// One timed segment of a stopwatch run.
///
/// `cumulative_duration_ms` is strictly increasing across a run and
/// `lap_duration_ms` is the difference to the previous lap's cumulative time
/// (zero for the first lap's predecessor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lap {
    pub sequence_number: u32,
    pub lap_duration_ms: u64,
    pub cumulative_duration_ms: u64,
    #[serde(default)]
    pub note: String,
    pub recorded_at: DateTime<Utc>,
}

/// A saved stopwatch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapSession {
    pub id: SessionId,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_laps: usize,
    pub created_at: DateTime<Utc>,
    pub laps: Vec<Lap>,
}

impl LapSession {
    /// Checks the lap arithmetic of the whole run.
    pub fn laps_consistent(&self) -> bool {
        let mut previous = 0u64;
        for (index, lap) in self.laps.iter().enumerate() {
            if lap.sequence_number as usize != index + 1
                || lap.cumulative_duration_ms <= previous
                || lap.lap_duration_ms != lap.cumulative_duration_ms - previous
            {
                return false;
            }
            previous = lap.cumulative_duration_ms;
        }
        self.total_laps == self.laps.len()
    }

    pub fn total_ms(&self) -> u64 {
        self.laps.last().map(|l| l.cumulative_duration_ms).unwrap_or(0)
    }
}
