use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionId;
use crate::timer::TimerStatus;

/// Every successful transition produces an Event.
/// Front ends print or render them; nothing in the core consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ShiftStarted {
        subject_name: String,
        at: DateTime<Utc>,
    },
    CycleStarted {
        sequence_number: u32,
        at: DateTime<Utc>,
    },
    CycleEnded {
        sequence_number: u32,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    /// `suspended_cycle_ms` is set when the break interrupted a running cycle.
    BreakStarted {
        sequence_number: u32,
        suspended_cycle_ms: Option<u64>,
        at: DateTime<Utc>,
    },
    BreakEnded {
        sequence_number: u32,
        duration_ms: u64,
        cycle_resumed: bool,
        at: DateTime<Utc>,
    },
    ShiftEnded {
        id: SessionId,
        total_duration_ms: u64,
        cycles: usize,
        breaks: usize,
        at: DateTime<Utc>,
    },
    StopwatchStarted {
        at: DateTime<Utc>,
    },
    StopwatchResumed {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    StopwatchPaused {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    LapRecorded {
        sequence_number: u32,
        lap_duration_ms: u64,
        cumulative_duration_ms: u64,
        at: DateTime<Utc>,
    },
    LapAnnotated {
        sequence_number: u32,
        note: String,
        at: DateTime<Utc>,
    },
    StopwatchReset {
        discarded_laps: usize,
        at: DateTime<Utc>,
    },
    SessionSaved {
        id: SessionId,
        name: String,
        total_laps: usize,
        at: DateTime<Utc>,
    },
    /// Read-only view of the stopwatch for display refresh.
    StopwatchSnapshot {
        status: TimerStatus,
        elapsed_ms: u64,
        laps: usize,
        saved_id: Option<SessionId>,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::CycleStarted {
            sequence_number: 3,
            at: DateTime::<Utc>::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CycleStarted");
        assert_eq!(json["sequence_number"], 3);
    }
}
