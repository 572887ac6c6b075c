use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::span_ms;
use crate::events::Event;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    Cycle,
    Break,
}

impl IntervalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalKind::Cycle => "cycle",
            IntervalKind::Break => "break",
        }
    }
}

/// A completed, immutable span of time.
///
/// `duration_ms == end - start` always holds. For a cycle that was
/// interrupted by breaks, `start` is the logical start (shifted forward by the
/// break time) and `paused_ms` records how far it was shifted, so
/// [`TimeInterval::true_start`] still yields the wall-clock start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub sequence_number: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub paused_ms: u64,
}

impl TimeInterval {
    pub(crate) fn closed(
        sequence_number: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        label: Option<String>,
        paused_ms: u64,
    ) -> Self {
        let end = end.max(start);
        Self {
            sequence_number,
            start,
            end,
            duration_ms: span_ms(start, end),
            label,
            paused_ms,
        }
    }

    /// Wall-clock instant the interval was first started.
    pub fn true_start(&self) -> DateTime<Utc> {
        self.start - Duration::milliseconds(self.paused_ms as i64)
    }

    pub fn is_consistent(&self) -> bool {
        self.sequence_number >= 1
            && self.end >= self.start
            && (self.end - self.start).num_milliseconds() == self.duration_ms as i64
    }
}

/// Where an active shift currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftState {
    Idle,
    ShiftOpen,
    CycleOpen,
    BreakOpen,
    CycleOpenPausedByBreak,
}

/// The mutable shift being timed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveShift {
    pub subject_name: String,
    pub session_start: DateTime<Utc>,
    #[serde(default)]
    pub cycles: Vec<TimeInterval>,
    #[serde(default)]
    pub breaks: Vec<TimeInterval>,
    #[serde(default)]
    pub open_cycle_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open_break_start: Option<DateTime<Utc>>,
    /// Elapsed time of the open cycle frozen when a break interrupted it.
    #[serde(default)]
    pub suspended_cycle_elapsed_ms: Option<u64>,
    /// Break time already folded into `open_cycle_start`.
    #[serde(default)]
    pub cycle_paused_ms: u64,
}

impl ActiveShift {
    pub(crate) fn new(subject_name: String, session_start: DateTime<Utc>) -> Self {
        Self {
            subject_name,
            session_start,
            cycles: Vec::new(),
            breaks: Vec::new(),
            open_cycle_start: None,
            open_break_start: None,
            suspended_cycle_elapsed_ms: None,
            cycle_paused_ms: 0,
        }
    }

    pub fn state(&self) -> ShiftState {
        match (
            self.open_cycle_start.is_some(),
            self.open_break_start.is_some(),
        ) {
            (_, true) if self.suspended_cycle_elapsed_ms.is_some() => {
                ShiftState::CycleOpenPausedByBreak
            }
            (_, true) => ShiftState::BreakOpen,
            (true, false) => ShiftState::CycleOpen,
            (false, false) => ShiftState::ShiftOpen,
        }
    }

    pub fn has_open_cycle(&self) -> bool {
        self.open_cycle_start.is_some()
    }

    pub fn has_open_break(&self) -> bool {
        self.open_break_start.is_some()
    }
}

/// Immutable summary of a shift, produced once at finalization.
///
/// `total_duration_ms` is wall-clock time from shift start to shift end, so
/// idle and break time are included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedShift {
    pub id: SessionId,
    pub subject_name: String,
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub cycles: Vec<TimeInterval>,
    pub breaks: Vec<TimeInterval>,
}

impl FinalizedShift {
    pub fn total_cycle_ms(&self) -> u64 {
        self.cycles.iter().map(|c| c.duration_ms).sum()
    }

    pub fn total_break_ms(&self) -> u64 {
        self.breaks.iter().map(|b| b.duration_ms).sum()
    }

    pub fn average_cycle_ms(&self) -> Option<u64> {
        if self.cycles.is_empty() {
            None
        } else {
            Some(self.total_cycle_ms() / self.cycles.len() as u64)
        }
    }

    pub fn intervals(&self, kind: IntervalKind) -> &[TimeInterval] {
        match kind {
            IntervalKind::Cycle => &self.cycles,
            IntervalKind::Break => &self.breaks,
        }
    }

    /// Event announcing this finalization.
    pub fn ended_event(&self) -> Event {
        Event::ShiftEnded {
            id: self.id.clone(),
            total_duration_ms: self.total_duration_ms,
            cycles: self.cycles.len(),
            breaks: self.breaks.len(),
            at: self.session_end,
        }
    }
}
