//! Lap stopwatch engine.
//!
//! The stopwatch is a wall-clock-based state machine. It does not use
//! internal threads - elapsed time is derived from instants read off the
//! injected clock, so any display refresh loop is a pure read.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Running <-> Paused -> (reset) Stopped
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = LapTimer::new(SystemClock);
//! timer.start()?;
//! timer.record_lap(Some("Bolt tightening".into()))?;
//! timer.pause()?;
//! timer.save("Assembly Line A", &mut store)?;
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::lap::{Lap, LapSession};
use crate::clock::{span_ms, Clock};
use crate::confirm::Confirmation;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::session::{SessionId, StoredSession};
use crate::storage::SessionStore;

pub const RESET_PROMPT: &str =
    "This will clear the current session. Data will be lost unless you save first. Continue?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

/// Serializable stopwatch state, independent of the clock.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StopwatchState {
    pub status: TimerStatus,
    /// Instant from which `elapsed = now - reference` while running.
    #[serde(default)]
    pub reference: Option<DateTime<Utc>>,
    /// Elapsed time frozen by the last pause.
    #[serde(default)]
    pub paused_elapsed_ms: u64,
    #[serde(default)]
    pub session_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub laps: Vec<Lap>,
    /// Set once the run has been saved; later saves update the same record.
    #[serde(default)]
    pub saved_id: Option<SessionId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Stopwatch with annotated laps.
#[derive(Debug)]
pub struct LapTimer<C: Clock> {
    clock: C,
    state: StopwatchState,
}

impl<C: Clock> LapTimer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: StopwatchState::default(),
        }
    }

    pub fn restore(clock: C, state: StopwatchState) -> Self {
        Self { clock, state }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        self.state.status
    }

    pub fn state(&self) -> &StopwatchState {
        &self.state
    }

    pub fn into_state(self) -> StopwatchState {
        self.state
    }

    pub fn laps(&self) -> &[Lap] {
        &self.state.laps
    }

    pub fn saved_id(&self) -> Option<&SessionId> {
        self.state.saved_id.as_ref()
    }

    pub fn elapsed_ms(&self) -> u64 {
        match (self.state.status, self.state.reference) {
            (TimerStatus::Running, Some(reference)) => span_ms(reference, self.clock.now()),
            _ => self.state.paused_elapsed_ms,
        }
    }

    pub fn snapshot(&self) -> Event {
        Event::StopwatchSnapshot {
            status: self.state.status,
            elapsed_ms: self.elapsed_ms(),
            laps: self.state.laps.len(),
            saved_id: self.state.saved_id.clone(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Starts a stopped timer or resumes a paused one.
    pub fn start(&mut self) -> Result<Event> {
        let now = self.clock.now();
        match self.state.status {
            TimerStatus::Running => Err(CoreError::invalid_state("stopwatch is already running")),
            TimerStatus::Stopped => {
                self.state.session_start.get_or_insert(now);
                self.state.reference = Some(now);
                self.state.paused_elapsed_ms = 0;
                self.state.status = TimerStatus::Running;
                debug!("stopwatch started");
                Ok(Event::StopwatchStarted { at: now })
            }
            TimerStatus::Paused => {
                let elapsed = self.state.paused_elapsed_ms;
                self.state.reference = Some(now - Duration::milliseconds(elapsed as i64));
                self.state.status = TimerStatus::Running;
                debug!(elapsed_ms = elapsed, "stopwatch resumed");
                Ok(Event::StopwatchResumed {
                    elapsed_ms: elapsed,
                    at: now,
                })
            }
        }
    }

    pub fn pause(&mut self) -> Result<Event> {
        if self.state.status != TimerStatus::Running {
            return Err(CoreError::invalid_state("stopwatch is not running"));
        }
        let now = self.clock.now();
        let elapsed = self.elapsed_ms();
        self.state.paused_elapsed_ms = elapsed;
        self.state.reference = None;
        self.state.status = TimerStatus::Paused;
        debug!(elapsed_ms = elapsed, "stopwatch paused");
        Ok(Event::StopwatchPaused {
            elapsed_ms: elapsed,
            at: now,
        })
    }

    /// Records a lap at the current elapsed time.
    ///
    /// The note may be left empty and filled in later with
    /// [`LapTimer::annotate_lap`].
    pub fn record_lap(&mut self, note: Option<String>) -> Result<Event> {
        if self.state.status != TimerStatus::Running {
            return Err(CoreError::invalid_state("laps can only be recorded while running"));
        }
        let now = self.clock.now();
        let cumulative = self.elapsed_ms();
        let previous = self
            .state
            .laps
            .last()
            .map(|l| l.cumulative_duration_ms)
            .unwrap_or(0);
        if cumulative <= previous {
            return Err(CoreError::invalid_state(
                "no time has elapsed since the previous lap",
            ));
        }

        let lap = Lap {
            sequence_number: self.state.laps.len() as u32 + 1,
            lap_duration_ms: cumulative - previous,
            cumulative_duration_ms: cumulative,
            note: note.map(|n| n.trim().to_string()).unwrap_or_default(),
            recorded_at: now,
        };
        debug!(
            sequence_number = lap.sequence_number,
            lap_ms = lap.lap_duration_ms,
            cumulative_ms = lap.cumulative_duration_ms,
            "lap recorded"
        );
        let event = Event::LapRecorded {
            sequence_number: lap.sequence_number,
            lap_duration_ms: lap.lap_duration_ms,
            cumulative_duration_ms: lap.cumulative_duration_ms,
            at: now,
        };
        self.state.laps.push(lap);
        Ok(event)
    }

    /// Replaces the note of an already recorded lap.
    pub fn annotate_lap(&mut self, sequence_number: u32, note: &str) -> Result<Event> {
        let now = self.clock.now();
        let lap = self
            .state
            .laps
            .iter_mut()
            .find(|l| l.sequence_number == sequence_number)
            .ok_or_else(|| CoreError::not_found(format!("lap #{sequence_number}")))?;
        lap.note = note.trim().to_string();
        Ok(Event::LapAnnotated {
            sequence_number,
            note: lap.note.clone(),
            at: now,
        })
    }

    /// Clears the timer. Not allowed while running.
    ///
    /// Asks `confirm` when laps would be discarded; returns `Ok(None)` on
    /// decline with the timer untouched.
    pub fn reset<G>(&mut self, confirm: &mut G) -> Result<Option<Event>>
    where
        G: Confirmation + ?Sized,
    {
        if self.state.status == TimerStatus::Running {
            return Err(CoreError::invalid_state("pause the stopwatch before resetting"));
        }
        let discarded_laps = self.state.laps.len();
        if discarded_laps > 0 && !confirm.confirm(RESET_PROMPT) {
            debug!("reset declined");
            return Ok(None);
        }
        self.state = StopwatchState::default();
        info!(discarded_laps, "stopwatch reset");
        Ok(Some(Event::StopwatchReset {
            discarded_laps,
            at: self.clock.now(),
        }))
    }

    /// Saves the run under `name`.
    ///
    /// The first save creates a stored session; every later save rewrites
    /// that same session with the current name, end time and laps.
    pub fn save<S>(&mut self, name: &str, store: &mut S) -> Result<Event>
    where
        S: SessionStore + ?Sized,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("session name is required"));
        }
        if self.state.laps.is_empty() {
            return Err(CoreError::validation("no laps recorded"));
        }
        let now = self.clock.now();
        let session = self.build_session(name, now);
        store.put(&StoredSession::Laps(session.clone()))?;

        let first_save = self.state.saved_id.is_none();
        self.state.saved_id = Some(session.id.clone());
        self.state.name = Some(session.name.clone());
        self.state.created_at = Some(session.created_at);
        info!(id = %session.id, laps = session.total_laps, first_save, "stopwatch session saved");
        Ok(Event::SessionSaved {
            id: session.id,
            name: session.name,
            total_laps: session.total_laps,
            at: now,
        })
    }

    /// Rewrites the stored session if this run was saved before.
    pub fn sync<S>(&mut self, store: &mut S) -> Result<Option<Event>>
    where
        S: SessionStore + ?Sized,
    {
        match self.state.name.clone() {
            Some(name) if self.state.saved_id.is_some() => self.save(&name, store).map(Some),
            _ => Ok(None),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn build_session(&self, name: &str, now: DateTime<Utc>) -> LapSession {
        LapSession {
            id: self
                .state
                .saved_id
                .clone()
                .unwrap_or_else(SessionId::generate),
            name: name.to_string(),
            start_time: self.state.session_start.unwrap_or(now),
            end_time: Some(now),
            total_laps: self.state.laps.len(),
            created_at: self.state.created_at.unwrap_or(now),
            laps: self.state.laps.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::confirm::{AlwaysApprove, AlwaysDecline};
    use crate::session::SessionKind;
    use crate::storage::MemoryStore;

    fn timer() -> (ManualClock, LapTimer<ManualClock>) {
        let clock = ManualClock::at_epoch();
        (clock.clone(), LapTimer::new(clock))
    }

    #[test]
    fn start_pause_resume() {
        let (clock, mut t) = timer();
        assert_eq!(t.status(), TimerStatus::Stopped);
        t.start().unwrap();
        assert_eq!(t.status(), TimerStatus::Running);
        clock.advance_ms(1200);
        t.pause().unwrap();
        assert_eq!(t.status(), TimerStatus::Paused);
        clock.advance_ms(5000);
        assert_eq!(t.elapsed_ms(), 1200);
        t.start().unwrap();
        clock.advance_ms(300);
        assert_eq!(t.elapsed_ms(), 1500);
    }

    #[test]
    fn start_while_running_is_invalid() {
        let (_, mut t) = timer();
        t.start().unwrap();
        assert!(matches!(t.start(), Err(CoreError::InvalidState(_))));
    }

    #[test]
    fn laps_follow_elapsed_time() {
        let (clock, mut t) = timer();
        t.start().unwrap();
        for at in [1000, 1500, 1500] {
            clock.advance_ms(at);
            t.record_lap(None).unwrap();
        }
        let laps: Vec<(u32, u64, u64)> = t
            .laps()
            .iter()
            .map(|l| (l.sequence_number, l.lap_duration_ms, l.cumulative_duration_ms))
            .collect();
        assert_eq!(laps, vec![(1, 1000, 1000), (2, 1500, 2500), (3, 1500, 4000)]);
    }

    #[test]
    fn lap_requires_running() {
        let (clock, mut t) = timer();
        assert!(t.record_lap(None).is_err());
        t.start().unwrap();
        clock.advance_ms(10);
        t.pause().unwrap();
        assert!(matches!(t.record_lap(None), Err(CoreError::InvalidState(_))));
    }

    #[test]
    fn zero_length_lap_is_rejected() {
        let (clock, mut t) = timer();
        t.start().unwrap();
        clock.advance_ms(100);
        t.record_lap(None).unwrap();
        assert!(t.record_lap(None).is_err());
        assert_eq!(t.laps().len(), 1);
    }

    #[test]
    fn pause_excludes_paused_time_from_laps() {
        let (clock, mut t) = timer();
        t.start().unwrap();
        clock.advance_ms(1000);
        t.pause().unwrap();
        clock.advance_ms(60_000);
        t.start().unwrap();
        clock.advance_ms(500);
        t.record_lap(None).unwrap();
        assert_eq!(t.laps()[0].cumulative_duration_ms, 1500);
    }

    #[test]
    fn annotate_updates_note_in_place() {
        let (clock, mut t) = timer();
        t.start().unwrap();
        clock.advance_ms(100);
        t.record_lap(None).unwrap();
        t.annotate_lap(1, " Quality check ").unwrap();
        assert_eq!(t.laps()[0].note, "Quality check");
        assert!(matches!(t.annotate_lap(9, "x"), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn reset_rules() {
        let (clock, mut t) = timer();
        t.start().unwrap();
        clock.advance_ms(100);
        t.record_lap(None).unwrap();
        assert!(matches!(
            t.reset(&mut AlwaysApprove),
            Err(CoreError::InvalidState(_))
        ));
        t.pause().unwrap();
        let before = t.state().clone();
        assert!(t.reset(&mut AlwaysDecline).unwrap().is_none());
        assert_eq!(t.state(), &before);
        assert!(t.reset(&mut AlwaysApprove).unwrap().is_some());
        assert_eq!(t.state(), &StopwatchState::default());
        assert_eq!(t.elapsed_ms(), 0);
    }

    #[test]
    fn reset_without_laps_skips_confirmation() {
        let (_, mut t) = timer();
        assert!(t.reset(&mut AlwaysDecline).unwrap().is_some());
    }

    #[test]
    fn save_validates_name_and_laps() {
        let (clock, mut t) = timer();
        let mut store = MemoryStore::new();
        t.start().unwrap();
        assert!(matches!(t.save("Line A", &mut store), Err(CoreError::Validation(_))));
        clock.advance_ms(100);
        t.record_lap(None).unwrap();
        assert!(matches!(t.save("  ", &mut store), Err(CoreError::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn resave_updates_same_session() {
        let (clock, mut t) = timer();
        let mut store = MemoryStore::new();
        t.start().unwrap();
        clock.advance_ms(1000);
        t.record_lap(Some("first".into())).unwrap();
        t.save("Line A", &mut store).unwrap();
        let id = t.saved_id().cloned().unwrap();

        clock.advance_ms(1000);
        t.record_lap(None).unwrap();
        t.sync(&mut store).unwrap();
        t.save("Line A (rev)", &mut store).unwrap();

        let sessions = store.list(SessionKind::Stopwatch).unwrap();
        assert_eq!(sessions.len(), 1);
        match &sessions[0] {
            StoredSession::Laps(session) => {
                assert_eq!(session.id, id);
                assert_eq!(session.name, "Line A (rev)");
                assert_eq!(session.total_laps, 2);
                assert!(session.laps_consistent());
                assert_eq!(session.start_time.timestamp_millis(), 0);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn sync_before_first_save_does_nothing() {
        let (clock, mut t) = timer();
        let mut store = MemoryStore::new();
        t.start().unwrap();
        clock.advance_ms(5);
        t.record_lap(None).unwrap();
        assert!(t.sync(&mut store).unwrap().is_none());
        assert!(store.is_empty());
    }
}
