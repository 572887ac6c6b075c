//! Shift tracker state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> ShiftOpen <-> CycleOpen
//!            |              |
//!        BreakOpen   CycleOpenPausedByBreak
//!            |              |
//!        ShiftOpen      CycleOpen
//! ShiftOpen -> (end_session) -> Idle
//! ```
//!
//! A break that interrupts a running cycle freezes the cycle's elapsed time.
//! When the break ends the cycle's start is moved forward by the break's
//! length, so `end_cycle` can always compute `now - open_cycle_start`.
//!
//! Each transition checks every precondition and consults the confirmation
//! gate before it touches the active shift.

use chrono::Duration;
use tracing::{debug, info};

use super::model::{ActiveShift, FinalizedShift, ShiftState, TimeInterval};
use crate::clock::{span_ms, Clock};
use crate::confirm::Confirmation;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::session::{SessionId, StoredSession};
use crate::storage::SessionStore;

pub const BREAK_INTERRUPT_PROMPT: &str = "Take a break? This will pause the current cycle.";

/// Holds the clock and the single active-shift slot.
#[derive(Debug)]
pub struct ShiftTracker<C: Clock> {
    clock: C,
    active: Option<ActiveShift>,
}

impl<C: Clock> ShiftTracker<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            active: None,
        }
    }

    /// Rebuild a tracker around a previously persisted slot.
    pub fn restore(clock: C, active: Option<ActiveShift>) -> Self {
        Self { clock, active }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> ShiftState {
        self.active
            .as_ref()
            .map(ActiveShift::state)
            .unwrap_or(ShiftState::Idle)
    }

    pub fn active(&self) -> Option<&ActiveShift> {
        self.active.as_ref()
    }

    pub fn into_active(self) -> Option<ActiveShift> {
        self.active
    }

    pub fn shift_elapsed_ms(&self) -> Option<u64> {
        let shift = self.active.as_ref()?;
        Some(span_ms(shift.session_start, self.clock.now()))
    }

    /// Elapsed time of the open cycle, frozen while a break suspends it.
    pub fn current_cycle_elapsed_ms(&self) -> Option<u64> {
        let shift = self.active.as_ref()?;
        if let Some(frozen) = shift.suspended_cycle_elapsed_ms {
            return Some(frozen);
        }
        let start = shift.open_cycle_start?;
        Some(span_ms(start, self.clock.now()))
    }

    pub fn current_break_elapsed_ms(&self) -> Option<u64> {
        let start = self.active.as_ref()?.open_break_start?;
        Some(span_ms(start, self.clock.now()))
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start_session(&mut self, subject_name: &str) -> Result<Event> {
        let name = subject_name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("subject name is required"));
        }
        if self.active.is_some() {
            return Err(CoreError::validation(
                "a shift is already active; end it before starting another",
            ));
        }
        let now = self.clock.now();
        self.active = Some(ActiveShift::new(name.to_string(), now));
        info!(subject = name, "shift started");
        Ok(Event::ShiftStarted {
            subject_name: name.to_string(),
            at: now,
        })
    }

    pub fn start_cycle(&mut self) -> Result<Event> {
        let shift = self.active_mut()?;
        if shift.has_open_cycle() {
            return Err(CoreError::invalid_state("a cycle is already open"));
        }
        if shift.has_open_break() {
            return Err(CoreError::invalid_state(
                "end the current break before starting a cycle",
            ));
        }
        let sequence_number = shift.cycles.len() as u32 + 1;
        let now = self.clock.now();
        let shift = self.active_mut()?;
        shift.open_cycle_start = Some(now);
        shift.cycle_paused_ms = 0;
        debug!(sequence_number, "cycle started");
        Ok(Event::CycleStarted {
            sequence_number,
            at: now,
        })
    }

    pub fn end_cycle(&mut self) -> Result<Event> {
        self.close_cycle(None)
    }

    pub fn end_cycle_with_label(&mut self, label: impl Into<String>) -> Result<Event> {
        let label = label.into();
        let label = if label.trim().is_empty() {
            None
        } else {
            Some(label.trim().to_string())
        };
        self.close_cycle(label)
    }

    /// Opens a break, asking `confirm` first if a cycle is running.
    ///
    /// Returns `Ok(None)` when the operator declines; nothing changes.
    pub fn start_break<G>(&mut self, confirm: &mut G) -> Result<Option<Event>>
    where
        G: Confirmation + ?Sized,
    {
        let shift = self.active_ref()?;
        if shift.has_open_break() {
            return Err(CoreError::invalid_state("a break is already open"));
        }
        let interrupts_cycle = shift.has_open_cycle();
        if interrupts_cycle && !confirm.confirm(BREAK_INTERRUPT_PROMPT) {
            debug!("break declined; cycle keeps running");
            return Ok(None);
        }

        let now = self.clock.now();
        let shift = self.active_mut()?;
        let suspended = match shift.open_cycle_start {
            Some(start) if interrupts_cycle => Some(span_ms(start, now)),
            _ => None,
        };
        shift.suspended_cycle_elapsed_ms = suspended;
        shift.open_break_start = Some(now);
        let sequence_number = shift.breaks.len() as u32 + 1;
        debug!(sequence_number, ?suspended, "break started");
        Ok(Some(Event::BreakStarted {
            sequence_number,
            suspended_cycle_ms: suspended,
            at: now,
        }))
    }

    pub fn end_break(&mut self) -> Result<Event> {
        let now = self.clock.now();
        let shift = self.active_mut()?;
        let start = shift
            .open_break_start
            .ok_or_else(|| CoreError::invalid_state("no break is open"))?;

        let interval =
            TimeInterval::closed(shift.breaks.len() as u32 + 1, start, now, None, 0);
        let sequence_number = interval.sequence_number;
        let duration_ms = interval.duration_ms;
        shift.breaks.push(interval);
        shift.open_break_start = None;

        let cycle_resumed = match shift.suspended_cycle_elapsed_ms.take() {
            Some(elapsed) => {
                shift.open_cycle_start = Some(now - Duration::milliseconds(elapsed as i64));
                shift.cycle_paused_ms += duration_ms;
                true
            }
            None => false,
        };
        debug!(sequence_number, duration_ms, cycle_resumed, "break ended");
        Ok(Event::BreakEnded {
            sequence_number,
            duration_ms,
            cycle_resumed,
            at: now,
        })
    }

    /// Finalizes the shift and writes it to `store`.
    ///
    /// The active slot is cleared only after the store accepted the record.
    pub fn end_session<S>(&mut self, store: &mut S) -> Result<FinalizedShift>
    where
        S: SessionStore + ?Sized,
    {
        let shift = self.active_ref()?;
        if shift.has_open_break() {
            return Err(CoreError::invalid_state(
                "end the current break before ending the shift",
            ));
        }
        if shift.has_open_cycle() {
            return Err(CoreError::invalid_state(
                "end the current cycle before ending the shift",
            ));
        }

        let now = self.clock.now();
        let session_end = now.max(shift.session_start);
        let finalized = FinalizedShift {
            id: SessionId::generate(),
            subject_name: shift.subject_name.clone(),
            session_start: shift.session_start,
            session_end,
            total_duration_ms: span_ms(shift.session_start, session_end),
            cycles: shift.cycles.clone(),
            breaks: shift.breaks.clone(),
        };
        store.put(&StoredSession::Shift(finalized.clone()))?;
        self.active = None;
        info!(
            id = %finalized.id,
            cycles = finalized.cycles.len(),
            breaks = finalized.breaks.len(),
            total_ms = finalized.total_duration_ms,
            "shift finalized"
        );
        Ok(finalized)
    }

    /// Drops the active shift without storing it.
    pub fn abandon(&mut self) -> Option<ActiveShift> {
        let dropped = self.active.take();
        if let Some(shift) = &dropped {
            info!(subject = %shift.subject_name, "shift abandoned");
        }
        dropped
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn close_cycle(&mut self, label: Option<String>) -> Result<Event> {
        let now = self.clock.now();
        let shift = self.active_mut()?;
        if shift.has_open_break() {
            return Err(CoreError::invalid_state(
                "end the current break before ending the cycle",
            ));
        }
        let start = shift
            .open_cycle_start
            .ok_or_else(|| CoreError::invalid_state("no cycle is open"))?;

        let interval = TimeInterval::closed(
            shift.cycles.len() as u32 + 1,
            start,
            now,
            label,
            shift.cycle_paused_ms,
        );
        let sequence_number = interval.sequence_number;
        let duration_ms = interval.duration_ms;
        shift.cycles.push(interval);
        shift.open_cycle_start = None;
        shift.cycle_paused_ms = 0;
        debug!(sequence_number, duration_ms, "cycle ended");
        Ok(Event::CycleEnded {
            sequence_number,
            duration_ms,
            at: now,
        })
    }

    fn active_ref(&self) -> Result<&ActiveShift> {
        self.active
            .as_ref()
            .ok_or_else(|| CoreError::invalid_state("no shift is active"))
    }

    fn active_mut(&mut self) -> Result<&mut ActiveShift> {
        self.active
            .as_mut()
            .ok_or_else(|| CoreError::invalid_state("no shift is active"))
    }
}
