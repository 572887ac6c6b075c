use clap::Subcommand;
use serde::Serialize;
use timestudy_core::storage::Database;
use timestudy_core::{
    ActiveShift, Config, Event, FinalizedShift, ShiftState, ShiftTracker, SystemClock,
};

use super::{gate, load_state, print_json, save_state, CommandResult, Declined};

const ACTIVE_SHIFT_KEY: &str = "active_shift";

#[derive(Subcommand)]
pub enum ShiftAction {
    /// Start a shift for a worker
    Start {
        /// Worker name
        name: String,
    },
    /// Start a work cycle
    CycleStart,
    /// End the running cycle
    CycleEnd {
        /// Optional label for the cycle
        #[arg(long)]
        label: Option<String>,
    },
    /// Start a break, pausing the running cycle
    BreakStart {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// End the break and resume the paused cycle
    BreakEnd,
    /// End and save the shift
    End,
    /// Print current shift state as JSON
    Status,
}

/// `shift end` output: the event plus the stored record.
#[derive(Serialize)]
struct ShiftEnd<'a> {
    #[serde(flatten)]
    event: Event,
    shift: &'a FinalizedShift,
}

#[derive(Serialize)]
struct ShiftStatus<'a> {
    state: ShiftState,
    shift_elapsed_ms: Option<u64>,
    current_cycle_ms: Option<u64>,
    current_break_ms: Option<u64>,
    shift: Option<&'a ActiveShift>,
}

pub fn run(action: ShiftAction) -> CommandResult {
    let mut db = Database::open()?;
    let config = Config::load_or_default();
    let active = load_state::<ActiveShift>(&db, ACTIVE_SHIFT_KEY)?;
    let mut tracker = ShiftTracker::restore(SystemClock, active);

    match action {
        ShiftAction::Start { name } => print_json(&tracker.start_session(&name)?)?,
        ShiftAction::CycleStart => print_json(&tracker.start_cycle()?)?,
        ShiftAction::CycleEnd { label } => {
            let event = match label {
                Some(label) => tracker.end_cycle_with_label(label)?,
                None => tracker.end_cycle()?,
            };
            print_json(&event)?;
        }
        ShiftAction::BreakStart { yes } => {
            let mut confirm = gate(config.shift.confirm_break_interrupt, yes);
            match tracker.start_break(&mut *confirm)? {
                Some(event) => print_json(&event)?,
                None => print_json(&Declined::BreakDeclined)?,
            }
        }
        ShiftAction::BreakEnd => print_json(&tracker.end_break()?)?,
        ShiftAction::End => {
            let finalized = tracker.end_session(&mut db)?;
            print_json(&ShiftEnd {
                event: finalized.ended_event(),
                shift: &finalized,
            })?;
        }
        ShiftAction::Status => {
            let status = ShiftStatus {
                state: tracker.state(),
                shift_elapsed_ms: tracker.shift_elapsed_ms(),
                current_cycle_ms: tracker.current_cycle_elapsed_ms(),
                current_break_ms: tracker.current_break_elapsed_ms(),
                shift: tracker.active(),
            };
            print_json(&status)?;
        }
    }

    save_state(&db, ACTIVE_SHIFT_KEY, tracker.active())?;
    Ok(())
}
