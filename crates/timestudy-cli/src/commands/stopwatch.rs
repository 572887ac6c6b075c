use clap::Subcommand;
use serde::Serialize;
use timestudy_core::storage::Database;
use timestudy_core::{Config, Event, Lap, LapTimer, StopwatchState, SystemClock};

use super::{gate, load_state, print_json, save_state, CommandResult, Declined};

const STOPWATCH_KEY: &str = "stopwatch";

#[derive(Subcommand)]
pub enum StopwatchAction {
    /// Start or resume the stopwatch
    Start,
    /// Pause the stopwatch
    Pause,
    /// Record a lap
    Lap {
        /// Note for the lap
        #[arg(long)]
        note: Option<String>,
    },
    /// Set the note of a recorded lap
    Note {
        /// Lap number
        lap: u32,
        /// Note text
        text: String,
    },
    /// Clear the stopwatch and its laps
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Save the laps as a named session
    Save {
        /// Session name
        name: String,
    },
    /// Print current stopwatch state as JSON
    Status,
}

#[derive(Serialize)]
struct StopwatchStatus<'a> {
    snapshot: Event,
    laps: &'a [Lap],
}

pub fn run(action: StopwatchAction) -> CommandResult {
    let mut db = Database::open()?;
    let config = Config::load_or_default();
    let state = load_state::<StopwatchState>(&db, STOPWATCH_KEY)?.unwrap_or_default();
    let mut timer = LapTimer::restore(SystemClock, state);

    // Errors from the autosave are reported only after the timer state is
    // written back, so a recorded lap is never lost.
    let outcome = match action {
        StopwatchAction::Start => {
            print_json(&timer.start()?)?;
            Ok(())
        }
        StopwatchAction::Pause => {
            print_json(&timer.pause()?)?;
            Ok(())
        }
        StopwatchAction::Lap { note } => {
            print_json(&timer.record_lap(note)?)?;
            autosave_laps(&config, &mut timer, &mut db)
        }
        StopwatchAction::Note { lap, text } => {
            print_json(&timer.annotate_lap(lap, &text)?)?;
            autosave_laps(&config, &mut timer, &mut db)
        }
        StopwatchAction::Reset { yes } => {
            let mut confirm = gate(config.stopwatch.confirm_reset, yes);
            match timer.reset(&mut *confirm)? {
                Some(event) => print_json(&event)?,
                None => print_json(&Declined::ResetDeclined)?,
            }
            Ok(())
        }
        StopwatchAction::Save { name } => {
            print_json(&timer.save(&name, &mut db)?)?;
            Ok(())
        }
        StopwatchAction::Status => {
            let status = StopwatchStatus {
                snapshot: timer.snapshot(),
                laps: timer.laps(),
            };
            print_json(&status)?;
            Ok(())
        }
    };

    let state = timer.into_state();
    let state = (state != StopwatchState::default()).then_some(&state);
    save_state(&db, STOPWATCH_KEY, state)?;
    outcome
}

/// Rewrites the saved session after a lap change when autosave is on.
fn autosave_laps(
    config: &Config,
    timer: &mut LapTimer<SystemClock>,
    db: &mut Database,
) -> CommandResult {
    if config.stopwatch.autosave_laps {
        timer.sync(db)?;
    }
    Ok(())
}
