mod engine;
mod lap;

pub use engine::{LapTimer, StopwatchState, TimerStatus, RESET_PROMPT};
pub use lap::{Lap, LapSession};
