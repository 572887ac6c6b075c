mod model;
mod tracker;

pub use model::{ActiveShift, FinalizedShift, IntervalKind, ShiftState, TimeInterval};
pub use tracker::{ShiftTracker, BREAK_INTERRUPT_PROMPT};
