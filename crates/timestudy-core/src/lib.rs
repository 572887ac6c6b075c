//! # Timestudy Core Library
//!
//! Core logic for manual time-and-motion studies. A standalone CLI binary
//! drives every operation; any other front end is a thin layer over the same
//! library.
//!
//! ## Architecture
//!
//! - **Shift tracker**: a state machine over shifts, work cycles and breaks.
//!   A break can interrupt a running cycle, and the break time is left out of
//!   that cycle's duration.
//! - **Lap stopwatch**: a running/paused stopwatch that records annotated laps
//!   and saves them as a named session.
//! - **Storage**: SQLite-based session store and TOML-based configuration
//! - **Reports**: tabular reports with CSV and JSON writers
//!
//! Time and operator approval are injected ([`Clock`], [`Confirmation`]), so
//! every transition can be exercised deterministically.
//!
//! ## Key Components
//!
//! - [`ShiftTracker`]: shift/cycle/break state machine
//! - [`LapTimer`]: stopwatch with laps
//! - [`SessionStore`]: storage contract, backed by [`Database`] or [`MemoryStore`]
//! - [`Report`]: export-ready report data

pub mod clock;
pub mod confirm;
pub mod error;
pub mod events;
pub mod report;
pub mod session;
pub mod shift;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use confirm::{AlwaysApprove, AlwaysDecline, Confirmation};
pub use error::{ConfigError, CoreError, DatabaseError, Result};
pub use events::Event;
pub use report::{export_report, format_hms, format_stopwatch, ExportFormat, Report, TimestampStyle};
pub use session::{SessionId, SessionKind, StoredSession};
pub use shift::{ActiveShift, FinalizedShift, IntervalKind, ShiftState, ShiftTracker, TimeInterval};
pub use storage::{Config, Database, MemoryStore, SessionStore};
pub use timer::{Lap, LapSession, LapTimer, StopwatchState, TimerStatus};
