//! Alarm-class views
//!
//! - `AlarmTracker`: per-key lifecycle (in alarm, awaiting expiration)
//! - `AlarmFilter`: level and subject acceptance
//! - `AlarmTable`: engine plus lifecycle, with timed flush

mod filter;
mod level;
mod sample;
mod table;
mod tracker;

pub use filter::{AcceptAll, AlarmFilter, RealtimeFilter, SelectionFilter};
pub use level::AlarmLevel;
pub use sample::{AlarmSample, AlarmSubject};
pub use table::{AlarmTable, Received};
pub use tracker::{AlarmRecord, AlarmState, AlarmTracker, Transition};
