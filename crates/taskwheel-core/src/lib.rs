//! `taskwheel-core` — shared types, configuration and errors for the
//! taskwheel scheduler.

pub mod config;
pub mod error;
pub mod types;

pub use config::TaskwheelConfig;
pub use error::{CoreError, Result};
pub use types::{parse_anchor, Frequency, ScheduleEntry, ANCHOR_FORMAT};
