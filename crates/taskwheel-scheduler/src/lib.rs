//! `taskwheel-scheduler` — persistent recurring-trigger scheduler core.
//!
//! # Overview
//!
//! Submitted schedules are compiled into recurring [`TriggerRule`]s and held
//! in the [`engine::SchedulerEngine`]'s in-memory registry. The engine
//! sleeps until the nearest next-fire time and invokes each due job's
//! callback. The raw specs are persisted by [`store::ScheduleStore`] as a
//! JSON sequence so a restart can rebuild the registry, and every execution
//! attempt lands in the append-only [`audit::AuditLog`].
//!
//! # Trigger variants
//!
//! | Variant   | Behaviour                                            |
//! |-----------|------------------------------------------------------|
//! | `Daily`   | Fire at HH:MM every day                              |
//! | `Weekly`  | Fire at HH:MM on a specific weekday                  |
//! | `Monthly` | Fire at HH:MM on a day-of-month; months lacking that |
//! |           | day are skipped                                      |

pub mod audit;
pub mod engine;
pub mod error;
pub mod executor;
pub mod service;
pub mod store;
pub mod trigger;
pub mod types;

pub use audit::{AuditEvent, AuditLog};
pub use engine::{SchedulerEngine, SchedulerHandle};
pub use error::{Result, SchedulerError};
pub use executor::Executor;
pub use service::{Command, SchedulerService};
pub use store::{LoadOutcome, ScheduleStore, SkippedEntry};
pub use types::{JobCallback, JobId, TriggerRule};
