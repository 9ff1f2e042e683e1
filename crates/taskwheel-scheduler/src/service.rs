//! Channel-facing service front.
//!
//! Front-ends (the CLI today, any UI later) never call into scheduling
//! directly: they send [`Command`]s over an mpsc channel and receive the
//! result on a bundled oneshot. The service validates submissions, installs
//! live jobs and persists the raw specs.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use taskwheel_core::{parse_anchor, Frequency, ScheduleEntry};

use crate::audit::{AuditEvent, AuditLog};
use crate::engine::SchedulerHandle;
use crate::error::{Result, SchedulerError};
use crate::executor::Executor;
use crate::store::ScheduleStore;
use crate::trigger;
use crate::types::{JobCallback, JobId};

/// Commands accepted over the service channel.
pub enum Command {
    /// Register and persist one schedule.
    Submit {
        frequency: String,
        datetime: String,
        filepath: String,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Re-activate every persisted schedule; replies with the count activated.
    Reload { reply: oneshot::Sender<usize> },
}

/// Core entry points consumed by front-ends.
pub struct SchedulerService {
    store: ScheduleStore,
    audit: AuditLog,
    executor: Executor,
    handle: SchedulerHandle,
}

impl SchedulerService {
    pub fn new(
        store: ScheduleStore,
        audit: AuditLog,
        executor: Executor,
        handle: SchedulerHandle,
    ) -> Self {
        Self {
            store,
            audit,
            executor,
            handle,
        }
    }

    /// Validate and register one schedule, then persist it.
    ///
    /// `InvalidFrequency` and `InvalidDateTime` are rejected before any
    /// state mutation. A duplicate (path, frequency) replaces the live job
    /// but is appended to the store as a new record; the store keeps the
    /// full submission history, only the registry dedups.
    pub fn submit(&self, frequency: &str, datetime: &str, filepath: &str) -> Result<()> {
        let freq: Frequency = frequency
            .parse()
            .map_err(|_| SchedulerError::InvalidFrequency(frequency.to_string()))?;
        let anchor = parse_anchor(datetime)
            .map_err(|_| SchedulerError::InvalidDateTime(datetime.to_string()))?;

        let rule = trigger::compile(freq, anchor);
        self.handle
            .add_job(JobId::derive(filepath, freq), rule, self.script_callback(filepath));
        self.store
            .append(&ScheduleEntry::new(freq, datetime, filepath))?;

        info!(script = %filepath, frequency = %freq, "schedule submitted");
        Ok(())
    }

    /// Feed every stored entry back through the compiler and registry.
    ///
    /// Returns the number of jobs activated. Corrupt records and a corrupt
    /// store are reduced to audit lines; neither aborts the reload.
    pub fn startup_reload(&self) -> usize {
        let outcome = match self.store.load_all() {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "schedule store load failed");
                self.record(AuditEvent::LoadFailure {
                    message: e.to_string(),
                });
                return 0;
            }
        };

        for skipped in &outcome.skipped {
            self.record(AuditEvent::Skipped {
                record: skipped.raw.to_string(),
                reason: skipped.reason.clone(),
            });
        }

        let mut activated = 0;
        for entry in outcome.entries {
            // load_all has already validated the anchor text.
            let Ok(anchor) = entry.anchor() else { continue };
            let rule = trigger::compile(entry.frequency, anchor);
            self.handle.add_job(
                JobId::derive(&entry.filepath, entry.frequency),
                rule,
                self.script_callback(&entry.filepath),
            );
            activated += 1;
        }

        info!(
            count = activated,
            skipped = outcome.skipped.len(),
            "startup reload complete"
        );
        activated
    }

    /// Serve commands until every sender is dropped.
    pub async fn run_commands(self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Submit {
                    frequency,
                    datetime,
                    filepath,
                    reply,
                } => {
                    let _ = reply.send(self.submit(&frequency, &datetime, &filepath));
                }
                Command::Reload { reply } => {
                    let _ = reply.send(self.startup_reload());
                }
            }
        }
    }

    fn script_callback(&self, filepath: &str) -> JobCallback {
        let executor = self.executor.clone();
        let path = filepath.to_string();
        Arc::new(move || {
            let executor = executor.clone();
            let path = path.clone();
            Box::pin(async move { executor.run(&path).await })
        })
    }

    fn record(&self, event: AuditEvent) {
        if let Err(e) = self.audit.append(&event) {
            error!(error = %e, "audit append failed");
        }
    }
}
