//! Live job registry and timing loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::{watch, Notify};
use tracing::info;

use crate::error::{Result, SchedulerError};
use crate::trigger;
use crate::types::{JobCallback, JobId, TriggerRule};

/// One registered job: its rule, the work to run on fire, and the cached
/// next occurrence.
struct JobSlot {
    rule: TriggerRule,
    callback: JobCallback,
    next_fire: Option<NaiveDateTime>,
}

type Registry = Arc<Mutex<HashMap<JobId, JobSlot>>>;

/// Shared handle for job management while the engine loop runs.
///
/// All registry mutation goes through this API. The lock is held only for
/// the brief read/modify/replace of a single entry, never across a callback
/// execution, so a long-running script cannot stall new registrations.
#[derive(Clone)]
pub struct SchedulerHandle {
    registry: Registry,
    wake: Arc<Notify>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    done_rx: watch::Receiver<bool>,
}

impl SchedulerHandle {
    /// Install or replace the job `id`.
    ///
    /// Replacement is atomic under the registry lock: the prior rule's
    /// pending fire is discarded, never executed alongside the new one.
    pub fn add_job(&self, id: JobId, rule: TriggerRule, callback: JobCallback) {
        let next = trigger::next_fire(&rule, Local::now().naive_local());
        let replaced = {
            let mut registry = self.registry.lock().unwrap();
            registry
                .insert(
                    id.clone(),
                    JobSlot {
                        rule,
                        callback,
                        next_fire: next,
                    },
                )
                .is_some()
        };
        if replaced {
            info!(job = %id, "job replaced");
        } else {
            info!(job = %id, "job added");
        }
        // The new job may be the nearest fire, so the loop re-plans its sleep.
        self.wake.notify_one();
    }

    /// Remove the job `id`. Returns `JobNotFound` if it is not registered.
    pub fn remove_job(&self, id: &JobId) -> Result<()> {
        let removed = self.registry.lock().unwrap().remove(id);
        if removed.is_none() {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        info!(job = %id, "job removed");
        self.wake.notify_one();
        Ok(())
    }

    /// Number of live jobs.
    pub fn job_count(&self) -> usize {
        self.registry.lock().unwrap().len()
    }

    /// Snapshot of the live jobs and their trigger rules (unordered).
    pub fn list_jobs(&self) -> Vec<(JobId, TriggerRule)> {
        self.registry
            .lock()
            .unwrap()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.rule))
            .collect()
    }

    /// Stop the timing loop from scheduling new fires.
    ///
    /// With `wait_for_running` the call returns only after the loop has
    /// finished its current fire batch and exited; otherwise it returns
    /// immediately. Detached scripts are never waited on or cancelled
    /// either way.
    pub async fn shutdown(&self, wait_for_running: bool) {
        let _ = self.shutdown_tx.send(true);
        self.wake.notify_one();
        if wait_for_running {
            let mut done = self.done_rx.clone();
            // `done` flips exactly once, when run() returns.
            while !*done.borrow() {
                if done.changed().await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Owns the timing loop.
///
/// Construct, take a [`SchedulerHandle`] via [`handle`](Self::handle), then
/// drive [`run`](Self::run) on its own task.
pub struct SchedulerEngine {
    registry: Registry,
    wake: Arc<Notify>,
    shutdown_rx: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
    handle: SchedulerHandle,
    idle_poll: Duration,
}

impl SchedulerEngine {
    /// Create an engine whose loop never sleeps longer than `idle_poll`
    /// between due checks.
    pub fn new(idle_poll: Duration) -> Self {
        let registry: Registry = Arc::new(Mutex::new(HashMap::new()));
        let wake = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let handle = SchedulerHandle {
            registry: Arc::clone(&registry),
            wake: Arc::clone(&wake),
            shutdown_tx: Arc::new(shutdown_tx),
            done_rx,
        };
        Self {
            registry,
            wake,
            shutdown_rx,
            done_tx,
            handle,
            idle_poll,
        }
    }

    /// A cloneable management handle for this engine.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Main timing loop. Runs until [`SchedulerHandle::shutdown`] is called.
    ///
    /// Each pass fires every job whose next occurrence has arrived
    /// (advancing its following occurrence first), then sleeps until the
    /// nearest upcoming fire, a registry change, or shutdown. Callbacks are
    /// awaited on this task: a long-running synchronous script delays only
    /// the detection of subsequent due fires, never registry consistency.
    pub async fn run(mut self) {
        info!("scheduler engine started");
        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            let now = Local::now().naive_local();
            let (due, nearest) = collect_due(&self.registry, now);

            for (id, callback) in due {
                info!(job = %id, "firing job");
                callback().await;
            }

            let sleep_for = match nearest {
                Some(at) => (at - Local::now().naive_local())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(self.idle_poll),
                None => self.idle_poll,
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.wake.notified() => {}
                _ = self.shutdown_rx.changed() => {}
            }
        }
        info!("scheduler engine stopped");
        let _ = self.done_tx.send(true);
    }
}

/// Under the registry lock: collect due callbacks, advance their next-fire
/// times, and report the nearest upcoming fire across all jobs.
fn collect_due(
    registry: &Registry,
    now: NaiveDateTime,
) -> (Vec<(JobId, JobCallback)>, Option<NaiveDateTime>) {
    let mut due = Vec::new();
    let mut nearest: Option<NaiveDateTime> = None;

    let mut registry = registry.lock().unwrap();
    for (id, slot) in registry.iter_mut() {
        if let Some(at) = slot.next_fire {
            if at <= now {
                due.push((id.clone(), slot.callback.clone()));
                // Re-derive from `now` so a delayed pass cannot double-fire.
                slot.next_fire = trigger::next_fire(&slot.rule, now);
            }
        }
        if let Some(at) = slot.next_fire {
            nearest = Some(nearest.map_or(at, |n| n.min(at)));
        }
    }
    (due, nearest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskwheel_core::parse_anchor;

    fn noop_callback() -> JobCallback {
        Arc::new(|| Box::pin(async {}))
    }

    fn counting_callback(counter: Arc<AtomicUsize>) -> JobCallback {
        Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[test]
    fn add_job_twice_keeps_one_rule_the_second() {
        let engine = SchedulerEngine::new(Duration::from_secs(30));
        let handle = engine.handle();
        let id = JobId::derive("/tmp/a.sh", taskwheel_core::Frequency::Daily);

        handle.add_job(
            id.clone(),
            TriggerRule::Daily { hour: 9, minute: 30 },
            noop_callback(),
        );
        handle.add_job(
            id.clone(),
            TriggerRule::Daily {
                hour: 18,
                minute: 0,
            },
            noop_callback(),
        );

        assert_eq!(handle.job_count(), 1);
        let jobs = handle.list_jobs();
        assert_eq!(
            jobs[0].1,
            TriggerRule::Daily {
                hour: 18,
                minute: 0
            }
        );
    }

    #[test]
    fn remove_job_unregisters() {
        let engine = SchedulerEngine::new(Duration::from_secs(30));
        let handle = engine.handle();
        let id = JobId::derive("/tmp/a.sh", taskwheel_core::Frequency::Daily);

        handle.add_job(
            id.clone(),
            TriggerRule::Daily { hour: 9, minute: 30 },
            noop_callback(),
        );
        handle.remove_job(&id).unwrap();

        assert_eq!(handle.job_count(), 0);
        assert!(matches!(
            handle.remove_job(&id),
            Err(SchedulerError::JobNotFound { .. })
        ));
    }

    #[test]
    fn collect_due_fires_and_advances() {
        let engine = SchedulerEngine::new(Duration::from_secs(30));
        let handle = engine.handle();
        let id = JobId::derive("/tmp/a.sh", taskwheel_core::Frequency::Daily);
        handle.add_job(
            id.clone(),
            TriggerRule::Daily { hour: 9, minute: 30 },
            noop_callback(),
        );

        // Force the slot due by rewinding its cached next_fire.
        let past = parse_anchor("2024-06-01 09:30").unwrap();
        engine
            .registry
            .lock()
            .unwrap()
            .get_mut(&id)
            .unwrap()
            .next_fire = Some(past);

        let now = parse_anchor("2024-06-01 09:31").unwrap();
        let (due, nearest) = collect_due(&engine.registry, now);

        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, id);
        // The job advanced to the next day's occurrence.
        assert_eq!(nearest, Some(parse_anchor("2024-06-02 09:30").unwrap()));
    }

    #[test]
    fn collect_due_leaves_future_jobs_alone() {
        let engine = SchedulerEngine::new(Duration::from_secs(30));
        let handle = engine.handle();
        let id = JobId::derive("/tmp/a.sh", taskwheel_core::Frequency::Daily);
        handle.add_job(
            id,
            TriggerRule::Daily { hour: 9, minute: 30 },
            noop_callback(),
        );

        let now = parse_anchor("2024-06-01 08:00").unwrap();
        // next_fire was computed from wall clock at add time; rewind it to a
        // known future instant relative to `now`.
        for slot in engine.registry.lock().unwrap().values_mut() {
            slot.next_fire = Some(parse_anchor("2024-06-01 09:30").unwrap());
        }

        let (due, nearest) = collect_due(&engine.registry, now);
        assert!(due.is_empty());
        assert_eq!(nearest, Some(parse_anchor("2024-06-01 09:30").unwrap()));
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let engine = SchedulerEngine::new(Duration::from_secs(30));
        let handle = engine.handle();
        let task = tokio::spawn(engine.run());

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown(true))
            .await
            .expect("engine did not stop in time");
        task.await.unwrap();
    }

    #[tokio::test]
    async fn due_job_fires_through_the_loop() {
        let engine = SchedulerEngine::new(Duration::from_millis(20));
        let handle = engine.handle();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = JobId::derive("/tmp/a.sh", taskwheel_core::Frequency::Daily);
        handle.add_job(
            id.clone(),
            TriggerRule::Daily { hour: 9, minute: 30 },
            counting_callback(Arc::clone(&counter)),
        );

        // Rewind the cached occurrence so the next pass sees it as due.
        engine
            .registry
            .lock()
            .unwrap()
            .get_mut(&id)
            .unwrap()
            .next_fire = Some(parse_anchor("2020-01-01 00:00").unwrap());

        let task = tokio::spawn(engine.run());
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown(true).await;
        task.await.unwrap();

        // Fired exactly once: the re-derived occurrence is in the future.
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
