//! Fire-and-forget script execution.

use tokio::process::Command;
use tracing::{error, info, warn};

use crate::audit::{AuditEvent, AuditLog};

/// Runs scheduled scripts and records the outcome in the audit log.
///
/// Failures never propagate: a broken script produces an `ERROR` audit line
/// and nothing else, so the timing loop and other jobs are unaffected.
#[derive(Clone)]
pub struct Executor {
    audit: AuditLog,
}

impl Executor {
    pub fn new(audit: AuditLog) -> Self {
        Self { audit }
    }

    /// Execute `script_path`.
    ///
    /// The `Executed` audit line is written before dispatch is attempted.
    /// Shell scripts (`.sh`) run through `bash` and this call does not
    /// return until the script exits; anything else is launched detached
    /// via the platform shell. There is no cancellation or timeout once a
    /// script is dispatched.
    pub async fn run(&self, script_path: &str) {
        info!(script = %script_path, "executing scheduled script");
        self.record(AuditEvent::Executed {
            path: script_path.to_string(),
        });

        if script_path.ends_with(".sh") {
            match Command::new("bash").arg(script_path).status().await {
                Ok(status) if !status.success() => {
                    warn!(script = %script_path, %status, "script exited non-zero");
                }
                Ok(_) => {}
                Err(e) => self.dispatch_failed(script_path, &e),
            }
        } else {
            // Detached: the child handle is dropped and the process keeps
            // running on its own.
            match Command::new("sh").arg("-c").arg(script_path).spawn() {
                Ok(_child) => {}
                Err(e) => self.dispatch_failed(script_path, &e),
            }
        }
    }

    fn dispatch_failed(&self, script_path: &str, err: &std::io::Error) {
        warn!(script = %script_path, error = %err, "script dispatch failed");
        self.record(AuditEvent::Error {
            message: err.to_string(),
        });
    }

    fn record(&self, event: AuditEvent) {
        if let Err(e) = self.audit.append(&event) {
            error!(error = %e, "audit append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn executed_line_precedes_dispatch_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let audit = AuditLog::open(&log_path).unwrap();
        let executor = Executor::new(audit);

        // The script does not exist; bash exits non-zero but the Executed
        // line must still be there and nothing may panic or propagate.
        executor.run("/nonexistent/taskwheel-test.sh").await;

        let text = std::fs::read_to_string(&log_path).unwrap();
        assert!(text.contains("Executed: /nonexistent/taskwheel-test.sh"));
    }

    #[tokio::test]
    async fn detached_dispatch_writes_executed_line() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let audit = AuditLog::open(&log_path).unwrap();
        let executor = Executor::new(audit);

        executor.run("true").await;

        let text = std::fs::read_to_string(&log_path).unwrap();
        assert!(text.contains("Executed: true"));
    }
}
