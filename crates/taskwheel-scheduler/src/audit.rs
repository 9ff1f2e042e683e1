//! Append-only audit log.
//!
//! One line per event, prefixed with a bracketed timestamp. The write is
//! serialised under a single mutex so concurrent appenders never interleave
//! partial lines. Distinct from `tracing` diagnostics: this file is a
//! durable product artefact read by the user.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;

/// Timestamp pattern used for audit line prefixes.
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An auditable scheduler event.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    /// A script dispatch was attempted.
    Executed { path: String },
    /// A script dispatch failed.
    Error { message: String },
    /// A persisted record was rejected during load.
    Skipped { record: String, reason: String },
    /// The whole persisted sequence could not be read.
    LoadFailure { message: String },
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::Executed { path } => write!(f, "Executed: {path}"),
            AuditEvent::Error { message } => write!(f, "ERROR: {message}"),
            AuditEvent::Skipped { record, reason } => {
                write!(f, "Skipped invalid job: {record}, Reason: {reason}")
            }
            AuditEvent::LoadFailure { message } => write!(f, "Failed to load jobs: {message}"),
        }
    }
}

/// Shared handle to the append-only audit file.
///
/// Cloning is cheap; all clones append through the same mutex-guarded file.
/// The audit lock is independent of the job registry lock so a slow audit
/// write never stalls scheduling.
#[derive(Clone)]
pub struct AuditLog {
    file: Arc<Mutex<File>>,
}

impl AuditLog {
    /// Open (creating if needed) the audit file at `path` in append mode.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Append one event as a single timestamped line.
    pub fn append(&self, event: &AuditEvent) -> io::Result<()> {
        let stamp = Local::now().format(STAMP_FORMAT);
        let mut file = self.file.lock().unwrap();
        writeln!(file, "[{stamp}] {event}")
    }
}
