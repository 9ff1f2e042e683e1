//! JSON-sequence schedule store.
//!
//! The persisted surface is a single JSON array of records with exactly
//! three fields: `frequency`, `datetime`, `filepath`. Every append rewrites
//! the whole file. A single writer is assumed; concurrent external mutation
//! of the file is out of scope.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use taskwheel_core::{parse_anchor, Frequency, ScheduleEntry};

use crate::error::Result;

/// Durable record of all submitted schedules.
pub struct ScheduleStore {
    path: PathBuf,
}

/// Result of a full store load: activatable entries plus every record that
/// was rejected, each with the reason it was skipped.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub entries: Vec<ScheduleEntry>,
    pub skipped: Vec<SkippedEntry>,
}

/// A persisted record that could not be turned into a valid entry.
#[derive(Debug)]
pub struct SkippedEntry {
    /// The raw JSON value as it appears in the store.
    pub raw: Value,
    pub reason: String,
}

impl ScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry: read the whole sequence, push, rewrite the file.
    ///
    /// Existing records are carried over as raw JSON values, so a corrupt
    /// record survives an append untouched. Duplicate (path, frequency)
    /// submissions are appended as-is; only the live registry dedups.
    pub fn append(&self, entry: &ScheduleEntry) -> Result<()> {
        let mut records = self.read_raw()?;
        records.push(serde_json::to_value(entry)?);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&records)?)?;
        debug!(path = %self.path.display(), count = records.len(), "schedule store rewritten");
        Ok(())
    }

    /// Load every persisted record.
    ///
    /// A whole-sequence parse failure is an error and yields zero entries.
    /// An individual record missing a field or carrying an unparseable
    /// datetime is pushed to `skipped` with its reason and the remaining
    /// records keep loading: one corrupt record must never block the rest
    /// of the schedule from activating.
    pub fn load_all(&self) -> Result<LoadOutcome> {
        let records = self.read_raw()?;
        let mut outcome = LoadOutcome::default();
        for raw in records {
            match validate_record(&raw) {
                Ok(entry) => outcome.entries.push(entry),
                Err(reason) => {
                    warn!(%reason, "skipping invalid schedule record");
                    outcome.skipped.push(SkippedEntry { raw, reason });
                }
            }
        }
        Ok(outcome)
    }

    /// Read the raw persisted sequence; an absent file is an empty sequence.
    fn read_raw(&self) -> Result<Vec<Value>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Check one raw record for the three required fields and a well-formed
/// anchor datetime.
fn validate_record(raw: &Value) -> std::result::Result<ScheduleEntry, String> {
    let frequency = field_str(raw, "frequency")?;
    let datetime = field_str(raw, "datetime")?;
    let filepath = field_str(raw, "filepath")?;

    let frequency: Frequency = frequency.parse()?;
    parse_anchor(datetime).map_err(|e| format!("bad datetime {datetime:?}: {e}"))?;

    Ok(ScheduleEntry {
        frequency,
        datetime: datetime.to_string(),
        filepath: filepath.to_string(),
    })
}

fn field_str<'a>(raw: &'a Value, key: &str) -> std::result::Result<&'a str, String> {
    raw.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing or non-string field `{key}`"))
}
