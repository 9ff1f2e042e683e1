use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use taskwheel_core::Frequency;

/// Stable identifier for a live job: `"{filepath}_{frequency}"`.
///
/// Deterministic by construction: submitting the same script with the same
/// frequency twice derives the same ID, so the second registration replaces
/// the first in the registry instead of firing alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Derive the ID for a (script path, frequency) pair.
    pub fn derive(filepath: &str, frequency: Frequency) -> Self {
        Self(format!("{filepath}_{frequency}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recurring trigger rule reduced from one schedule entry.
///
/// Only the calendar fields relevant to the frequency survive; the anchor's
/// date component is discarded for `Daily` and `Weekly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRule {
    /// Every day at HH:MM.
    Daily { hour: u32, minute: u32 },
    /// Every week on `weekday` (0 = Monday … 6 = Sunday) at HH:MM.
    Weekly { weekday: u8, hour: u32, minute: u32 },
    /// Every month on `day` at HH:MM. Months without that day are skipped.
    Monthly { day: u32, hour: u32, minute: u32 },
}

/// Work performed when a job fires.
///
/// Cloned out of the registry and awaited on the timing loop's task, never
/// under the registry lock.
pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_is_path_underscore_frequency() {
        let id = JobId::derive("/tmp/a.sh", Frequency::Daily);
        assert_eq!(id.as_str(), "/tmp/a.sh_Daily");
    }

    #[test]
    fn same_pair_derives_same_id() {
        let a = JobId::derive("/tmp/a.sh", Frequency::Weekly);
        let b = JobId::derive("/tmp/a.sh", Frequency::Weekly);
        assert_eq!(a, b);
    }

    #[test]
    fn different_frequency_derives_different_id() {
        let a = JobId::derive("/tmp/a.sh", Frequency::Daily);
        let b = JobId::derive("/tmp/a.sh", Frequency::Monthly);
        assert_ne!(a, b);
    }
}
