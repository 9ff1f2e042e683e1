use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Textual pattern every anchor datetime must match (minute precision).
pub const ANCHOR_FORMAT: &str = "%Y-%m-%d %H:%M";

/// How often a schedule repeats.
///
/// The variant determines which calendar fields of the anchor datetime
/// survive into the recurring trigger rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Every day at the anchor's hour and minute.
    Daily,
    /// Every week on the anchor's weekday at its hour and minute.
    Weekly,
    /// Every month on the anchor's day-of-month at its hour and minute.
    Monthly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Daily" => Ok(Frequency::Daily),
            "Weekly" => Ok(Frequency::Weekly),
            "Monthly" => Ok(Frequency::Monthly),
            other => Err(format!("unknown frequency: {other}")),
        }
    }
}

/// One persisted schedule record.
///
/// `datetime` is kept as the raw anchor text exactly as submitted; it is
/// parsed with [`ANCHOR_FORMAT`] whenever a trigger rule is compiled.
/// Entries are immutable once created and accumulate in the store; there
/// is no delete surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub frequency: Frequency,
    pub datetime: String,
    pub filepath: String,
}

impl ScheduleEntry {
    pub fn new(frequency: Frequency, datetime: &str, filepath: &str) -> Self {
        Self {
            frequency,
            datetime: datetime.to_string(),
            filepath: filepath.to_string(),
        }
    }

    /// Parse this entry's anchor text at minute precision.
    pub fn anchor(&self) -> Result<NaiveDateTime, chrono::ParseError> {
        parse_anchor(&self.datetime)
    }
}

/// Parse an anchor datetime in the `YYYY-MM-DD HH:MM` pattern.
pub fn parse_anchor(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, ANCHOR_FORMAT)
}
