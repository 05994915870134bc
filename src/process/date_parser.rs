use chrono::{DateTime, Utc};
use std::num::ParseFloatError;

/// Parse an RFC3339 cell (`2019-05-01T12:00:00Z`, any offset) → UTC instant
pub fn parse_timestamp_utc(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Parse a load cell. Gaps in the dataset are empty cells and read as 0.0.
pub fn parse_load(s: &str) -> Result<f64, ParseFloatError> {
    if s.is_empty() {
        return Ok(0.0);
    }
    s.parse()
}
