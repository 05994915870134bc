// src/line_protocol.rs
use crate::process::Record;
use chrono::{DateTime, Utc};
use tracing::warn;

/// Measurement name at the head of every line.
pub const MEASUREMENT: &str = "sensor";

/// `sensor,country=DE load_actual=1000.000000,load_forecast=1100.000000 <nanos>`
///
/// The trailing timestamp is `now`, the publish instant, not the record's
/// own timestamp. Loads are written with six fractional digits.
///
/// Nanosecond stamps only reach 2262-04-11; a later `now` is clamped to
/// `i64::MAX` and logged. Wall-clock publish times never get there.
pub fn encode(record: &Record, now: DateTime<Utc>) -> String {
    let nanos = now.timestamp_nanos_opt().unwrap_or_else(|| {
        warn!(%now, "publish time out of nanosecond range, clamping");
        i64::MAX
    });

    format!(
        "{MEASUREMENT},country={} load_actual={:.6},load_forecast={:.6} {}",
        record.country_code, record.load_actual, record.load_forecast, nanos
    )
}
