// src/process/filter.rs
use super::date_parser::parse_timestamp_utc;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

/// Keep rows whose timestamp is strictly after `cutoff`, in input order.
///
/// Each kept row is paired with its index in `rows` so later stages can
/// report errors against the original position. The first unparsable
/// timestamp aborts the whole filter.
#[instrument(level = "debug", skip(rows), fields(rows = rows.len()))]
pub fn filter_rows(
    rows: &[Vec<String>],
    timestamp_col: usize,
    cutoff: DateTime<Utc>,
) -> Result<Vec<(usize, &[String])>> {
    let mut kept = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let raw = row.get(timestamp_col).map(String::as_str).unwrap_or("");
        let ts = parse_timestamp_utc(raw).map_err(|e| Error::invalid_timestamp(idx, raw, e))?;
        if ts > cutoff {
            kept.push((idx, row.as_slice()));
        }
    }
    debug!(kept = kept.len(), dropped = rows.len() - kept.len(), "filtered rows");
    Ok(kept)
}
