// src/process/columns.rs
use crate::config::TIMESTAMP_COLUMN;
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace, warn};

/// Which header positions belong to which country, plus where the timestamp lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    pub timestamp_col: usize,
    /// position → country code, ascending by position. Never contains `timestamp_col`.
    pub countries: BTreeMap<usize, String>,
}

impl ColumnIndex {
    pub fn country_at(&self, position: usize) -> Option<&str> {
        self.countries.get(&position).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// Map header positions to countries for every column named `"{country}_{metric}..."`.
///
/// Countries are tried in the given order and the first one whose prefix
/// matches owns the position. Columns matching no prefix are left out.
#[instrument(level = "debug", skip_all, fields(columns = header.len()))]
pub fn resolve(header: &[String], countries: &[String], metrics: &[String]) -> Result<ColumnIndex> {
    if header.is_empty() {
        return Err(Error::malformed_header("header has no columns"));
    }
    let timestamp_col = header
        .iter()
        .position(|h| h == TIMESTAMP_COLUMN)
        .ok_or_else(|| {
            Error::malformed_header(format!("missing '{}' column", TIMESTAMP_COLUMN))
        })?;
    if timestamp_col != 0 {
        warn!(position = timestamp_col, "timestamp column is not the first column");
    }

    let prefixes: Vec<(&str, String)> = countries
        .iter()
        .flat_map(|c| metrics.iter().map(move |m| (c.as_str(), format!("{}_{}", c, m))))
        .collect();

    let mut mapping = BTreeMap::new();
    for (j, name) in header.iter().enumerate() {
        if j == timestamp_col {
            continue;
        }
        if let Some((country, _)) = prefixes.iter().find(|(_, p)| name.starts_with(p.as_str())) {
            trace!(position = j, column = %name, country, "matched column");
            mapping.insert(j, country.to_string());
        }
    }

    debug!(matched = mapping.len(), "resolved country columns");
    Ok(ColumnIndex {
        timestamp_col,
        countries: mapping,
    })
}
