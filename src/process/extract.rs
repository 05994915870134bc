// src/process/extract.rs
use super::columns::ColumnIndex;
use super::date_parser::{parse_load, parse_timestamp_utc};
use crate::config::{Grouping, LOAD_ACTUAL_METRIC, LOAD_FORECAST_METRIC};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use tracing::trace;

/// One country's load at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub country_code: String,
    pub load_actual: f64,
    pub load_forecast: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadField {
    Actual,
    Forecast,
}

impl LoadField {
    fn from_metric(metric: &str) -> Option<Self> {
        match metric {
            LOAD_ACTUAL_METRIC => Some(LoadField::Actual),
            LOAD_FORECAST_METRIC => Some(LoadField::Forecast),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct RecordBuilder<'a> {
    country: &'a str,
    load_actual: f64,
    load_forecast: f64,
}

impl<'a> RecordBuilder<'a> {
    fn new(country: &'a str) -> Self {
        Self {
            country,
            load_actual: 0.0,
            load_forecast: 0.0,
        }
    }

    fn set(&mut self, field: LoadField, value: f64) {
        match field {
            LoadField::Actual => self.load_actual = value,
            LoadField::Forecast => self.load_forecast = value,
        }
    }

    fn finish(self, timestamp: DateTime<Utc>) -> Record {
        Record {
            timestamp,
            country_code: self.country.to_string(),
            load_actual: self.load_actual,
            load_forecast: self.load_forecast,
        }
    }
}

/// Turns filtered rows into records using a resolved header.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    header: &'a [String],
    columns: &'a ColumnIndex,
    cutoff: DateTime<Utc>,
    grouping: Grouping,
}

impl<'a> Extractor<'a> {
    pub fn new(
        header: &'a [String],
        columns: &'a ColumnIndex,
        cutoff: DateTime<Utc>,
        grouping: Grouping,
    ) -> Self {
        Self {
            header,
            columns,
            cutoff,
            grouping,
        }
    }

    /// Build the records for one body row.
    ///
    /// The timestamp is parsed again and checked against the cutoff; a row at
    /// or before it yields nothing. `row_index` is only used in errors.
    pub fn extract(&self, row_index: usize, row: &[String]) -> Result<Vec<Record>> {
        let raw_ts = cell(row, self.columns.timestamp_col);
        let timestamp = parse_timestamp_utc(raw_ts)
            .map_err(|e| Error::invalid_timestamp(row_index, raw_ts, e))?;
        if timestamp <= self.cutoff {
            trace!(row = row_index, %timestamp, "row at or before cutoff, skipped");
            return Ok(Vec::new());
        }

        match self.grouping {
            Grouping::PerCountry => self.per_country(row_index, row, timestamp),
            Grouping::LastWriteWins => self.last_write_wins(row_index, row, timestamp),
        }
    }

    fn per_country(
        &self,
        row_index: usize,
        row: &[String],
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<Record>> {
        // ordered by first column of each country group
        let columns: &'a ColumnIndex = self.columns;
        let mut builders: Vec<RecordBuilder<'a>> = Vec::new();
        for (&pos, country) in &columns.countries {
            let slot = match builders.iter().position(|b| b.country == country.as_str()) {
                Some(i) => i,
                None => {
                    builders.push(RecordBuilder::new(country));
                    builders.len() - 1
                }
            };
            if let Some((field, value)) = self.read_field(row_index, row, pos, country)? {
                builders[slot].set(field, value);
            }
        }
        Ok(builders.into_iter().map(|b| b.finish(timestamp)).collect())
    }

    fn last_write_wins(
        &self,
        row_index: usize,
        row: &[String],
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<Record>> {
        let columns: &'a ColumnIndex = self.columns;
        let mut shared: Option<RecordBuilder<'a>> = None;
        for (&pos, country) in &columns.countries {
            let builder = shared.get_or_insert_with(|| RecordBuilder::new(country));
            builder.country = country.as_str();
            if let Some((field, value)) = self.read_field(row_index, row, pos, country)? {
                builder.set(field, value);
            }
        }
        Ok(shared.into_iter().map(|b| b.finish(timestamp)).collect())
    }

    /// Strip `"{country}_"` from the header name and parse the cell if the
    /// remaining metric is one we carry. Unknown metrics are `None`.
    fn read_field(
        &self,
        row_index: usize,
        row: &[String],
        pos: usize,
        country: &str,
    ) -> Result<Option<(LoadField, f64)>> {
        let name = cell(self.header, pos);
        let Some(field) = name
            .strip_prefix(country)
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(LoadField::from_metric)
        else {
            return Ok(None);
        };

        let raw = cell(row, pos);
        let value = parse_load(raw).map_err(|e| Error::invalid_number(row_index, name, raw, e))?;
        Ok(Some((field, value)))
    }
}

fn cell(items: &[String], pos: usize) -> &str {
    items.get(pos).map(String::as_str).unwrap_or("")
}
