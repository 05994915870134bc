// src/process/raw_table.rs
use crate::Result;
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names from the first CSV line, whitespace-trimmed.
    pub headers: Vec<String>,
    /// Body rows, each with exactly `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Decode a comma-separated payload with a header line.
    ///
    /// The reader is strict about field counts, so a ragged row surfaces as
    /// a CSV error instead of being silently padded.
    pub fn from_csv_bytes(data: &[u8]) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(Cursor::new(data));

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!(columns = headers.len(), rows = rows.len(), "decoded CSV");
        Ok(RawTable { headers, rows })
    }
}
