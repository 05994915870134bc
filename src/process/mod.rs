// src/process/mod.rs
pub mod columns;
pub mod date_parser;
pub mod extract;
pub mod filter;
pub mod raw_table;

pub use columns::{resolve, ColumnIndex};
pub use extract::{Extractor, Record};
pub use filter::filter_rows;
pub use raw_table::RawTable;

use crate::{Config, Result};
use tracing::info;

/// Decode a CSV payload and turn it into records, in row order.
///
/// Header resolution → cutoff filter → extraction. The first error from
/// any stage is returned and nothing after it runs.
#[tracing::instrument(level = "info", skip_all, fields(bytes = data.len()))]
pub fn build_records(data: &[u8], cfg: &Config) -> Result<Vec<Record>> {
    let table = RawTable::from_csv_bytes(data)?;
    build_records_from_table(&table, cfg)
}

pub fn build_records_from_table(table: &RawTable, cfg: &Config) -> Result<Vec<Record>> {
    let columns = resolve(&table.headers, &cfg.countries, &cfg.metrics)?;
    if columns.is_empty() {
        info!("no configured country columns found in header");
    }

    let kept = filter_rows(&table.rows, columns.timestamp_col, cfg.cutoff)?;
    let extractor = Extractor::new(&table.headers, &columns, cfg.cutoff, cfg.grouping);

    let mut records = Vec::with_capacity(kept.len());
    for (idx, row) in kept {
        records.extend(extractor.extract(idx, row)?);
    }

    info!(
        rows = table.rows.len(),
        country_columns = columns.len(),
        records = records.len(),
        "built records"
    );
    Ok(records)
}
