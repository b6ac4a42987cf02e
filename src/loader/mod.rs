//! CSV loader for fund holdings snapshots.
//!
//! Every `.csv` file in the input directory is one or more snapshots; all of
//! them are concatenated into a single unordered list of raw rows. Nothing is
//! skipped: a missing column or malformed record aborts the load.

use crate::error::{HoldingsError, HoldingsResult};
use crate::models::{
    RawHoldingRow, COL_DATE, COL_MARKET_PRICE, COL_MARKET_VALUE, COL_NAME, COL_SEDOL,
    COL_SHARES_HELD, COL_TICKER, COL_WEIGHT, SOURCE_COLUMNS,
};
use csv::StringRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column name → position in the file's header row.
fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}').to_string(), i))
        .collect()
}

fn field(record: &StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or_default().to_string()
}

/// Read one holdings CSV into raw rows.
pub fn load_csv(path: &Path) -> HoldingsResult<Vec<RawHoldingRow>> {
    debug!("Loading holdings from {:?}", path);

    let csv_err = |source| HoldingsError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    let header_map = build_header_map(&headers);

    let mut idx = HashMap::with_capacity(SOURCE_COLUMNS.len());
    for column in SOURCE_COLUMNS {
        let i = header_map
            .get(column)
            .copied()
            .ok_or_else(|| HoldingsError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })?;
        idx.insert(column, i);
    }
    if header_map.len() > SOURCE_COLUMNS.len() {
        debug!(
            "{:?}: ignoring {} extra column(s)",
            path,
            header_map.len() - SOURCE_COLUMNS.len()
        );
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        rows.push(RawHoldingRow {
            source: path.to_path_buf(),
            line,
            date: field(&record, idx[COL_DATE]),
            ticker: field(&record, idx[COL_TICKER]),
            name: field(&record, idx[COL_NAME]),
            sedol: field(&record, idx[COL_SEDOL]),
            weight: field(&record, idx[COL_WEIGHT]),
            market_price: field(&record, idx[COL_MARKET_PRICE]),
            shares_held: field(&record, idx[COL_SHARES_HELD]),
            market_value: field(&record, idx[COL_MARKET_VALUE]),
        });
    }

    info!("{:?}: {} rows loaded", path.file_name().unwrap_or_default(), rows.len());
    Ok(rows)
}

/// All `.csv` files directly inside `dir`, sorted by path.
pub fn discover_csv_files(dir: &Path) -> HoldingsResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(HoldingsError::MissingDirectory(dir.to_path_buf()));
    }

    let io_err = |source| HoldingsError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(HoldingsError::NoInputFiles(dir.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// Load and concatenate every holdings file in `dir`.
pub fn load_dir(dir: &Path) -> HoldingsResult<Vec<RawHoldingRow>> {
    let files = discover_csv_files(dir)?;
    info!("Found {} CSV files in {:?}", files.len(), dir);

    let mut rows = Vec::new();
    for path in &files {
        rows.extend(load_csv(path)?);
    }
    Ok(rows)
}
