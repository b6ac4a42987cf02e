use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions raised while ingesting or analysing holdings snapshots.
///
/// Everything here aborts the run. Per-row metric problems are not errors;
/// they surface as [`crate::models::Metric::Undefined`] instead.
#[derive(Debug, Error)]
pub enum HoldingsError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("input directory {0:?} does not exist")]
    MissingDirectory(PathBuf),

    #[error("no CSV files found in {0:?}")]
    NoInputFiles(PathBuf),

    #[error("{path:?} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path:?} line {line}: cannot parse date '{value}'")]
    InvalidDate {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{path:?} line {line}: column '{column}' is not a number: '{value}'")]
    InvalidNumber {
        path: PathBuf,
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("{path:?} line {line}: empty ticker")]
    EmptyTicker { path: PathBuf, line: u64 },

    #[error("ticker {ticker} appears more than once on {date}")]
    DuplicateHolding { date: NaiveDate, ticker: String },

    #[error("dataset contains no holdings")]
    EmptyDataset,

    #[error("need at least two snapshot dates to compare holdings, found {found}")]
    InsufficientHistory { found: usize },
}

pub type HoldingsResult<T> = Result<T, HoldingsError>;
