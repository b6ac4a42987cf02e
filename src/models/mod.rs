use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

// ── Source columns ────────────────────────────────────────────────────────────

pub const COL_DATE: &str = "Date";
pub const COL_TICKER: &str = "Ticker";
pub const COL_NAME: &str = "Name";
pub const COL_SEDOL: &str = "SEDOL";
pub const COL_WEIGHT: &str = "% of Net Assets";
pub const COL_MARKET_PRICE: &str = "Market Price ($)";
pub const COL_SHARES_HELD: &str = "Shares Held";
pub const COL_MARKET_VALUE: &str = "Market Value ($)";

/// Every column a holdings file must carry, in canonical order.
pub const SOURCE_COLUMNS: [&str; 8] = [
    COL_DATE,
    COL_TICKER,
    COL_NAME,
    COL_SEDOL,
    COL_WEIGHT,
    COL_MARKET_PRICE,
    COL_SHARES_HELD,
    COL_MARKET_VALUE,
];

// ── Raw CSV row ───────────────────────────────────────────────────────────────

/// One holdings row exactly as read from disk, every field still text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHoldingRow {
    pub source: PathBuf,
    pub line: u64,
    pub date: String,
    pub ticker: String,
    pub name: String,
    pub sedol: String,
    pub weight: String,       // % of Net Assets
    pub market_price: String, // Market Price ($)
    pub shares_held: String,
    pub market_value: String, // Market Value ($)
}

// ── Cleaned holding ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct HoldingRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub name: String,
    #[serde(rename = "SEDOL")]
    pub sedol: String,
    pub weight: f64,
    pub market_price: f64,
    pub shares_held: f64,
    /// As reported by the fund.
    pub market_value: f64,
    /// `shares_held * market_price`, recomputed as a cross-check on `market_value`.
    pub value: f64,
}

// ── Holdings diff ─────────────────────────────────────────────────────────────

/// Distinct tickers held on one snapshot date.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSnapshot {
    pub date: NaiveDate,
    pub tickers: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HoldingsChange {
    Unchanged,
    Added,
    Dropped,
    /// Same number of holdings, different members.
    Reshuffled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingsDiff {
    pub current: NaiveDate,
    pub previous: NaiveDate,
    pub change: HoldingsChange,
    pub added: BTreeSet<String>,
    pub dropped: BTreeSet<String>,
}

// ── Change report ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UndefinedReason {
    /// Earliest observation was zero.
    ZeroBase,
    /// Ticker not held on the earliest date.
    MissingEarliest,
    /// Ticker not held on the latest date.
    MissingLatest,
    NotFinite,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UndefinedReason::ZeroBase => "zero base",
            UndefinedReason::MissingEarliest => "new",
            UndefinedReason::MissingLatest => "dropped",
            UndefinedReason::NotFinite => "not finite",
        };
        f.write_str(s)
    }
}

/// A computed change that may be undefined for this row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    Undefined(UndefinedReason),
}

impl Metric {
    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::Undefined(_) => None,
        }
    }

    pub fn undefined_reason(&self) -> Option<UndefinedReason> {
        match self {
            Metric::Value(_) => None,
            Metric::Undefined(r) => Some(*r),
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Metric::Undefined(_))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => match f.precision() {
                Some(p) => write!(f, "{:.*}", p, v),
                None => write!(f, "{}", v),
            },
            Metric::Undefined(r) => write!(f, "n/a ({})", r),
        }
    }
}

/// Undefined metrics serialize as `null` so consumers never read them as zero.
impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => serializer.serialize_some(v),
            Metric::Undefined(_) => serializer.serialize_none(),
        }
    }
}

/// Per-ticker change between the earliest and latest snapshot in the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRow {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "WeightChange")]
    pub weight_change: Metric,
    #[serde(rename = "MarketPrice_latest")]
    pub market_price_latest: Option<f64>,
    #[serde(rename = "MarketValueChange%")]
    pub market_value_change_pct: Metric,
    #[serde(rename = "MarketPriceChange%")]
    pub market_price_change_pct: Metric,
    #[serde(rename = "SharesAdded%")]
    pub shares_added_pct: Metric,
    /// Whole days between the earliest and latest snapshot.
    #[serde(rename = "TimePeriod")]
    pub time_period_days: i64,
    #[serde(rename = "Date_latest")]
    pub date_latest: Option<NaiveDate>,
    #[serde(rename = "Flags")]
    pub flags: Vec<UndefinedReason>,
}

impl ChangeRow {
    pub fn metrics(&self) -> [Metric; 4] {
        [
            self.weight_change,
            self.market_value_change_pct,
            self.market_price_change_pct,
            self.shares_added_pct,
        ]
    }

    pub fn has_undefined(&self) -> bool {
        self.metrics().iter().any(Metric::is_undefined)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeReport {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
    pub rows: Vec<ChangeRow>,
}

/// Headline numbers for a change report.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSummary {
    pub tickers: usize,
    pub undefined_rows: usize,
    /// Largest `MarketPriceChange%` among defined rows.
    pub top_gainer: Option<(String, f64)>,
    /// Smallest `MarketPriceChange%` among defined rows.
    pub top_loser: Option<(String, f64)>,
}
