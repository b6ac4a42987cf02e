use crate::error::{HoldingsError, HoldingsResult};
use crate::models::{
    ChangeReport, ChangeRow, ChangeSummary, HoldingRecord, Metric, UndefinedReason,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// `(latest - earliest) / earliest * 100`, or the reason it has no value.
pub fn pct_change(earliest: Option<f64>, latest: Option<f64>) -> Metric {
    let (earliest, latest) = match (earliest, latest) {
        (None, _) => return Metric::Undefined(UndefinedReason::MissingEarliest),
        (_, None) => return Metric::Undefined(UndefinedReason::MissingLatest),
        (Some(e), Some(l)) => (e, l),
    };
    if earliest == 0.0 {
        return Metric::Undefined(UndefinedReason::ZeroBase);
    }
    finite((latest - earliest) / earliest * 100.0)
}

/// Plain difference `latest - earliest`.
pub fn abs_change(earliest: Option<f64>, latest: Option<f64>) -> Metric {
    match (earliest, latest) {
        (None, _) => Metric::Undefined(UndefinedReason::MissingEarliest),
        (_, None) => Metric::Undefined(UndefinedReason::MissingLatest),
        (Some(e), Some(l)) => finite(l - e),
    }
}

fn finite(v: f64) -> Metric {
    if v.is_finite() {
        Metric::Value(v)
    } else {
        Metric::Undefined(UndefinedReason::NotFinite)
    }
}

fn snapshot_at(records: &[HoldingRecord], date: NaiveDate) -> BTreeMap<&str, &HoldingRecord> {
    records
        .iter()
        .filter(|r| r.date == date)
        .map(|r| (r.ticker.as_str(), r))
        .collect()
}

fn change_row(
    ticker: &str,
    earliest: Option<&HoldingRecord>,
    latest: Option<&HoldingRecord>,
    time_period_days: i64,
) -> ChangeRow {
    let weight_change = abs_change(earliest.map(|r| r.weight), latest.map(|r| r.weight));
    let market_value_change_pct = pct_change(
        earliest.map(|r| r.market_value),
        latest.map(|r| r.market_value),
    );
    let market_price_change_pct = pct_change(
        earliest.map(|r| r.market_price),
        latest.map(|r| r.market_price),
    );
    let shares_added_pct = pct_change(
        earliest.map(|r| r.shares_held),
        latest.map(|r| r.shares_held),
    );

    let mut row = ChangeRow {
        ticker: ticker.to_string(),
        weight_change,
        market_price_latest: latest.map(|r| r.market_price),
        market_value_change_pct,
        market_price_change_pct,
        shares_added_pct,
        time_period_days,
        date_latest: latest.map(|r| r.date),
        flags: Vec::new(),
    };

    for reason in row.metrics().iter().filter_map(Metric::undefined_reason) {
        if !row.flags.contains(&reason) {
            row.flags.push(reason);
        }
    }
    row
}

/// Per-ticker changes between the earliest and latest snapshot dates.
///
/// Tickers held at only one end still get a row; their metrics are
/// [`Metric::Undefined`] and a warning is logged for each such row.
pub fn build_change_report(records: &[HoldingRecord]) -> HoldingsResult<ChangeReport> {
    let earliest = records.iter().map(|r| r.date).min().ok_or(HoldingsError::EmptyDataset)?;
    let latest = records.iter().map(|r| r.date).max().ok_or(HoldingsError::EmptyDataset)?;
    let time_period_days = (latest - earliest).num_days();

    let first = snapshot_at(records, earliest);
    let last = snapshot_at(records, latest);

    let mut tickers: Vec<&str> = first.keys().chain(last.keys()).copied().collect();
    tickers.sort_unstable();
    tickers.dedup();

    let rows: Vec<ChangeRow> = tickers
        .into_iter()
        .map(|t| change_row(t, first.get(t).copied(), last.get(t).copied(), time_period_days))
        .collect();

    for row in rows.iter().filter(|r| r.has_undefined()) {
        let reasons: Vec<String> = row.flags.iter().map(|r| r.to_string()).collect();
        warn!("{}: undefined change metric ({})", row.ticker, reasons.join(", "));
    }

    info!(
        "Change report {} → {} ({} days): {} tickers",
        earliest,
        latest,
        time_period_days,
        rows.len()
    );

    Ok(ChangeReport {
        earliest,
        latest,
        rows,
    })
}

impl ChangeReport {
    pub fn summary(&self) -> ChangeSummary {
        let priced: Vec<(&str, f64)> = self
            .rows
            .iter()
            .filter_map(|r| r.market_price_change_pct.value().map(|v| (r.ticker.as_str(), v)))
            .collect();

        let pick = |better: fn(f64, f64) -> bool| {
            priced
                .iter()
                .fold(None::<(&str, f64)>, |best, &(t, v)| match best {
                    Some((_, b)) if !better(v, b) => best,
                    _ => Some((t, v)),
                })
                .map(|(t, v)| (t.to_string(), v))
        };

        ChangeSummary {
            tickers: self.rows.len(),
            undefined_rows: self.rows.iter().filter(|r| r.has_undefined()).count(),
            top_gainer: pick(|v, b| v > b),
            top_loser: pick(|v, b| v < b),
        }
    }

    #[cfg(test)]
    pub fn row(&self, ticker: &str) -> Option<&ChangeRow> {
        self.rows.iter().find(|r| r.ticker == ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, m, d).unwrap()
    }

    fn record(date: NaiveDate, ticker: &str, price: f64, shares: f64, weight: f64) -> HoldingRecord {
        HoldingRecord {
            date,
            ticker: ticker.into(),
            name: format!("{ticker} Corp"),
            sedol: "0000000".into(),
            weight,
            market_price: price,
            shares_held: shares,
            market_value: price * shares,
            value: price * shares,
        }
    }

    fn sample() -> Vec<HoldingRecord> {
        vec![
            record(day(1, 3), "ADI", 10.0, 100.0, 5.0),
            record(day(1, 3), "GONE", 4.0, 10.0, 1.0),
            record(day(1, 3), "ZERO", 0.0, 0.0, 0.0),
            record(day(6, 1), "ADI", 11.0, 120.0, 5.5),
            record(day(6, 1), "ZERO", 2.0, 5.0, 0.1),
            record(day(8, 12), "ADI", 12.0, 150.0, 6.0),
            record(day(8, 12), "NEW", 3.0, 30.0, 0.5),
            record(day(8, 12), "ZERO", 2.0, 5.0, 0.1),
        ]
    }

    #[test]
    fn test_shares_added_percentage() {
        let report = build_change_report(&sample()).unwrap();
        let adi = report.row("ADI").unwrap();
        assert_eq!(adi.shares_added_pct, Metric::Value(50.0));
        assert_eq!(adi.market_price_change_pct, Metric::Value(20.0));
        assert_eq!(adi.weight_change, Metric::Value(1.0));
        assert_eq!(adi.market_value_change_pct, Metric::Value(80.0));
        assert_eq!(adi.market_price_latest, Some(12.0));
        assert!(!adi.has_undefined());
    }

    #[test]
    fn test_spans_earliest_to_latest() {
        let report = build_change_report(&sample()).unwrap();
        assert_eq!(report.earliest, day(1, 3));
        assert_eq!(report.latest, day(8, 12));
        assert!(report.rows.iter().all(|r| r.time_period_days == 221));
    }

    #[test]
    fn test_new_ticker_is_undefined_not_zero() {
        let report = build_change_report(&sample()).unwrap();
        let new = report.row("NEW").unwrap();
        for m in [
            new.market_price_change_pct,
            new.market_value_change_pct,
            new.shares_added_pct,
            new.weight_change,
        ] {
            assert_eq!(m, Metric::Undefined(UndefinedReason::MissingEarliest));
        }
        assert_eq!(new.flags, vec![UndefinedReason::MissingEarliest]);
        assert_eq!(new.date_latest, Some(day(8, 12)));
    }

    #[test]
    fn test_dropped_ticker_has_row() {
        let report = build_change_report(&sample()).unwrap();
        let gone = report.row("GONE").unwrap();
        assert_eq!(gone.shares_added_pct, Metric::Undefined(UndefinedReason::MissingLatest));
        assert_eq!(gone.market_price_latest, None);
        assert_eq!(gone.date_latest, None);
    }

    #[test]
    fn test_zero_base_is_flagged() {
        let report = build_change_report(&sample()).unwrap();
        let zero = report.row("ZERO").unwrap();
        assert_eq!(zero.shares_added_pct, Metric::Undefined(UndefinedReason::ZeroBase));
        assert_eq!(zero.weight_change, Metric::Value(0.1));
        assert_eq!(zero.flags, vec![UndefinedReason::ZeroBase]);
    }

    #[test]
    fn test_rows_sorted_by_ticker() {
        let report = build_change_report(&sample()).unwrap();
        let tickers: Vec<_> = report.rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["ADI", "GONE", "NEW", "ZERO"]);
    }

    #[test]
    fn test_single_date_report_is_flat() {
        let records = vec![record(day(8, 12), "ADI", 12.0, 150.0, 6.0)];
        let report = build_change_report(&records).unwrap();
        assert_eq!(report.rows[0].shares_added_pct, Metric::Value(0.0));
        assert_eq!(report.rows[0].time_period_days, 0);
    }

    #[test]
    fn test_empty_dataset() {
        assert!(matches!(
            build_change_report(&[]),
            Err(HoldingsError::EmptyDataset)
        ));
    }

    #[test]
    fn test_summary() {
        let mut records = sample();
        records.push(record(day(1, 3), "DOWN", 10.0, 1.0, 1.0));
        records.push(record(day(8, 12), "DOWN", 5.0, 1.0, 1.0));

        let summary = build_change_report(&records).unwrap().summary();
        assert_eq!(summary.tickers, 5);
        assert_eq!(summary.undefined_rows, 3);
        assert_eq!(summary.top_gainer, Some(("ADI".to_string(), 20.0)));
        assert_eq!(summary.top_loser, Some(("DOWN".to_string(), -50.0)));
    }

    #[test]
    fn test_report_is_deterministic() {
        let records = sample();
        assert_eq!(
            build_change_report(&records).unwrap(),
            build_change_report(&records).unwrap()
        );
    }
}
