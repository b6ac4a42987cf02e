use crate::error::{HoldingsError, HoldingsResult};
use crate::models::{
    HoldingRecord, RawHoldingRow, COL_MARKET_PRICE, COL_MARKET_VALUE, COL_SHARES_HELD, COL_WEIGHT,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use tracing::debug;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Remove commas. Text fields keep everything else as written.
pub fn strip_commas(s: &str) -> String {
    s.replace(',', "")
}

/// Parse a numeric field after trimming and stripping commas.
/// "1,234.56" → 1234.56 | "6.12" → 6.12 | "" → None | "N/A" → None
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned = strip_commas(s.trim());
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse snapshot dates. Slash dates are read month-first; two-digit years
/// must be tried before `%Y`, which would accept "22" as year 22.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    for fmt in ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%b %d, %Y", "%d %b %Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    None
}

// ── Raw row → HoldingRecord ───────────────────────────────────────────────────

fn number_field(row: &RawHoldingRow, column: &'static str, value: &str) -> HoldingsResult<f64> {
    parse_number(value).ok_or_else(|| HoldingsError::InvalidNumber {
        path: row.source.clone(),
        line: row.line,
        column,
        value: value.to_string(),
    })
}

pub fn clean_row(row: &RawHoldingRow) -> HoldingsResult<HoldingRecord> {
    let date = parse_date(&row.date).ok_or_else(|| HoldingsError::InvalidDate {
        path: row.source.clone(),
        line: row.line,
        value: row.date.clone(),
    })?;

    let ticker = strip_commas(&row.ticker);
    if ticker.trim().is_empty() {
        return Err(HoldingsError::EmptyTicker {
            path: row.source.clone(),
            line: row.line,
        });
    }

    let weight = number_field(row, COL_WEIGHT, &row.weight)?;
    let market_price = number_field(row, COL_MARKET_PRICE, &row.market_price)?;
    let shares_held = number_field(row, COL_SHARES_HELD, &row.shares_held)?;
    let market_value = number_field(row, COL_MARKET_VALUE, &row.market_value)?;

    Ok(HoldingRecord {
        date,
        ticker,
        name: strip_commas(&row.name),
        sedol: strip_commas(&row.sedol),
        weight,
        market_price,
        shares_held,
        market_value,
        value: shares_held * market_price,
    })
}

/// Clean every row; the first bad row aborts the whole batch.
pub fn clean_rows(rows: &[RawHoldingRow]) -> HoldingsResult<Vec<HoldingRecord>> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let record = clean_row(row)?;
        if !seen.insert((record.date, record.ticker.clone())) {
            return Err(HoldingsError::DuplicateHolding {
                date: record.date,
                ticker: record.ticker,
            });
        }
        records.push(record);
    }

    debug!("Cleaned {} holding rows", records.len());
    Ok(records)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn raw(date: &str, ticker: &str, price: &str, shares: &str) -> RawHoldingRow {
        RawHoldingRow {
            source: PathBuf::from("snap.csv"),
            line: 2,
            date: date.into(),
            ticker: ticker.into(),
            name: "Analog Devices, Inc.".into(),
            sedol: "2032067".into(),
            weight: "6.12".into(),
            market_price: price.into(),
            shares_held: shares.into(),
            market_value: "1,000,000.00".into(),
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,234,567.89"), Some(1_234_567.89));
        assert_eq!(parse_number(" 6.12 "), Some(6.12));
        assert_eq!(parse_number("-0.5"), Some(-0.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2022, 8, 12).unwrap();
        assert_eq!(parse_date("2022-08-12"), Some(d));
        assert_eq!(parse_date("08/12/2022"), Some(d));
        assert_eq!(parse_date("8/12/22"), Some(d));
        assert_eq!(parse_date("Aug 12, 2022"), Some(d));
        assert_eq!(parse_date("12 Aug 2022"), Some(d));
        assert_eq!(parse_date("2022-08-12 00:00:00"), Some(d));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_clean_row_normalises_fields() {
        let rec = clean_row(&raw("08/12/2022", "ADI", " 171.10 ", "12,345")).unwrap();
        assert_eq!(rec.ticker, "ADI");
        assert_eq!(rec.market_price, 171.10);
        assert_eq!(rec.name, "Analog Devices Inc.");
        assert_eq!(rec.shares_held, 12_345.0);
        assert_eq!(rec.market_value, 1_000_000.0);
        assert_eq!(rec.weight, 6.12);
    }

    #[test]
    fn test_value_is_exact_product() {
        let cases = [("171.10", "12,345"), ("0.03", "7"), ("99.99", "1,000,001"), ("0", "5")];
        for (price, shares) in cases {
            let rec = clean_row(&raw("2022-08-12", "ADI", price, shares)).unwrap();
            assert_eq!(rec.value, rec.shares_held * rec.market_price);
        }
    }

    #[test]
    fn test_unparseable_number_is_fatal() {
        let err = clean_row(&raw("2022-08-12", "ADI", "abc", "1")).unwrap_err();
        assert!(matches!(
            err,
            HoldingsError::InvalidNumber { column: COL_MARKET_PRICE, .. }
        ));
    }

    #[test]
    fn test_bad_date_and_empty_ticker_are_fatal() {
        assert!(matches!(
            clean_row(&raw("not a date", "ADI", "1", "1")),
            Err(HoldingsError::InvalidDate { .. })
        ));
        assert!(matches!(
            clean_row(&raw("2022-08-12", "  ", "1", "1")),
            Err(HoldingsError::EmptyTicker { .. })
        ));
    }

    #[test]
    fn test_duplicate_holding_is_fatal() {
        let rows = vec![
            raw("2022-08-12", "ADI", "1", "1"),
            raw("08/12/2022", "ADI", "2", "2"),
        ];
        assert!(matches!(
            clean_rows(&rows),
            Err(HoldingsError::DuplicateHolding { .. })
        ));
    }

    #[test]
    fn test_ticker_whitespace_is_preserved() {
        assert_eq!(strip_commas(" A,B "), " AB ");

        let rows = vec![
            raw("2022-08-12", "ADI ", "1", "1"),
            raw("2022-08-12", "ADI", "1", "1"),
        ];
        let recs = clean_rows(&rows).unwrap();
        assert_eq!(recs[0].ticker, "ADI ");
        assert_eq!(recs[1].ticker, "ADI");
    }

    #[test]
    fn test_ticker_case_is_preserved() {
        let rows = vec![
            raw("2022-08-12", "adi", "1", "1"),
            raw("2022-08-12", "ADI", "1", "1"),
        ];
        let recs = clean_rows(&rows).unwrap();
        assert_eq!(recs[0].ticker, "adi");
        assert_eq!(recs[1].ticker, "ADI");
    }
}
