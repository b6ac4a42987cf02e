//! Human-readable findings and change-table export.

use crate::models::{ChangeReport, HoldingsChange, HoldingsDiff, Metric};
use crate::utils::fmt_thousands;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Table,
    Csv,
    Json,
}

pub const CHANGE_COLUMNS: [&str; 9] = [
    "Ticker",
    "WeightChange",
    "MarketPrice_latest",
    "MarketValueChange%",
    "MarketPriceChange%",
    "SharesAdded%",
    "TimePeriod",
    "Date_latest",
    "Flags",
];

fn ticker_list(tickers: &BTreeSet<String>) -> String {
    let quoted: Vec<String> = tickers.iter().map(|t| format!("'{}'", t)).collect();
    format!("[{}]", quoted.join(", "))
}

/// The holdings-diff finding as console lines.
pub fn holdings_findings(fund: &str, diff: &HoldingsDiff) -> Vec<String> {
    let mut lines = vec![format!("Comparing {} against {}", diff.current, diff.previous)];
    match diff.change {
        HoldingsChange::Unchanged => {
            lines.push(format!("{} holdings have NOT changed", fund));
        }
        HoldingsChange::Added => {
            lines.push(format!("Ticker(s) added: {}", ticker_list(&diff.added)));
        }
        HoldingsChange::Dropped => {
            lines.push(format!("Ticker(s) dropped: {}", ticker_list(&diff.dropped)));
        }
        HoldingsChange::Reshuffled => {
            lines.push(format!("{} has changed holdings, inspecting...", fund));
            lines.push(format!("Ticker(s) added: {}", ticker_list(&diff.added)));
            lines.push(format!("Ticker(s) dropped: {}", ticker_list(&diff.dropped)));
        }
    }
    lines
}

fn metric_cell(m: &Metric) -> String {
    format!("{:.2}", m)
}

fn opt_cell<T: ToString>(v: Option<T>, missing: &str) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| missing.to_string())
}

/// Fixed-width console rendering of the change report.
pub fn change_table(report: &ChangeReport) -> String {
    let mut out = String::new();
    let rule = "─".repeat(118);
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!(
        "  Changes {} → {} ({} days)\n",
        report.earliest,
        report.latest,
        (report.latest - report.earliest).num_days()
    ));
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!(
        "{:<8} {:>16} {:>14} {:>20} {:>20} {:>18} {:>10} {:>10}\n",
        "Ticker", "WeightChange", "Price (latest)", "MarketValueChange%", "MarketPriceChange%",
        "SharesAdded%", "Days", "Latest"
    ));

    for row in &report.rows {
        out.push_str(&format!(
            "{:<8} {:>16} {:>14} {:>20} {:>20} {:>18} {:>10} {:>10}\n",
            row.ticker,
            metric_cell(&row.weight_change),
            opt_cell(row.market_price_latest.map(|p| fmt_thousands(p, 2)), "—"),
            metric_cell(&row.market_value_change_pct),
            metric_cell(&row.market_price_change_pct),
            metric_cell(&row.shares_added_pct),
            row.time_period_days,
            opt_cell(row.date_latest, "—"),
        ));
    }

    let summary = report.summary();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!(
        "  {} tickers, {} with undefined metrics\n",
        summary.tickers, summary.undefined_rows
    ));
    if let Some((t, v)) = &summary.top_gainer {
        out.push_str(&format!("  Biggest price gain : {} ({:+.2}%)\n", t, v));
    }
    if let Some((t, v)) = &summary.top_loser {
        out.push_str(&format!("  Biggest price drop : {} ({:+.2}%)\n", t, v));
    }
    out
}

/// CSV export; undefined metrics are empty cells, reasons go in `Flags`.
pub fn write_change_csv<W: Write>(report: &ChangeReport, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CHANGE_COLUMNS)?;

    let num = |m: &Metric| m.value().map(|v| v.to_string()).unwrap_or_default();
    for row in &report.rows {
        let flags: Vec<String> = row.flags.iter().map(|f| f.to_string()).collect();
        wtr.write_record([
            row.ticker.clone(),
            num(&row.weight_change),
            opt_cell(row.market_price_latest, ""),
            num(&row.market_value_change_pct),
            num(&row.market_price_change_pct),
            num(&row.shares_added_pct),
            row.time_period_days.to_string(),
            opt_cell(row.date_latest, ""),
            flags.join(";"),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    earliest: chrono::NaiveDate,
    latest: chrono::NaiveDate,
    rows: &'a [crate::models::ChangeRow],
}

pub fn write_change_json<W: Write>(report: &ChangeReport, mut writer: W) -> Result<()> {
    let doc = JsonReport {
        earliest: report.earliest,
        latest: report.latest,
        rows: &report.rows,
    };
    serde_json::to_writer_pretty(&mut writer, &doc).context("JSON serialization failed")?;
    writeln!(writer)?;
    Ok(())
}

/// Write the report in `format` to `writer`.
pub fn write_change_report<W: Write>(
    report: &ChangeReport,
    format: ReportFormat,
    mut writer: W,
) -> Result<()> {
    match format {
        ReportFormat::Table => {
            writer.write_all(change_table(report).as_bytes())?;
            Ok(())
        }
        ReportFormat::Csv => write_change_csv(report, writer),
        ReportFormat::Json => write_change_json(report, writer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChangeRow, UndefinedReason};
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, m, d).unwrap()
    }

    fn set(tickers: &[&str]) -> BTreeSet<String> {
        tickers.iter().map(|t| t.to_string()).collect()
    }

    fn report() -> ChangeReport {
        ChangeReport {
            earliest: day(1, 3),
            latest: day(8, 12),
            rows: vec![
                ChangeRow {
                    ticker: "ADI".into(),
                    weight_change: Metric::Value(1.0),
                    market_price_latest: Some(12.0),
                    market_value_change_pct: Metric::Value(80.0),
                    market_price_change_pct: Metric::Value(20.0),
                    shares_added_pct: Metric::Value(50.0),
                    time_period_days: 221,
                    date_latest: Some(day(8, 12)),
                    flags: vec![],
                },
                ChangeRow {
                    ticker: "NEW".into(),
                    weight_change: Metric::Undefined(UndefinedReason::MissingEarliest),
                    market_price_latest: Some(3.0),
                    market_value_change_pct: Metric::Undefined(UndefinedReason::MissingEarliest),
                    market_price_change_pct: Metric::Undefined(UndefinedReason::MissingEarliest),
                    shares_added_pct: Metric::Undefined(UndefinedReason::MissingEarliest),
                    time_period_days: 221,
                    date_latest: Some(day(8, 12)),
                    flags: vec![UndefinedReason::MissingEarliest],
                },
            ],
        }
    }

    fn diff(change: HoldingsChange, added: &[&str], dropped: &[&str]) -> HoldingsDiff {
        HoldingsDiff {
            current: day(8, 12),
            previous: day(8, 11),
            change,
            added: set(added),
            dropped: set(dropped),
        }
    }

    #[test]
    fn test_unchanged_finding() {
        let lines = holdings_findings("SNSR", &diff(HoldingsChange::Unchanged, &[], &[]));
        assert_eq!(lines[1], "SNSR holdings have NOT changed");
    }

    #[test]
    fn test_reshuffled_finding_lists_both() {
        let lines = holdings_findings("SNSR", &diff(HoldingsChange::Reshuffled, &["C"], &["B"]));
        assert_eq!(
            &lines[1..],
            &[
                "SNSR has changed holdings, inspecting...".to_string(),
                "Ticker(s) added: ['C']".to_string(),
                "Ticker(s) dropped: ['B']".to_string(),
            ]
        );
    }

    #[test]
    fn test_table_marks_undefined() {
        let table = change_table(&report());
        assert!(table.contains("n/a (new)"));
        assert!(table.contains("50.00"));
        assert!(table.contains("Biggest price gain : ADI (+20.00%)"));
    }

    #[test]
    fn test_csv_export() {
        let mut buf = Vec::new();
        write_change_csv(&report(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Ticker,WeightChange,MarketPrice_latest,MarketValueChange%,MarketPriceChange%,SharesAdded%,TimePeriod,Date_latest,Flags"
        );
        assert_eq!(lines[1], "ADI,1,12,80,20,50,221,2022-08-12,");
        assert_eq!(lines[2], "NEW,,3,,,,221,2022-08-12,new");
    }

    #[test]
    fn test_json_export_uses_null_for_undefined() {
        let mut buf = Vec::new();
        write_change_json(&report(), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let new = &value["rows"][1];
        assert_eq!(new["Ticker"], "NEW");
        assert!(new["SharesAdded%"].is_null());
        assert_eq!(new["Flags"][0], "MissingEarliest");
        assert_eq!(value["rows"][0]["SharesAdded%"], 50.0);
        assert_eq!(value["earliest"], "2022-01-03");
    }
}
