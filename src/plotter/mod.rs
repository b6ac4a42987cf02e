//! Value-over-time charts, one per holding-size bucket.
//!
//! Holdings are bucketed by `Value` (shares × price), pivoted into a
//! date × ticker grid and rendered as an SVG line chart per bucket.

use crate::models::HoldingRecord;
use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, TimeDelta};
use plotters::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ── Buckets ───────────────────────────────────────────────────────────────────

/// Half-open value range `[lower, upper)`; `upper = None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueBucket {
    pub title: &'static str,
    pub slug: &'static str,
    pub lower: f64,
    pub upper: Option<f64>,
}

impl ValueBucket {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && self.upper.is_none_or(|u| value < u)
    }
}

pub const VALUE_BUCKETS: [ValueBucket; 4] = [
    ValueBucket {
        title: "Holdings: Value over Ten Million",
        slug: "value_over_10m",
        lower: 10_000_000.0,
        upper: None,
    },
    ValueBucket {
        title: "Holdings: 5-10 Million",
        slug: "value_5m_10m",
        lower: 5_000_000.0,
        upper: Some(10_000_000.0),
    },
    ValueBucket {
        title: "Holdings: 2-5 Million",
        slug: "value_2m_5m",
        lower: 2_000_000.0,
        upper: Some(5_000_000.0),
    },
    ValueBucket {
        title: "Holdings: 0-2 Million",
        slug: "value_under_2m",
        lower: 1.0,
        upper: Some(2_000_000.0),
    },
];

// ── Pivot ─────────────────────────────────────────────────────────────────────

/// One ticker's `Value` at each of the chart's dates; `None` is a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSeries {
    pub ticker: String,
    pub values: Vec<Option<f64>>,
}

impl ValueSeries {
    /// Contiguous stretches of defined points.
    pub fn runs(&self, dates: &[NaiveDate]) -> Vec<Vec<(NaiveDate, f64)>> {
        let mut runs = Vec::new();
        let mut current = Vec::new();
        for (date, value) in dates.iter().zip(&self.values) {
            match value {
                Some(v) => current.push((*date, *v)),
                None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketChart {
    pub bucket: ValueBucket,
    /// Ascending dates that have at least one holding in the bucket.
    pub dates: Vec<NaiveDate>,
    /// Sorted by ticker.
    pub series: Vec<ValueSeries>,
}

impl BucketChart {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten())
            .fold(0.0, |acc: f64, v| acc.max(*v))
    }
}

/// Rows in `bucket`, pivoted to date × ticker.
pub fn pivot_bucket(records: &[HoldingRecord], bucket: &ValueBucket) -> BucketChart {
    let rows: Vec<&HoldingRecord> = records.iter().filter(|r| bucket.contains(r.value)).collect();

    let dates: Vec<NaiveDate> = rows
        .iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let position: BTreeMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut by_ticker: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
    for r in &rows {
        let values = by_ticker
            .entry(r.ticker.as_str())
            .or_insert_with(|| vec![None; dates.len()]);
        values[position[&r.date]] = Some(r.value);
    }

    let series = by_ticker
        .into_iter()
        .map(|(ticker, values)| ValueSeries {
            ticker: ticker.to_string(),
            values,
        })
        .collect();

    BucketChart {
        bucket: *bucket,
        dates,
        series,
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

const LEGEND_WIDTH: u32 = 180;
const LEGEND_TOP: u32 = 40;
const LEGEND_BOTTOM: u32 = 10;
const ROW_HEIGHT: u32 = 18;
const MIN_ROW_HEIGHT: u32 = 11;

/// Grid the legend entries are laid out on. Rows shrink toward
/// `MIN_ROW_HEIGHT` before the legend flows into extra columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendLayout {
    pub rows: u32,
    pub columns: u32,
    pub row_height: u32,
    pub column_width: u32,
}

impl LegendLayout {
    pub fn new(entries: usize, area: (u32, u32)) -> Self {
        let entries = u32::try_from(entries).unwrap_or(u32::MAX).max(1);
        let usable = area
            .1
            .saturating_sub(LEGEND_TOP + LEGEND_BOTTOM)
            .max(MIN_ROW_HEIGHT);

        let row_height = (usable / entries).clamp(MIN_ROW_HEIGHT, ROW_HEIGHT);
        let rows = (usable / row_height).max(1).min(entries);
        let columns = entries.div_ceil(rows);

        LegendLayout {
            rows,
            columns,
            row_height,
            column_width: (area.0 / columns).max(1),
        }
    }

    /// Top-left of entry `i`, relative to the legend area.
    pub fn position(&self, i: usize) -> (i32, i32) {
        let i = i as u32;
        let (column, row) = (i / self.rows, i % self.rows);
        (
            (column * self.column_width) as i32,
            (LEGEND_TOP + row * self.row_height) as i32,
        )
    }

    pub fn font_size(&self) -> u32 {
        (self.row_height * 3 / 4).max(8)
    }

    pub fn swatch_width(&self) -> i32 {
        (self.column_width / 5).clamp(6, 20) as i32
    }
}

/// Draw `chart` as an SVG line chart with the legend to the right of the plot.
pub fn render_chart(chart: &BucketChart, path: &Path, size: (u32, u32)) -> Result<()> {
    let (first, last) = match (chart.dates.first(), chart.dates.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => bail!("nothing to plot for '{}'", chart.bucket.title),
    };
    // A single snapshot still needs a non-empty x range.
    let last = if first == last { last + TimeDelta::days(1) } else { last };
    let y_max = chart.max_value().max(1.0) * 1.05;

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let legend_width = LEGEND_WIDTH.min(size.0 / 3);
    let (plot_area, legend_area) = root.split_horizontally(size.0 - legend_width);

    let mut ctx = ChartBuilder::on(&plot_area)
        .caption(chart.bucket.title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(first..last, 0f64..y_max)?;

    ctx.configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
        .y_label_formatter(&|v: &f64| format!("{:.1}M", v / 1_000_000.0))
        .y_desc("Value ($)")
        .draw()?;

    let legend = LegendLayout::new(chart.series.len(), legend_area.dim_in_pixel());
    let font = ("sans-serif", legend.font_size());
    let swatch = legend.swatch_width();

    for (i, series) in chart.series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        for run in series.runs(&chart.dates) {
            if run.len() == 1 {
                ctx.draw_series(std::iter::once(Circle::new(run[0], 3, color.filled())))?;
            } else {
                ctx.draw_series(LineSeries::new(run, color.stroke_width(2)))?;
            }
        }

        let (x, y) = legend.position(i);
        let mid = y + legend.row_height as i32 / 2;
        legend_area.draw(&PathElement::new(
            vec![(x + 4, mid), (x + 4 + swatch, mid)],
            color.stroke_width(2),
        ))?;
        legend_area.draw(&Text::new(series.ticker.clone(), (x + 8 + swatch, y), font))?;
    }

    root.present()?;
    debug!("Wrote {:?} ({} series)", path, chart.series.len());
    Ok(())
}

/// Render every non-empty bucket into `out_dir`; returns the files written.
pub fn render_value_charts(
    records: &[HoldingRecord],
    out_dir: &Path,
    size: (u32, u32),
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Could not create chart dir {:?}", out_dir))?;

    let mut written = Vec::new();
    for bucket in &VALUE_BUCKETS {
        let chart = pivot_bucket(records, bucket);
        if chart.is_empty() {
            info!("{}: no holdings in range, skipping", bucket.title);
            continue;
        }

        let path = out_dir.join(format!("{}.svg", bucket.slug));
        render_chart(&chart, &path, size)
            .with_context(|| format!("Failed to render '{}'", bucket.title))?;
        info!("{}: {} tickers → {:?}", bucket.title, chart.series.len(), path);
        written.push(path);
    }
    Ok(written)
}
