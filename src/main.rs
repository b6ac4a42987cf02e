mod analysis;
mod cleaner;
mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod plotter;
mod report;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::analysis::ticker_snapshots;
use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::report::{change_table, holdings_findings, write_change_report, ReportFormat};

#[derive(Parser)]
#[command(
    name = "holdings-tracker",
    about = "Track fund holdings changes across CSV snapshots",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory of holdings CSV files (overrides config)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Full run: holdings diff, change report and value charts
    Run {
        /// Skip chart rendering
        #[arg(long)]
        no_charts: bool,
    },

    /// Compare tickers held on the two most recent snapshot dates
    Diff,

    /// Per-ticker changes between the earliest and latest snapshot
    Report {
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Table)]
        format: ReportFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render value-over-time charts per holding size bucket
    Plot {
        /// Output directory for SVG files (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List snapshot dates with holding counts and total value
    Dates,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "holdings_tracker=info,warn",
        1 => "holdings_tracker=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;
    if let Some(dir) = cli.dir {
        config.input.data_dir = dir;
    }
    let fund = config.report.fund_label.clone();

    match cli.command {
        Command::Run { no_charts } => {
            let _t = utils::Timer::start("Holdings run");
            if no_charts {
                config.charts.enabled = false;
            }
            let out = Pipeline::new(config).run()?;
            println!(
                "{} rows across {} snapshot dates",
                out.records.len(),
                ticker_snapshots(&out.records).len()
            );

            for line in holdings_findings(&fund, &out.diff) {
                println!("{}", line);
            }
            println!();
            print!("{}", change_table(&out.report));
            for path in &out.charts {
                println!("Chart written: {}", path.display());
            }
        }

        Command::Diff => {
            let pipeline = Pipeline::new(config);
            let records = pipeline.load(&pipeline.config().input.data_dir)?;
            let diff = pipeline.diff(&records)?;
            for line in holdings_findings(&fund, &diff) {
                println!("{}", line);
            }
        }

        Command::Report { format, output } => {
            let pipeline = Pipeline::new(config);
            let records = pipeline.load(&pipeline.config().input.data_dir)?;
            let report = pipeline.report(&records)?;

            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Could not create {:?}", path))?;
                    write_change_report(&report, format, BufWriter::new(file))?;
                    info!("Report written to {:?}", path);
                }
                None => write_change_report(&report, format, io::stdout().lock())?,
            }
        }

        Command::Plot { out } => {
            let out_dir = out.unwrap_or_else(|| config.charts.output_dir.clone());
            let pipeline = Pipeline::new(config);
            let records = pipeline.load(&pipeline.config().input.data_dir)?;
            let written = pipeline.plot(&records, &out_dir)?;
            if written.is_empty() {
                println!("No holdings fall in any value bucket, nothing plotted.");
            }
            for path in &written {
                println!("Chart written: {}", path.display());
            }
        }

        Command::Dates => {
            let pipeline = Pipeline::new(config);
            let records = pipeline.load(&pipeline.config().input.data_dir)?;

            let mut totals: BTreeMap<_, f64> = BTreeMap::new();
            for r in &records {
                *totals.entry(r.date).or_default() += r.value;
            }

            println!("─────────────────────────────────────────────");
            println!("  {} — Snapshot Dates", fund);
            println!("─────────────────────────────────────────────");
            for snap in ticker_snapshots(&records) {
                let total = totals.get(&snap.date).copied().unwrap_or_default();
                println!(
                    "  {}  {:>4} holdings  ${:>18}",
                    snap.date,
                    snap.tickers.len(),
                    utils::fmt_thousands(total, 2)
                );
            }
            println!("─────────────────────────────────────────────");
        }
    }

    Ok(())
}
