//! Pipeline orchestrator: load → clean → diff → report → plot.
//!
//! Every stage takes the previous stage's output by reference and returns a
//! fresh value, so running twice over the same directory gives identical
//! findings. Any error stops the run at the stage that raised it.

use crate::analysis::{build_change_report, diff_recent_holdings};
use crate::cleaner::clean_rows;
use crate::config::AppConfig;
use crate::loader::load_dir;
use crate::models::{ChangeReport, HoldingRecord, HoldingsDiff};
use crate::plotter::render_value_charts;
use crate::utils::Timer;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Load and clean every snapshot in `dir`.
    pub fn load(&self, dir: &Path) -> Result<Vec<HoldingRecord>> {
        let _t = Timer::start("Load + clean");
        let raw = load_dir(dir).with_context(|| format!("Failed to load holdings from {:?}", dir))?;
        let records = clean_rows(&raw).context("Failed to clean holdings")?;
        info!("{} holdings rows ready", records.len());
        Ok(records)
    }

    pub fn diff(&self, records: &[HoldingRecord]) -> Result<HoldingsDiff> {
        diff_recent_holdings(records).context("Holdings diff failed")
    }

    pub fn report(&self, records: &[HoldingRecord]) -> Result<ChangeReport> {
        build_change_report(records).context("Change report failed")
    }

    pub fn plot(&self, records: &[HoldingRecord], out_dir: &Path) -> Result<Vec<PathBuf>> {
        let _t = Timer::start("Value charts");
        render_value_charts(records, out_dir, self.config.charts.size())
    }

    pub fn run(&self) -> Result<PipelineOutput> {
        let records = self.load(&self.config.input.data_dir)?;

        info!("=== Step 1: Holdings diff ===");
        let diff = self.diff(&records)?;

        info!("=== Step 2: Change report ===");
        let report = self.report(&records)?;

        let charts = if self.config.charts.enabled {
            info!("=== Step 3: Value charts ===");
            self.plot(&records, &self.config.charts.output_dir)?
        } else {
            info!("Chart rendering disabled");
            Vec::new()
        };

        info!(
            "=== Done: {} rows | {} → {} | {} report rows | {} charts ===",
            records.len(),
            report.earliest,
            report.latest,
            report.rows.len(),
            charts.len()
        );

        Ok(PipelineOutput {
            records,
            diff,
            report,
            charts,
        })
    }
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub records: Vec<HoldingRecord>,
    pub diff: HoldingsDiff,
    pub report: ChangeReport,
    pub charts: Vec<PathBuf>,
}
