use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub charts: ChartConfig,
    pub report: ReportConfig,
}

/// Where holdings snapshots are read from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Value chart rendering
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChartConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_chart_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_chart_width")]
    pub width: u32,

    #[serde(default = "default_chart_height")]
    pub height: u32,
}

/// Console report wording
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Fund name used in holdings findings, e.g. "SNSR holdings have NOT changed".
    #[serde(default = "default_fund_label")]
    pub fund_label: String,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_true() -> bool {
    true
}
fn default_chart_dir() -> PathBuf {
    PathBuf::from("charts")
}
fn default_chart_width() -> u32 {
    1280
}
fn default_chart_height() -> u32 {
    720
}
fn default_fund_label() -> String {
    "SNSR".to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: default_chart_dir(),
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            fund_label: default_fund_label(),
        }
    }
}

impl ChartConfig {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("HOLDINGS").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.input.data_dir, PathBuf::from("data"));
        assert!(cfg.charts.enabled);
        assert_eq!(cfg.charts.size(), (1280, 720));
        assert_eq!(cfg.report.fund_label, "SNSR");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[charts]\nenabled = false\nwidth = 800\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(!cfg.charts.enabled);
        assert_eq!(cfg.charts.size(), (800, 720));
        assert_eq!(cfg.input.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.report.fund_label, "SNSR");
    }
}
