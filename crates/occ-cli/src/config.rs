//! Scenario configuration loading and validation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use occ_core::{
    AnalysisWindow, BinningOptions, Category, EdgePolicy, Grouping, Percentile, ScenarioName,
};
use occ_io::{MissingExit, StopFields, parse_timestamp};
use serde::{Deserialize, Serialize};

/// Scenario configuration as read from files and the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag toggles an independent output"
)]
pub struct Config {
    /// Prefix of every exported file.
    pub scenario_name: String,
    pub stop_data_csv: Option<PathBuf>,
    /// Entry timestamp column.
    pub in_field: String,
    /// Exit timestamp column.
    pub out_field: String,
    /// Category column; stays are not grouped when absent.
    pub cat_field: Option<String>,
    pub start_analysis: Option<String>,
    pub end_analysis: Option<String>,
    pub bin_size_minutes: i64,
    /// `fractional` or `whole`.
    pub edge_bins: String,
    pub cats_to_exclude: Vec<String>,
    pub occ_weight_field: Option<String>,
    pub totals: bool,
    pub missing_exit: MissingExit,
    pub percentiles: Vec<f64>,
    pub nonstationary_stats: bool,
    pub stationary_stats: bool,
    pub export_bydatetime_csv: bool,
    pub export_summaries_csv: bool,
    pub output_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scenario_name: "scenario".to_string(),
            stop_data_csv: None,
            in_field: "InRoomTS".to_string(),
            out_field: "OutRoomTS".to_string(),
            cat_field: None,
            start_analysis: None,
            end_analysis: None,
            bin_size_minutes: 60,
            edge_bins: EdgePolicy::Fractional.as_str().to_string(),
            cats_to_exclude: Vec::new(),
            occ_weight_field: None,
            totals: true,
            missing_exit: MissingExit::default(),
            percentiles: vec![0.25, 0.5, 0.75, 0.95, 0.99],
            nonstationary_stats: true,
            stationary_stats: true,
            export_bydatetime_csv: true,
            export_summaries_csv: true,
            output_path: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (OCC_*)
        figment = figment.merge(Env::prefixed("OCC_"));

        figment.extract()
    }

    /// Validates the configuration into a runnable scenario.
    pub fn scenario(&self) -> Result<Scenario> {
        let name = ScenarioName::new(self.scenario_name.clone())?;
        let Some(stop_data_csv) = self.stop_data_csv.clone() else {
            bail!("stop_data_csv is not set");
        };

        let start = analysis_timestamp("start_analysis", self.start_analysis.as_deref())?;
        let end = analysis_timestamp("end_analysis", self.end_analysis.as_deref())?;
        let window = AnalysisWindow::new(start, end, self.bin_size_minutes)
            .context("invalid analysis window")?;

        let grouping = if self.cat_field.is_some() {
            let exclude = self
                .cats_to_exclude
                .iter()
                .map(|c| Category::new(c.as_str()))
                .collect::<Result<BTreeSet<_>, _>>()
                .context("invalid cats_to_exclude")?;
            Grouping::ByCategory { exclude }
        } else {
            if !self.cats_to_exclude.is_empty() {
                tracing::warn!("cats_to_exclude ignored without cat_field");
            }
            Grouping::Ungrouped
        };

        let options = BinningOptions {
            edge_policy: self.edge_bins.parse().context("invalid edge_bins")?,
            grouping,
            totals: self.totals,
            ..BinningOptions::new(window)
        };

        let percentiles = self
            .percentiles
            .iter()
            .map(|&p| Percentile::new(p))
            .collect::<Result<Vec<_>, _>>()
            .context("invalid percentiles")?;
        let mut labels = BTreeSet::new();
        for percentile in &percentiles {
            let label = percentile.label();
            if !labels.insert(label.clone()) {
                bail!("percentiles share the output column {label}");
            }
        }

        Ok(Scenario {
            name,
            stop_data_csv,
            fields: StopFields {
                entry: self.in_field.clone(),
                exit: self.out_field.clone(),
                category: self.cat_field.clone(),
                weight: self.occ_weight_field.clone(),
            },
            missing_exit: self.missing_exit,
            options,
            percentiles,
            outputs: Outputs {
                nonstationary_stats: self.nonstationary_stats,
                stationary_stats: self.stationary_stats,
                export_bydatetime_csv: self.export_bydatetime_csv,
                export_summaries_csv: self.export_summaries_csv,
            },
            output_path: self.output_path.clone(),
        })
    }
}

fn analysis_timestamp(field: &str, value: Option<&str>) -> Result<chrono::NaiveDateTime> {
    let Some(value) = value else {
        bail!("{field} is not set");
    };
    parse_timestamp(value).with_context(|| format!("invalid {field}: {value:?}"))
}

/// Which summaries to compute and which tables to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag toggles an independent output"
)]
pub struct Outputs {
    pub nonstationary_stats: bool,
    pub stationary_stats: bool,
    pub export_bydatetime_csv: bool,
    pub export_summaries_csv: bool,
}

/// A validated scenario, ready to run.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: ScenarioName,
    pub stop_data_csv: PathBuf,
    pub fields: StopFields,
    pub missing_exit: MissingExit,
    pub options: BinningOptions,
    pub percentiles: Vec<Percentile>,
    pub outputs: Outputs,
    pub output_path: PathBuf,
}

/// Returns the platform-specific config directory for occ.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("occ"))
}
