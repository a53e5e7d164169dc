//! Configuration file support for Woundwatch
//!
//! Loads threshold tables and the simulation factor table from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.woundwatchrc.json` in the working directory
//! 3. `woundwatch.config.json` in the working directory
//!
//! All fields are optional. Missing fields fall back to the built-in defaults.

use crate::risk::{AlertThresholds, Band, ThresholdTable};
use crate::simulation::SimulationConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const RC_FILE: &str = ".woundwatchrc.json";
const CONFIG_FILE: &str = "woundwatch.config.json";

const DEFAULT_TREND_WINDOW_DAYS: u32 = 1;
const DEFAULT_HEALING_RATE: f64 = 0.10;
const DEFAULT_HORIZON_DAYS: usize = 7;

/// Woundwatch configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WoundwatchConfig {
    /// Classifier bands
    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,

    /// Alert trigger points
    #[serde(default)]
    pub alerts: Option<AlertConfig>,

    /// Day-over-day steps averaged into the recent trend (default: 1)
    #[serde(default)]
    pub trend_window_days: Option<u32>,

    /// Daily reduction for generated expected curves (default: 0.10)
    #[serde(default)]
    pub expected_healing_rate: Option<f64>,

    /// Length of generated expected curves (default: 7)
    #[serde(default)]
    pub expected_horizon_days: Option<usize>,

    /// Versioned simulation factor table. Absent means no simulation.
    #[serde(default)]
    pub simulation: Option<SimulationConfig>,
}

/// Partial classifier band
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BandConfig {
    pub amber_above: Option<f64>,
    pub red_above: Option<f64>,
}

/// Custom classifier bands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Area above expected, cm² (default: 0.5 / 1.5). Also drives the area alert.
    pub area_deviation: Option<BandConfig>,
    /// Daily area change, %/day (default: -5 / 0)
    pub area_trend: Option<BandConfig>,
    /// Redness % (default: 15 / 25)
    pub redness: Option<BandConfig>,
    /// Exudate % (default: 2 / 8)
    pub exudate: Option<BandConfig>,
}

/// Custom alert trigger points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertConfig {
    /// Exudate above this raises a RED alert (default: 5.0)
    pub exudate_alert_pct: Option<f64>,
}

/// Resolved configuration with defaults filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub thresholds: ThresholdTable,
    pub trend_window_days: u32,
    pub expected_healing_rate: f64,
    pub expected_horizon_days: usize,
    pub simulation: Option<SimulationConfig>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

fn resolve_band(config: Option<&BandConfig>, default: Band) -> Band {
    match config {
        Some(b) => Band {
            amber_above: b.amber_above.unwrap_or(default.amber_above),
            red_above: b.red_above.unwrap_or(default.red_above),
        },
        None => default,
    }
}

impl WoundwatchConfig {
    fn threshold_table(&self) -> ThresholdTable {
        let defaults = ThresholdTable::default();
        let bands = self.thresholds.as_ref();
        let alerts = self.alerts.as_ref();

        ThresholdTable {
            area_deviation: resolve_band(
                bands.and_then(|t| t.area_deviation.as_ref()),
                defaults.area_deviation,
            ),
            area_trend: resolve_band(
                bands.and_then(|t| t.area_trend.as_ref()),
                defaults.area_trend,
            ),
            redness: resolve_band(bands.and_then(|t| t.redness.as_ref()), defaults.redness),
            exudate: resolve_band(bands.and_then(|t| t.exudate.as_ref()), defaults.exudate),
            alerts: AlertThresholds {
                exudate_alert_pct: alerts
                    .and_then(|a| a.exudate_alert_pct)
                    .unwrap_or(defaults.alerts.exudate_alert_pct),
            },
        }
    }

    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        let table = self.threshold_table();

        for (name, band) in [
            ("thresholds.area_deviation", table.area_deviation),
            ("thresholds.area_trend", table.area_trend),
            ("thresholds.redness", table.redness),
            ("thresholds.exudate", table.exudate),
        ] {
            if !band.amber_above.is_finite() || !band.red_above.is_finite() {
                anyhow::bail!("{} bounds must be finite", name);
            }
            if band.amber_above >= band.red_above {
                anyhow::bail!(
                    "{}.amber_above ({}) must be less than {}.red_above ({})",
                    name,
                    band.amber_above,
                    name,
                    band.red_above
                );
            }
        }

        if table.area_deviation.amber_above < 0.0 {
            anyhow::bail!(
                "thresholds.area_deviation.amber_above must be non-negative (got {})",
                table.area_deviation.amber_above
            );
        }
        let exudate_alert = table.alerts.exudate_alert_pct;
        if !(0.0..=100.0).contains(&exudate_alert) {
            anyhow::bail!(
                "alerts.exudate_alert_pct must be within 0..=100 (got {})",
                exudate_alert
            );
        }

        if self.trend_window_days == Some(0) {
            anyhow::bail!("trend_window_days must be at least 1");
        }
        if let Some(rate) = self.expected_healing_rate {
            if rate.is_nan() || rate <= 0.0 || rate >= 1.0 {
                anyhow::bail!(
                    "expected_healing_rate must be within (0, 1) (got {})",
                    rate
                );
            }
        }
        if self.expected_horizon_days == Some(0) {
            anyhow::bail!("expected_horizon_days must be at least 1");
        }

        if let Some(ref simulation) = self.simulation {
            simulation.validate()?;
        }

        Ok(())
    }

    /// Resolve config into the form the engine consumes
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        Ok(ResolvedConfig {
            thresholds: self.threshold_table(),
            trend_window_days: self.trend_window_days.unwrap_or(DEFAULT_TREND_WINDOW_DAYS),
            expected_healing_rate: self.expected_healing_rate.unwrap_or(DEFAULT_HEALING_RATE),
            expected_horizon_days: self.expected_horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS),
            simulation: self.simulation.clone(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Self {
        ResolvedConfig {
            thresholds: ThresholdTable::default(),
            trend_window_days: DEFAULT_TREND_WINDOW_DAYS,
            expected_healing_rate: DEFAULT_HEALING_RATE,
            expected_horizon_days: DEFAULT_HORIZON_DAYS,
            simulation: None,
            config_path: None,
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Discover and load a config file from a directory
///
/// Search order:
/// 1. `.woundwatchrc.json`
/// 2. `woundwatch.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(root: &Path) -> Result<Option<(WoundwatchConfig, PathBuf)>> {
    for name in [RC_FILE, CONFIG_FILE] {
        let path = root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<WoundwatchConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: WoundwatchConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `root`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(root)? {
            Some((config, path)) => (config, Some(path)),
            None => (WoundwatchConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
