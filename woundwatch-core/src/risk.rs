//! Healing risk classification
//!
//! Global invariants enforced:
//! - Deterministic classification
//! - Monotonic in every signal (raising one input never lowers the level)
//! - Signals are banded independently and reduced by max, never averaged
//! - Missing or NaN signals degrade to AMBER, never to GREEN

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal risk level; `Ord` gives GREEN < AMBER < RED
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Green,
    Amber,
    Red,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Green => "GREEN",
            RiskLevel::Amber => "AMBER",
            RiskLevel::Red => "RED",
        }
    }

    /// Short status label shown to the user
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Green => "Healing on track",
            RiskLevel::Amber => "Needs monitoring",
            RiskLevel::Red => "Attention recommended",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two cut points on one signal. Both comparisons are strict `>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Band {
    pub amber_above: f64,
    pub red_above: f64,
}

impl Band {
    pub fn level(&self, value: f64) -> RiskLevel {
        if value > self.red_above {
            RiskLevel::Red
        } else if value > self.amber_above {
            RiskLevel::Amber
        } else {
            RiskLevel::Green
        }
    }

    /// The boundary that decided `level`, for explanations
    pub fn boundary_for(&self, level: RiskLevel) -> f64 {
        match level {
            RiskLevel::Red => self.red_above,
            RiskLevel::Amber | RiskLevel::Green => self.amber_above,
        }
    }
}

/// Alert trigger points that are not plain classifier bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AlertThresholds {
    /// Exudate above this always raises a RED alert
    pub exudate_alert_pct: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        AlertThresholds {
            exudate_alert_pct: 5.0,
        }
    }
}

/// The single threshold table shared by classifier and alert generator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ThresholdTable {
    /// Area above the expected curve, cm². The area alert reads `|deviation|`
    /// against the same band.
    pub area_deviation: Band,
    /// Daily area change, %/day
    pub area_trend: Band,
    pub redness: Band,
    pub exudate: Band,
    pub alerts: AlertThresholds,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        ThresholdTable {
            area_deviation: Band {
                amber_above: 0.5,
                red_above: 1.5,
            },
            area_trend: Band {
                amber_above: -5.0,
                red_above: 0.0,
            },
            redness: Band {
                amber_above: 15.0,
                red_above: 25.0,
            },
            exudate: Band {
                amber_above: 2.0,
                red_above: 8.0,
            },
            alerts: AlertThresholds::default(),
        }
    }
}

/// Classified input signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    AreaDeviation,
    AreaTrend,
    Redness,
    Exudate,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::AreaDeviation => "area_deviation",
            Signal::AreaTrend => "area_trend",
            Signal::Redness => "redness",
            Signal::Exudate => "exudate",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Signal::AreaDeviation => "Area deviation",
            Signal::AreaTrend => "Daily area trend",
            Signal::Redness => "Redness",
            Signal::Exudate => "Exudate",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Signal::AreaDeviation => "cm²",
            Signal::AreaTrend => "%/day",
            Signal::Redness | Signal::Exudate => "%",
        }
    }

    fn band<'a>(&self, table: &'a ThresholdTable) -> &'a Band {
        match self {
            Signal::AreaDeviation => &table.area_deviation,
            Signal::AreaTrend => &table.area_trend,
            Signal::Redness => &table.redness,
            Signal::Exudate => &table.exudate,
        }
    }
}

/// Inputs to the classifier. `None` or NaN means the metric is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RiskSignals {
    /// actual - expected, cm²; negative when smaller than expected
    pub area_deviation_cm2: Option<f64>,
    pub area_trend_pct: Option<f64>,
    pub redness_pct: Option<f64>,
    pub exudate_pct: Option<f64>,
}

impl RiskSignals {
    fn value(&self, signal: Signal) -> Option<f64> {
        match signal {
            Signal::AreaDeviation => self.area_deviation_cm2,
            Signal::AreaTrend => self.area_trend_pct,
            Signal::Redness => self.redness_pct,
            Signal::Exudate => self.exudate_pct,
        }
    }
}

/// Why a signal could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapReason {
    Missing,
    NotANumber,
    InsufficientHistory,
}

/// Data-quality condition recorded instead of failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DataGap {
    pub signal: Signal,
    pub reason: GapReason,
}

impl DataGap {
    pub fn describe(&self) -> String {
        let why = match self.reason {
            GapReason::Missing => "not measured",
            GapReason::NotANumber => "not a number",
            GapReason::InsufficientHistory => "not enough history for a trend",
        };
        format!("{} unavailable ({})", self.signal.label(), why)
    }
}

/// One signal's band result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SignalReading {
    pub signal: Signal,
    /// Value as read; `None` when unavailable
    pub value: Option<f64>,
    pub level: RiskLevel,
    /// Band applied to the value
    pub band: Band,
}

impl SignalReading {
    /// Literal rule text, e.g. `Redness 30% > 25% => RED`
    pub fn rule_text(&self) -> String {
        // Percent units attach directly, others after a space
        let unit = match self.signal.unit() {
            u if u.starts_with('%') => u.to_string(),
            u => format!(" {}", u),
        };
        match self.value {
            None => format!(
                "{} unavailable => {} (missing data)",
                self.signal.label(),
                self.level
            ),
            Some(v) => {
                let boundary = self.band.boundary_for(self.level);
                let op = if self.level == RiskLevel::Green { "<=" } else { ">" };
                format!(
                    "{} {}{} {} {}{} => {}",
                    self.signal.label(),
                    v,
                    unit,
                    op,
                    boundary,
                    unit,
                    self.level
                )
            }
        }
    }
}

/// Classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Classification {
    pub level: RiskLevel,
    pub readings: Vec<SignalReading>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub data_gaps: Vec<DataGap>,
}

impl Classification {
    pub fn reading(&self, signal: Signal) -> Option<&SignalReading> {
        self.readings.iter().find(|r| r.signal == signal)
    }
}

const SIGNALS: [Signal; 4] = [
    Signal::AreaDeviation,
    Signal::AreaTrend,
    Signal::Redness,
    Signal::Exudate,
];

/// Classify with an explicit threshold table.
///
/// `insufficient_history` marks a missing trend as a history gap rather than
/// a missing measurement.
pub fn classify(
    signals: &RiskSignals,
    table: &ThresholdTable,
    insufficient_history: bool,
) -> Classification {
    let mut readings = Vec::with_capacity(SIGNALS.len());
    let mut data_gaps = Vec::new();

    for signal in SIGNALS {
        let band = *signal.band(table);
        let reading = match signal_value(signals.value(signal)) {
            Ok(v) => SignalReading {
                signal,
                value: Some(v),
                level: band.level(v),
                band,
            },
            Err(mut reason) => {
                if signal == Signal::AreaTrend && insufficient_history {
                    reason = GapReason::InsufficientHistory;
                }
                let gap = DataGap { signal, reason };
                log::warn!("data quality: {}; classifying as AMBER", gap.describe());
                data_gaps.push(gap);
                SignalReading {
                    signal,
                    value: None,
                    level: RiskLevel::Amber,
                    band,
                }
            }
        };
        readings.push(reading);
    }

    let level = readings
        .iter()
        .map(|r| r.level)
        .max()
        .unwrap_or(RiskLevel::Amber);

    Classification {
        level,
        readings,
        data_gaps,
    }
}

/// Classify with the default table
pub fn classify_default(signals: &RiskSignals) -> Classification {
    classify(signals, &ThresholdTable::default(), false)
}

fn signal_value(value: Option<f64>) -> Result<f64, GapReason> {
    match value {
        None => Err(GapReason::Missing),
        Some(v) if v.is_nan() => Err(GapReason::NotANumber),
        Some(v) => Ok(v),
    }
}

/// The classification table as shown to the user, verbatim
pub fn render_threshold_table(table: &ThresholdTable) -> String {
    let deviation = &table.area_deviation;
    let trend = &table.area_trend;
    let redness = &table.redness;
    let exudate = &table.exudate;

    let rows = [
        [
            "Level".to_string(),
            "Above expected".to_string(),
            "Daily area trend".to_string(),
            "Redness".to_string(),
            "Exudate".to_string(),
        ],
        [
            "GREEN".to_string(),
            format!("<= {} cm²", deviation.amber_above),
            format!("<= {}%/day", trend.amber_above),
            format!("<= {}%", redness.amber_above),
            format!("<= {}%", exudate.amber_above),
        ],
        [
            "AMBER".to_string(),
            format!("{}-{} cm²", deviation.amber_above, deviation.red_above),
            format!("{} to {}%/day", trend.amber_above, trend.red_above),
            format!("{}-{}%", redness.amber_above, redness.red_above),
            format!("{}-{}%", exudate.amber_above, exudate.red_above),
        ],
        [
            "RED".to_string(),
            format!("> {} cm²", deviation.red_above),
            format!("> {}%/day", trend.red_above),
            format!("> {}%", redness.red_above),
            format!("> {}%", exudate.red_above),
        ],
    ];

    let mut output = String::from("Risk classification (heuristic, not diagnostic)\n");
    for [level, deviation, trend, redness, exudate] in &rows {
        output.push_str(&format!(
            "{:<7} {:<16} {:<18} {:<10} {}\n",
            level, deviation, trend, redness, exudate
        ));
    }
    output.push_str("When signals disagree the worst level wins.\n");
    output
}
