//! Hypothetical healing simulation
//!
//! Scales a reference healing curve by categorical context factors and
//! estimates a coarse completion window.
//!
//! Global invariants enforced:
//! - Output is always wrapped in `Hypothetical`; nothing here touches observations
//! - Incomplete context or a missing factor entry yields no simulation, never a guess
//! - The factor table is supplied by configuration; the engine defines none
//! - Completion is a day range with a qualitative confidence tag only

use crate::layer::Hypothetical;
use crate::trajectory::round_to;
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A categorical context dimension that can key a factor table
pub trait Category: Copy + Ord {
    const DIMENSION: &'static str;

    fn label(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiabetesStatus {
    Absent,
    Controlled,
    Uncontrolled,
}

impl Category for DiabetesStatus {
    const DIMENSION: &'static str = "diabetes";

    fn label(&self) -> &'static str {
        match self {
            DiabetesStatus::Absent => "absent",
            DiabetesStatus::Controlled => "controlled",
            DiabetesStatus::Uncontrolled => "uncontrolled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmokingStatus {
    Never,
    Former,
    Current,
}

impl Category for SmokingStatus {
    const DIMENSION: &'static str = "smoking";

    fn label(&self) -> &'static str {
        match self {
            SmokingStatus::Never => "never",
            SmokingStatus::Former => "former",
            SmokingStatus::Current => "current",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeBracket {
    #[serde(rename = "under_40")]
    Under40,
    #[serde(rename = "40_to_64")]
    From40To64,
    #[serde(rename = "65_plus")]
    Over65,
}

impl Category for AgeBracket {
    const DIMENSION: &'static str = "age";

    fn label(&self) -> &'static str {
        match self {
            AgeBracket::Under40 => "under_40",
            AgeBracket::From40To64 => "40_to_64",
            AgeBracket::Over65 => "65_plus",
        }
    }
}

/// Surgical wound class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurgeryCategory {
    Clean,
    CleanContaminated,
    Contaminated,
}

impl Category for SurgeryCategory {
    const DIMENSION: &'static str = "surgery";

    fn label(&self) -> &'static str {
        match self {
            SurgeryCategory::Clean => "clean",
            SurgeryCategory::CleanContaminated => "clean_contaminated",
            SurgeryCategory::Contaminated => "contaminated",
        }
    }
}

/// Declared patient context. Every categorical field is required for a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulationContext {
    #[serde(default)]
    pub diabetes: Option<DiabetesStatus>,
    #[serde(default)]
    pub smoking: Option<SmokingStatus>,
    #[serde(default)]
    pub age: Option<AgeBracket>,
    #[serde(default)]
    pub surgery: Option<SurgeryCategory>,
    /// A scale reference (e.g. a coin) was visible in the captures
    #[serde(default)]
    pub reference_object: bool,
}

/// Healing-velocity multipliers per category. 1.0 is neutral.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactorTable {
    pub diabetes: BTreeMap<DiabetesStatus, f64>,
    pub smoking: BTreeMap<SmokingStatus, f64>,
    pub age: BTreeMap<AgeBracket, f64>,
    pub surgery: BTreeMap<SurgeryCategory, f64>,
}

impl FactorTable {
    pub fn is_empty(&self) -> bool {
        self.diabetes.is_empty()
            && self.smoking.is_empty()
            && self.age.is_empty()
            && self.surgery.is_empty()
    }

    fn multipliers(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        let diabetes = self.diabetes.values().map(|m| (DiabetesStatus::DIMENSION, *m));
        let smoking = self.smoking.values().map(|m| (SmokingStatus::DIMENSION, *m));
        let age = self.age.values().map(|m| (AgeBracket::DIMENSION, *m));
        let surgery = self.surgery.values().map(|m| (SurgeryCategory::DIMENSION, *m));
        diabetes.chain(smoking).chain(age).chain(surgery)
    }
}

/// Observation counts required to raise confidence above LOW
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfidencePolicy {
    pub medium_min_observations: usize,
    pub high_min_observations: usize,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        ConfidencePolicy {
            medium_min_observations: 3,
            high_min_observations: 7,
        }
    }
}

/// Versioned simulation table, loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub version: String,
    /// Area at or below which the wound counts as healed (cm²)
    pub healed_area_cm2: f64,
    /// Width of the completion window in days
    pub window_margin_days: u32,
    /// Furthest day the curve is extrapolated to when looking for completion
    pub horizon_days: u32,
    /// Points appended to the display curve
    pub extrapolate_steps: u32,
    pub confidence: ConfidencePolicy,
    pub factors: FactorTable,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            version: "unversioned".to_string(),
            healed_area_cm2: 0.5,
            window_margin_days: 3,
            horizon_days: 60,
            extrapolate_steps: 3,
            confidence: ConfidencePolicy::default(),
            factors: FactorTable::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.version.trim().is_empty() {
            bail!("simulation.version must not be empty");
        }
        if !self.healed_area_cm2.is_finite() || self.healed_area_cm2 <= 0.0 {
            bail!(
                "simulation.healed_area_cm2 must be positive (got {})",
                self.healed_area_cm2
            );
        }
        if self.horizon_days == 0 {
            bail!("simulation.horizon_days must be at least 1");
        }
        if self.window_margin_days > self.horizon_days {
            bail!(
                "simulation.window_margin_days ({}) must not exceed horizon_days ({})",
                self.window_margin_days,
                self.horizon_days
            );
        }
        let policy = &self.confidence;
        if policy.medium_min_observations > policy.high_min_observations {
            bail!(
                "simulation.confidence.medium_min_observations ({}) must not exceed high_min_observations ({})",
                policy.medium_min_observations,
                policy.high_min_observations
            );
        }
        for (dimension, multiplier) in self.factors.multipliers() {
            if multiplier.is_nan() || multiplier <= 0.0 || multiplier > 2.0 {
                bail!(
                    "simulation.factors.{} multipliers must be within (0, 2] (got {})",
                    dimension,
                    multiplier
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        }
    }
}

/// Inclusive day range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionWindow {
    pub start_day: u32,
    pub end_day: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulationResult {
    /// Product of the applied category multipliers
    pub velocity_multiplier: f64,
    /// Reference curve with its rate of change scaled, index 0 = day 1
    pub adjusted_curve: Vec<f64>,
    /// Adjusted curve plus display extrapolation
    pub extrapolated_curve: Vec<f64>,
    pub completion_window: CompletionWindow,
    pub confidence: Confidence,
    pub assumptions: Vec<String>,
    pub table_version: String,
}

fn factor<K: Category>(key: Option<K>, table: &BTreeMap<K, f64>) -> Option<(K, f64)> {
    let Some(key) = key else {
        log::debug!("simulation unavailable: {} not provided", K::DIMENSION);
        return None;
    };
    match table.get(&key) {
        Some(&multiplier) => Some((key, multiplier)),
        None => {
            log::debug!(
                "simulation unavailable: no {} factor for '{}'",
                K::DIMENSION,
                key.label()
            );
            None
        }
    }
}

fn assumption<K: Category>(key: K, multiplier: f64) -> Option<String> {
    if (multiplier - 1.0).abs() <= f64::EPSILON {
        return None;
    }
    let pct = round_to((multiplier - 1.0) * 100.0, 0);
    Some(format!(
        "{} ({}): {:+}% healing velocity",
        K::DIMENSION,
        key.label(),
        pct
    ))
}

/// Scale the rate of change of `reference`, keeping its starting point
pub fn adjust_curve(reference: &[f64], velocity_multiplier: f64) -> Vec<f64> {
    let Some(&base) = reference.first() else {
        return Vec::new();
    };
    reference
        .iter()
        .map(|&v| round_to(base + (v - base) * velocity_multiplier, 2))
        .collect()
}

/// Append `steps` points continuing the slope of the last two, floored at 0
pub fn extrapolate_curve(curve: &[f64], steps: u32) -> Vec<f64> {
    let mut extended = curve.to_vec();
    if let [.., previous, last] = *curve {
        let slope = last - previous;
        extended.extend((1..=steps).map(|k| round_to((last + slope * k as f64).max(0.0), 2)));
    }
    extended
}

/// First 1-based day the curve reaches `healed_area`, extending linearly up to `horizon_days`
fn completion_day(curve: &[f64], healed_area: f64, horizon_days: u32) -> Option<u32> {
    if let Some(index) = curve.iter().position(|&area| area <= healed_area) {
        return Some(index as u32 + 1);
    }

    let [.., previous, last] = *curve else {
        return None;
    };
    let slope = last - previous;
    if slope >= 0.0 {
        return None;
    }

    let observed = curve.len() as u32;
    ((observed + 1)..=horizon_days).find(|&day| {
        let steps = (day - observed) as f64;
        (last + slope * steps).max(0.0) <= healed_area
    })
}

fn confidence_for(
    context: &SimulationContext,
    real_observations: usize,
    policy: &ConfidencePolicy,
) -> Confidence {
    if !context.reference_object {
        Confidence::Low
    } else if real_observations >= policy.high_min_observations {
        Confidence::High
    } else if real_observations >= policy.medium_min_observations {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Run the hypothetical simulation.
///
/// `reference_curve` is the expected healing curve (index 0 = day 1).
/// Returns `None` when the context is incomplete, the table lacks an entry
/// for a supplied category, or the adjusted curve never reaches the healed
/// threshold within the horizon.
pub fn simulate(
    context: &SimulationContext,
    reference_curve: &[f64],
    real_observations: usize,
    config: &SimulationConfig,
) -> Option<Hypothetical<SimulationResult>> {
    let factors = &config.factors;
    let diabetes = factor(context.diabetes, &factors.diabetes)?;
    let smoking = factor(context.smoking, &factors.smoking)?;
    let age = factor(context.age, &factors.age)?;
    let surgery = factor(context.surgery, &factors.surgery)?;

    let velocity_multiplier = diabetes.1 * smoking.1 * age.1 * surgery.1;
    let mut assumptions: Vec<String> = [
        assumption(diabetes.0, diabetes.1),
        assumption(smoking.0, smoking.1),
        assumption(age.0, age.1),
        assumption(surgery.0, surgery.1),
    ]
    .into_iter()
    .flatten()
    .collect();
    if assumptions.is_empty() {
        assumptions.push("Base healing model (no adjustments)".to_string());
    }

    let adjusted_curve = adjust_curve(reference_curve, velocity_multiplier);
    let Some(start_day) =
        completion_day(&adjusted_curve, config.healed_area_cm2, config.horizon_days)
    else {
        log::debug!(
            "simulation unavailable: adjusted curve does not reach {} cm² within {} days",
            config.healed_area_cm2,
            config.horizon_days
        );
        return None;
    };

    let extrapolated_curve = extrapolate_curve(&adjusted_curve, config.extrapolate_steps);
    Some(Hypothetical::new(SimulationResult {
        velocity_multiplier: round_to(velocity_multiplier, 4),
        adjusted_curve,
        extrapolated_curve,
        completion_window: CompletionWindow {
            start_day,
            end_day: start_day.saturating_add(config.window_margin_days),
        },
        confidence: confidence_for(context, real_observations, &config.confidence),
        assumptions,
        table_version: config.version.clone(),
    }))
}
