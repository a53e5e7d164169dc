//! Case files: one wound's observations plus optional curve and context

use crate::config::ResolvedConfig;
use crate::error::EngineError;
use crate::observation::{Observation, ObservationStore};
use crate::simulation::SimulationContext;
use crate::trajectory::expected_curve;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseFile {
    /// Expected healing curve, index 0 = day 1. Generated when absent.
    #[serde(default)]
    pub expected: Option<Vec<f64>>,
    pub observations: Vec<Observation>,
    #[serde(default)]
    pub context: Option<SimulationContext>,
}

impl CaseFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read case file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse case file: {}", path.display()))
    }

    /// Load the observations into a fresh store, enforcing day order
    pub fn to_store(&self) -> Result<ObservationStore, EngineError> {
        ObservationStore::from_observations(self.observations.clone())
    }

    /// The supplied expected curve, or one generated from the day-1 area
    pub fn expected_curve(&self, config: &ResolvedConfig) -> Vec<f64> {
        if let Some(ref curve) = self.expected {
            return curve.clone();
        }
        let Some(first) = self.observations.first() else {
            return Vec::new();
        };
        let days = config.expected_horizon_days.max(self.observations.len());
        expected_curve(first.area_cm2, days, config.expected_healing_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CASE: &str = r#"{
        "observations": [
            {"day": 1, "area_cm2": 10.0, "redness_pct": 8.0, "pus_pct": 0.5},
            {"day": 2, "area_cm2": 9.4, "redness_pct": 7.5, "pus_pct": 0.4}
        ],
        "context": {"smoking": "current", "reference_object": true}
    }"#;

    #[test]
    fn test_generated_expected_curve() {
        let case: CaseFile = serde_json::from_str(CASE).unwrap();
        let curve = case.expected_curve(&ResolvedConfig::defaults());
        assert_eq!(curve.len(), 7);
        assert_eq!(&curve[..3], &[10.0, 9.0, 8.1]);
    }

    #[test]
    fn test_supplied_expected_curve_wins() {
        let mut case: CaseFile = serde_json::from_str(CASE).unwrap();
        case.expected = Some(vec![10.0, 9.5]);
        assert_eq!(
            case.expected_curve(&ResolvedConfig::defaults()),
            vec![10.0, 9.5]
        );
    }

    #[test]
    fn test_context_is_partial() {
        let case: CaseFile = serde_json::from_str(CASE).unwrap();
        let context = case.context.unwrap();
        assert!(context.reference_object);
        assert!(context.diabetes.is_none());
    }

    #[test]
    fn test_to_store_rejects_out_of_order_days() {
        let json = r#"{"observations": [{"day": 2, "area_cm2": 4.0}]}"#;
        let case: CaseFile = serde_json::from_str(json).unwrap();
        assert!(case.to_store().is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.json");
        fs::write(&path, "{not json").unwrap();
        let err = CaseFile::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("case.json"));
    }
}
