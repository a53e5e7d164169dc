//! Observation store
//!
//! Ordered, append-only history of per-day measured records.
//!
//! Global invariants enforced:
//! - Observations are immutable once stored
//! - One observation per day, days contiguous from 1 (index = day - 1)
//! - Snapshots never observe appends made after they were taken
//! - Synthetic rows are never silently mixed with real rows

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// Metrics computed by the image-analysis collaborator for one capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MeasuredMetrics {
    pub area_cm2: f64,
    #[serde(default)]
    pub redness_pct: Option<f64>,
    #[serde(default, alias = "exudate_pct")]
    pub pus_pct: Option<f64>,
}

/// One stored, measured record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Observation {
    pub day: u32,
    pub area_cm2: f64,
    #[serde(default)]
    pub redness_pct: Option<f64>,
    #[serde(default, rename = "pus_pct", alias = "exudate_pct")]
    pub exudate_pct: Option<f64>,
    /// Demo/placeholder row
    #[serde(default)]
    pub synthetic: bool,
}

impl Observation {
    pub fn new(day: u32, metrics: MeasuredMetrics) -> Self {
        Observation {
            day,
            area_cm2: metrics.area_cm2,
            redness_pct: metrics.redness_pct,
            exudate_pct: metrics.pus_pct,
            synthetic: false,
        }
    }

    /// Mark as demo/placeholder data
    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn metrics(&self) -> MeasuredMetrics {
        MeasuredMetrics {
            area_cm2: self.area_cm2,
            redness_pct: self.redness_pct,
            pus_pct: self.exudate_pct,
        }
    }

    /// Check value ranges. NaN percentages are allowed and read as missing.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.day == 0 {
            return Err(EngineError::InvalidObservation {
                day: self.day,
                reason: "day must be >= 1".to_string(),
            });
        }
        self.metrics().validate(self.day)
    }
}

impl MeasuredMetrics {
    /// Check value ranges for the metrics reported on `day`.
    ///
    /// Area must be finite and >= 0. Percentages must lie in 0..=100;
    /// NaN reads as missing, infinities are rejected.
    pub fn validate(&self, day: u32) -> Result<(), EngineError> {
        let invalid = |reason: String| EngineError::InvalidObservation { day, reason };

        if !self.area_cm2.is_finite() || self.area_cm2 < 0.0 {
            return Err(invalid(format!(
                "area_cm2 must be a finite value >= 0 (got {})",
                self.area_cm2
            )));
        }
        for (name, value) in [("redness_pct", self.redness_pct), ("pus_pct", self.pus_pct)] {
            if let Some(v) = value {
                if !v.is_nan() && !(0.0..=100.0).contains(&v) {
                    return Err(invalid(format!("{} must be within 0..=100 (got {})", name, v)));
                }
            }
        }
        Ok(())
    }
}

/// Append-only observation history for one session.
///
/// Rows are copy-on-write behind an `Arc`, so a snapshot taken before an append
/// keeps reading the rows it started with.
#[derive(Debug, Default)]
pub struct ObservationStore {
    rows: RwLock<Arc<Vec<Observation>>>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-ordered observations
    pub fn from_observations(observations: Vec<Observation>) -> Result<Self, EngineError> {
        let store = Self::new();
        for obs in observations {
            store.append(obs)?;
        }
        Ok(store)
    }

    /// Append the next day's observation.
    ///
    /// The day must be exactly one past the current last day.
    pub fn append(&self, observation: Observation) -> Result<(), EngineError> {
        observation.validate()?;

        let mut guard = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let next_day = guard.len() as u32 + 1;
        if observation.day != next_day {
            return Err(EngineError::DayOutOfSequence {
                expected: next_day,
                got: observation.day,
            });
        }

        // Copy-on-write: rows shared with live snapshots are cloned first
        Arc::make_mut(&mut *guard).push(observation);
        Ok(())
    }

    /// Append metrics as the next day, returning the assigned 1-based day
    pub fn record(&self, metrics: MeasuredMetrics, synthetic: bool) -> Result<u32, EngineError> {
        // Hold the write lock across day assignment and append
        let mut guard = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let day = guard.len() as u32 + 1;
        let mut observation = Observation::new(day, metrics);
        observation.synthetic = synthetic;
        observation.validate()?;

        Arc::make_mut(&mut *guard).push(observation);
        Ok(day)
    }

    /// Immutable, request-scoped view of the current history
    pub fn snapshot(&self) -> ObservationSnapshot {
        let guard = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        ObservationSnapshot {
            rows: Arc::clone(&guard),
        }
    }

    pub fn len(&self) -> usize {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Frozen view of the store at one point in time
#[derive(Debug, Clone)]
pub struct ObservationSnapshot {
    rows: Arc<Vec<Observation>>,
}

impl ObservationSnapshot {
    pub fn observations(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, day: u32) -> Option<&Observation> {
        day.checked_sub(1)
            .and_then(|index| self.rows.get(index as usize))
    }

    pub fn latest(&self) -> Option<&Observation> {
        self.rows.last()
    }

    /// Day-1 area, the anchor for generated expected curves
    pub fn baseline_area(&self) -> Option<f64> {
        self.rows.first().map(|o| o.area_cm2)
    }

    /// Number of real (non-synthetic) observations
    pub fn real_count(&self) -> usize {
        self.rows.iter().filter(|o| !o.synthetic).count()
    }

    /// True when every row is demo data
    pub fn is_demo(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|o| o.synthetic)
    }

    /// Fail loudly if synthetic rows coexist with at least one real row
    pub fn assert_measured_only(&self) -> Result<(), EngineError> {
        if self.real_count() == 0 {
            return Ok(());
        }

        let days: Vec<u32> = self
            .rows
            .iter()
            .filter(|o| o.synthetic)
            .map(|o| o.day)
            .collect();

        if days.is_empty() {
            Ok(())
        } else {
            log::warn!(
                "refusing to compute trajectory: synthetic rows on days {:?} mixed with real observations",
                days
            );
            Err(EngineError::SyntheticMixedIn { days })
        }
    }
}
