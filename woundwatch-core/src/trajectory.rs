//! Healing trajectory: expected vs actual wound area per day
//!
//! Global invariants enforced:
//! - `expected` and `actual` are index-aligned (index 0 = day 1) and equal length
//! - Actual areas come only from measured observations
//! - Trajectories are derived, never mutated in place

use crate::error::EngineError;
use crate::observation::ObservationSnapshot;
use serde::{Deserialize, Serialize};

/// Index-aligned expected and measured area series (cm²).
///
/// Deserialized input goes through `Trajectory::new`, so a decoded
/// trajectory holds the same guarantees as a constructed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "TrajectoryData")]
pub struct Trajectory {
    expected: Vec<f64>,
    actual: Vec<f64>,
}

/// Unchecked wire form of a trajectory
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TrajectoryData {
    expected: Vec<f64>,
    actual: Vec<f64>,
}

impl TryFrom<TrajectoryData> for Trajectory {
    type Error = EngineError;

    fn try_from(data: TrajectoryData) -> Result<Self, Self::Error> {
        Trajectory::new(data.expected, data.actual)
    }
}

/// Comparison of the latest actual point against the latest expected point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrajectorySummary {
    /// (actual - expected) / expected * 100, 0 when expected is 0
    pub deviation_pct: f64,
    pub current_diff_cm2: f64,
}

impl Trajectory {
    pub fn new(expected: Vec<f64>, actual: Vec<f64>) -> Result<Self, EngineError> {
        if actual.is_empty() {
            return Err(EngineError::EmptyHistory);
        }
        if expected.len() != actual.len() {
            return Err(EngineError::LengthMismatch {
                expected: expected.len(),
                actual: actual.len(),
            });
        }
        for (series, values) in [("expected", &expected), ("actual", &actual)] {
            if let Some(index) = values.iter().position(|v| !v.is_finite() || *v < 0.0) {
                return Err(EngineError::InvalidTrajectoryPoint {
                    series,
                    day: index as u32 + 1,
                    value: values[index],
                });
            }
        }
        Ok(Trajectory { expected, actual })
    }

    /// Build from measured observations and an externally supplied expected curve.
    ///
    /// A longer expected curve (a forecast) is truncated to the observed days.
    pub fn from_observations(
        snapshot: &ObservationSnapshot,
        expected: &[f64],
    ) -> Result<Self, EngineError> {
        snapshot.assert_measured_only()?;

        let observed = snapshot.len();
        if observed == 0 {
            return Err(EngineError::EmptyHistory);
        }
        if expected.len() < observed {
            return Err(EngineError::ExpectedCurveTooShort {
                expected: expected.len(),
                observed,
            });
        }

        let actual = snapshot.observations().iter().map(|o| o.area_cm2).collect();
        Trajectory::new(expected[..observed].to_vec(), actual)
    }

    pub fn expected(&self) -> &[f64] {
        &self.expected
    }

    pub fn actual(&self) -> &[f64] {
        &self.actual
    }

    /// Number of days covered
    pub fn len(&self) -> usize {
        self.actual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actual.is_empty()
    }

    /// Convert a 1-based day into an index, rejecting out-of-range days
    pub fn index_of(&self, day: u32) -> Result<usize, EngineError> {
        match day.checked_sub(1) {
            Some(index) if (index as usize) < self.len() => Ok(index as usize),
            _ => Err(EngineError::OutOfRange {
                day,
                len: self.len(),
            }),
        }
    }

    /// Recent daily rate of change of actual area, in %/day.
    ///
    /// Geometric mean over the last `min(window, day - 1)` day-over-day steps
    /// ending at `current_area` on `day`. `None` when there is no history
    /// behind the day or the base area is zero.
    pub fn recent_daily_rate_pct(
        &self,
        day: u32,
        current_area: f64,
        window: u32,
    ) -> Result<Option<f64>, EngineError> {
        let index = self.index_of(day)?;
        let steps = (window as usize).min(index);
        if steps == 0 {
            return Ok(None);
        }

        let base = self.actual[index - steps];
        if base <= 0.0 || !current_area.is_finite() {
            return Ok(None);
        }

        let ratio = current_area / base;
        let rate = (ratio.powf(1.0 / steps as f64) - 1.0) * 100.0;
        Ok(Some(rate))
    }

    /// Latest actual vs latest expected
    pub fn summary(&self) -> TrajectorySummary {
        let last = self.len() - 1;
        let current_expected = self.expected[last];
        let current_actual = self.actual[last];

        let deviation_pct = if current_expected > 0.0 {
            (current_actual - current_expected) / current_expected * 100.0
        } else {
            0.0
        };

        TrajectorySummary {
            deviation_pct: round_to(deviation_pct, 1),
            current_diff_cm2: round_to(current_actual - current_expected, 2),
        }
    }
}

/// Expected healing curve with a compounding daily reduction.
///
/// `area(t) = initial * (1 - rate)^t` for `t` in `0..days`, rounded to 0.01 cm².
pub fn expected_curve(initial_area: f64, days: usize, healing_rate: f64) -> Vec<f64> {
    (0..days)
        .map(|t| round_to(initial_area * (1.0 - healing_rate).powi(t as i32), 2))
        .collect()
}

/// Round half away from zero to `decimals` places
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
