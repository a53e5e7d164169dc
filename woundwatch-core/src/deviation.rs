//! Per-day deviation from the expected healing curve
//!
//! Global invariants enforced:
//! - Pure function of its inputs (same inputs = same output)
//! - Out-of-range days are reported, never clamped
//! - Direction uses a symmetric dead-band so noise cannot flip it

use crate::error::EngineError;
use crate::observation::MeasuredMetrics;
use crate::trajectory::Trajectory;
use serde::{Deserialize, Serialize};

/// Changes within ±this percentage read as stable
pub const DIRECTION_DEAD_BAND_PCT: f64 = 0.1;

/// Day-over-day direction of the wound area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Stable,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Stable => "stable",
        }
    }

    /// Classify a percentage change against the dead-band
    pub fn from_change_pct(change_pct: f64) -> Self {
        if change_pct > DIRECTION_DEAD_BAND_PCT {
            Direction::Up
        } else if change_pct < -DIRECTION_DEAD_BAND_PCT {
            Direction::Down
        } else {
            Direction::Stable
        }
    }
}

/// Derived metrics for one day (not persisted)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DayMetrics {
    pub day: u32,
    pub actual: f64,
    pub expected: f64,
    /// actual - expected; positive means larger than expected
    pub deviation: f64,
    pub change_from_prev_pct: f64,
    pub direction: Direction,
}

/// Compute `DayMetrics` for a 1-based `day`.
///
/// `override_metrics` replaces the stored actual area for that day
/// (historical snapshot view). The previous day always comes from the
/// trajectory; day 1 has no change.
pub fn compute_day_metrics(
    day: u32,
    trajectory: &Trajectory,
    override_metrics: Option<&MeasuredMetrics>,
) -> Result<DayMetrics, EngineError> {
    let index = trajectory.index_of(day)?;

    let actual = override_metrics
        .map(|m| m.area_cm2)
        .unwrap_or(trajectory.actual()[index]);
    let expected = trajectory.expected()[index];
    let deviation = actual - expected;

    let prev_actual = if index > 0 {
        trajectory.actual()[index - 1]
    } else {
        actual
    };

    let change_from_prev_pct = if prev_actual > 0.0 {
        (actual - prev_actual) / prev_actual * 100.0
    } else {
        0.0
    };

    Ok(DayMetrics {
        day,
        actual,
        expected,
        deviation,
        change_from_prev_pct,
        direction: Direction::from_change_pct(change_from_prev_pct),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Trajectory {
        Trajectory::new(
            vec![5.0, 4.5, 4.0, 3.5, 3.0, 2.5, 2.0],
            vec![5.0, 4.7, 4.3, 4.0, 3.8, 3.5, 4.2],
        )
        .unwrap()
    }

    #[test]
    fn test_day_seven_worsening() {
        let m = compute_day_metrics(7, &sample(), None).unwrap();
        assert_eq!(m.actual, 4.2);
        assert_eq!(m.expected, 2.0);
        assert!((m.deviation - 2.2).abs() < 1e-9);
        assert!((m.change_from_prev_pct - 20.0).abs() < 1e-9);
        assert_eq!(m.direction, Direction::Up);
    }

    #[test]
    fn test_day_one_has_no_change() {
        let m = compute_day_metrics(1, &sample(), None).unwrap();
        assert_eq!(m.change_from_prev_pct, 0.0);
        assert_eq!(m.direction, Direction::Stable);
        assert_eq!(m.deviation, 0.0);
    }

    #[test]
    fn test_out_of_range_days() {
        let t = sample();
        assert_eq!(
            compute_day_metrics(0, &t, None).unwrap_err(),
            EngineError::OutOfRange { day: 0, len: 7 }
        );
        assert_eq!(
            compute_day_metrics(8, &t, None).unwrap_err(),
            EngineError::OutOfRange { day: 8, len: 7 }
        );
    }

    #[test]
    fn test_override_replaces_actual() {
        let over = MeasuredMetrics {
            area_cm2: 3.5,
            redness_pct: None,
            pus_pct: None,
        };
        let m = compute_day_metrics(7, &sample(), Some(&over)).unwrap();
        assert_eq!(m.actual, 3.5);
        assert_eq!(m.change_from_prev_pct, 0.0);
        assert_eq!(m.direction, Direction::Stable);
    }

    #[test]
    fn test_zero_previous_area() {
        let t = Trajectory::new(vec![1.0, 0.5], vec![0.0, 0.4]).unwrap();
        let m = compute_day_metrics(2, &t, None).unwrap();
        assert_eq!(m.change_from_prev_pct, 0.0);
        assert_eq!(m.direction, Direction::Stable);
    }

    #[test]
    fn test_dead_band() {
        assert_eq!(Direction::from_change_pct(0.1), Direction::Stable);
        assert_eq!(Direction::from_change_pct(-0.1), Direction::Stable);
        assert_eq!(Direction::from_change_pct(0.11), Direction::Up);
        assert_eq!(Direction::from_change_pct(-0.11), Direction::Down);
    }

    #[test]
    fn test_healing_day_is_down() {
        let m = compute_day_metrics(2, &sample(), None).unwrap();
        assert_eq!(m.direction, Direction::Down);
        assert!((m.deviation - 0.2).abs() < 1e-9);
    }
}
