//! Measured vs simulated data layers
//!
//! Global invariants enforced:
//! - Measured and simulated values are distinct types with no conversion between them
//! - Both serialize with an explicit `kind` tag
//! - A simulated chart series can only be built from a `Hypothetical`

use crate::simulation::SimulationResult;
use crate::trajectory::Trajectory;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Ground truth derived from an analyzed observation
#[derive(Debug, Clone, PartialEq)]
pub struct Measured<T>(T);

impl<T> Measured<T> {
    pub fn new(value: T) -> Self {
        Measured(value)
    }

    pub fn get(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Projection derived from declared assumptions; never ground truth
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothetical<T>(T);

impl<T> Hypothetical<T> {
    pub fn new(value: T) -> Self {
        Hypothetical(value)
    }

    pub fn get(&self) -> &T {
        &self.0
    }

    /// Drop the simulated tag. Callers take responsibility for the result.
    pub fn into_assumed(self) -> T {
        self.0
    }
}

fn serialize_tagged<S, T>(
    serializer: S,
    name: &'static str,
    kind: &str,
    value: &T,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut state = serializer.serialize_struct(name, 2)?;
    state.serialize_field("kind", kind)?;
    state.serialize_field("value", value)?;
    state.end()
}

impl<T: Serialize> Serialize for Measured<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_tagged(serializer, "Measured", "measured", &self.0)
    }
}

impl<T: Serialize> Serialize for Hypothetical<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_tagged(serializer, "Hypothetical", "simulated", &self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Measured,
    Expected,
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub day: u32,
    pub area_cm2: f64,
}

/// One line on the healing chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub kind: SeriesKind,
    pub points: Vec<ChartPoint>,
}

fn points(values: &[f64]) -> Vec<ChartPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &area_cm2)| ChartPoint {
            day: i as u32 + 1,
            area_cm2,
        })
        .collect()
}

/// Merge measured and simulated layers for display.
///
/// Measured and expected series come from the trajectory; the simulated
/// series is present only when a simulation was produced.
pub fn chart_series(
    trajectory: &Trajectory,
    simulation: Option<&Hypothetical<SimulationResult>>,
) -> Vec<ChartSeries> {
    let mut series = vec![
        ChartSeries {
            kind: SeriesKind::Measured,
            points: points(trajectory.actual()),
        },
        ChartSeries {
            kind: SeriesKind::Expected,
            points: points(trajectory.expected()),
        },
    ];

    if let Some(sim) = simulation {
        series.push(ChartSeries {
            kind: SeriesKind::Simulated,
            points: points(&sim.get().extrapolated_curve),
        });
    }

    series
}
