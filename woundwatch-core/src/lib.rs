//! Woundwatch core library - healing trajectory and risk classification for post-operative wounds

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Every analysis reads one immutable observation snapshot
// - No global mutable state; thresholds and factor tables are passed in
// - Measured results and simulated projections never share a type
// - Synthetic rows mixed with real rows abort the analysis
// - Identical input yields identical output

pub mod alerts;
pub mod config;
pub mod deviation;
pub mod error;
pub mod explain;
pub mod input;
pub mod layer;
pub mod observation;
pub mod report;
pub mod risk;
pub mod simulation;
pub mod trajectory;

pub use alerts::{Alert, AlertKind};
pub use config::ResolvedConfig;
pub use deviation::{DayMetrics, Direction};
pub use error::EngineError;
pub use explain::Explanation;
pub use layer::{ChartSeries, Hypothetical, Measured};
pub use observation::{MeasuredMetrics, Observation, ObservationSnapshot, ObservationStore};
pub use report::{render_history_text, render_json, render_text};
pub use risk::{Classification, RiskLevel, ThresholdTable};
pub use simulation::{SimulationContext, SimulationResult};
pub use trajectory::{Trajectory, TrajectorySummary};

use alerts::{generate_alerts, AlertInputs};
use deviation::compute_day_metrics;
use explain::compose_explanation;
use layer::chart_series;
use risk::{classify, RiskSignals};
use serde::Serialize;
use trajectory::round_to;

/// Known limitations, reported with every analysis
pub const LIMITATIONS: [&str; 5] = [
    "Risk levels are heuristic, not diagnostic",
    "Single-image analysis per capture",
    "No explicit image registration across observations",
    "Lighting normalized, not fully corrected",
    "Simulation outputs are hypothetical and carry qualitative confidence only",
];

/// What to analyze
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// 1-based day
    pub day: u32,
    /// Replaces the stored metrics for `day` (historical snapshot view)
    pub override_metrics: Option<MeasuredMetrics>,
    /// Simulation runs only when this is set
    pub enable_simulation: bool,
    pub context: Option<SimulationContext>,
}

impl AnalysisRequest {
    pub fn for_day(day: u32) -> Self {
        AnalysisRequest {
            day,
            override_metrics: None,
            enable_simulation: false,
            context: None,
        }
    }

    /// Opt in to the simulated layer with the given context
    pub fn with_simulation(mut self, context: SimulationContext) -> Self {
        self.enable_simulation = true;
        self.context = Some(context);
        self
    }
}

/// History facts the pipeline needs beyond the trajectory itself
#[derive(Debug, Clone, Copy)]
pub struct HistoryContext<'a> {
    /// Expected curve fed to the simulation, index 0 = day 1
    pub reference_curve: &'a [f64],
    pub real_observations: usize,
    pub demo_mode: bool,
}

impl<'a> HistoryContext<'a> {
    /// Treat every trajectory point as a real observation
    pub fn from_trajectory(trajectory: &'a Trajectory) -> Self {
        HistoryContext {
            reference_curve: trajectory.expected(),
            real_observations: trajectory.len(),
            demo_mode: false,
        }
    }
}

/// Everything derived from measured data for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasuredAssessment {
    pub day: DayMetrics,
    pub metrics: MeasuredMetrics,
    /// Recent daily area change, %/day; `None` without enough history
    pub trend_pct: Option<f64>,
    pub classification: Classification,
    pub alerts: Vec<Alert>,
    pub explanation: Explanation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisFlags {
    /// Every observation is demo data
    pub demo_mode: bool,
    /// At least one signal was unavailable
    pub data_quality_gaps: bool,
}

/// Result of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAnalysis {
    pub measured: Measured<MeasuredAssessment>,
    pub simulation: Option<Hypothetical<SimulationResult>>,
    pub summary: TrajectorySummary,
    /// Measured, expected, and (if present) simulated series for display
    pub chart: Vec<ChartSeries>,
    /// The classification table the level was derived from
    pub thresholds: ThresholdTable,
    pub flags: AnalysisFlags,
    pub limitations: Vec<String>,
}

impl DayAnalysis {
    pub fn level(&self) -> RiskLevel {
        self.measured.get().classification.level
    }
}

/// One row of the timeline view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub day: DayMetrics,
    pub trend_pct: Option<f64>,
    pub level: RiskLevel,
    /// Title of the highest-severity alert
    pub headline: String,
}

/// Analyze one day of a stored history.
///
/// `expected` may be longer than the history (a forecast); it is truncated
/// for the trajectory and used in full as the simulation reference.
pub fn analyze_day(
    snapshot: &ObservationSnapshot,
    expected: &[f64],
    request: &AnalysisRequest,
    config: &ResolvedConfig,
) -> Result<DayAnalysis, EngineError> {
    let trajectory = Trajectory::from_observations(snapshot, expected)?;
    let index = trajectory.index_of(request.day)?;
    let current = match request.override_metrics {
        Some(metrics) => metrics,
        None => snapshot.observations()[index].metrics(),
    };

    let history = HistoryContext {
        reference_curve: expected,
        real_observations: snapshot.real_count(),
        demo_mode: snapshot.is_demo(),
    };
    analyze_trajectory(&trajectory, &current, request, config, &history)
}

/// Analyze one day from a caller-supplied trajectory and that day's metrics.
///
/// `current` is range-checked like a stored observation.
pub fn analyze_trajectory(
    trajectory: &Trajectory,
    current: &MeasuredMetrics,
    request: &AnalysisRequest,
    config: &ResolvedConfig,
    history: &HistoryContext<'_>,
) -> Result<DayAnalysis, EngineError> {
    current.validate(request.day)?;
    let assessment = assess(trajectory, current, request.day, config)?;

    let simulation = if request.enable_simulation {
        match (request.context.as_ref(), config.simulation.as_ref()) {
            (Some(context), Some(table)) => simulation::simulate(
                context,
                history.reference_curve,
                history.real_observations,
                table,
            ),
            (None, _) => {
                log::debug!("simulation unavailable: no context supplied");
                None
            }
            (_, None) => {
                log::debug!("simulation unavailable: no factor table configured");
                None
            }
        }
    } else {
        None
    };

    let flags = AnalysisFlags {
        demo_mode: history.demo_mode,
        data_quality_gaps: !assessment.classification.data_gaps.is_empty(),
    };

    log::debug!(
        "day {} analyzed: {} with {} alert(s), simulation {}",
        request.day,
        assessment.classification.level,
        assessment.alerts.len(),
        if simulation.is_some() { "present" } else { "absent" }
    );

    let chart = chart_series(trajectory, simulation.as_ref());

    Ok(DayAnalysis {
        measured: Measured::new(assessment),
        simulation,
        summary: trajectory.summary(),
        chart,
        thresholds: config.thresholds,
        flags,
        limitations: LIMITATIONS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Deviation, risk, and alerts for every observed day
pub fn history(
    snapshot: &ObservationSnapshot,
    expected: &[f64],
    config: &ResolvedConfig,
) -> Result<Vec<HistoryRow>, EngineError> {
    let trajectory = Trajectory::from_observations(snapshot, expected)?;

    snapshot
        .observations()
        .iter()
        .map(|obs| {
            let assessment = assess(&trajectory, &obs.metrics(), obs.day, config)?;
            let headline = assessment
                .alerts
                .first()
                .map(|a| a.title.clone())
                .unwrap_or_default();
            Ok(HistoryRow {
                day: assessment.day,
                trend_pct: assessment.trend_pct,
                level: assessment.classification.level,
                headline,
            })
        })
        .collect()
}

/// The measured pipeline: deviation, classification, alerts, explanation
fn assess(
    trajectory: &Trajectory,
    current: &MeasuredMetrics,
    day: u32,
    config: &ResolvedConfig,
) -> Result<MeasuredAssessment, EngineError> {
    let metrics = compute_day_metrics(day, trajectory, Some(current))?;

    // Rounded before classifying so the displayed trend is the classified trend
    let trend_pct = trajectory
        .recent_daily_rate_pct(day, current.area_cm2, config.trend_window_days)?
        .map(|rate| round_to(rate, 2));

    let signals = RiskSignals {
        area_deviation_cm2: Some(metrics.deviation),
        area_trend_pct: trend_pct,
        redness_pct: current.redness_pct,
        exudate_pct: current.pus_pct,
    };
    let classification = classify(&signals, &config.thresholds, day == 1);

    let alerts = generate_alerts(
        &AlertInputs {
            day: &metrics,
            measured: current,
            classification: &classification,
        },
        &config.thresholds,
    );
    let explanation = compose_explanation(&classification, &metrics, &alerts);

    Ok(MeasuredAssessment {
        day: metrics,
        metrics: *current,
        trend_pct,
        classification,
        alerts,
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{
        AgeBracket, DiabetesStatus, SimulationConfig, SmokingStatus, SurgeryCategory,
    };

    const ACTUAL: [f64; 7] = [5.0, 4.7, 4.3, 4.0, 3.8, 3.5, 4.2];
    const EXPECTED: [f64; 7] = [5.0, 4.5, 4.0, 3.5, 3.0, 2.5, 2.0];

    fn store() -> ObservationStore {
        let store = ObservationStore::new();
        for area in ACTUAL {
            store
                .record(
                    MeasuredMetrics {
                        area_cm2: area,
                        redness_pct: Some(10.0),
                        pus_pct: Some(1.0),
                    },
                    false,
                )
                .unwrap();
        }
        store
    }

    fn context() -> SimulationContext {
        SimulationContext {
            diabetes: Some(DiabetesStatus::Absent),
            smoking: Some(SmokingStatus::Current),
            age: Some(AgeBracket::Under40),
            surgery: Some(SurgeryCategory::Clean),
            reference_object: false,
        }
    }

    fn config_with_simulation() -> ResolvedConfig {
        let mut table = SimulationConfig::default();
        table.factors.diabetes.insert(DiabetesStatus::Absent, 1.0);
        table.factors.smoking.insert(SmokingStatus::Current, 0.8);
        table.factors.age.insert(AgeBracket::Under40, 1.0);
        table.factors.surgery.insert(SurgeryCategory::Clean, 1.0);
        ResolvedConfig {
            simulation: Some(table),
            ..ResolvedConfig::defaults()
        }
    }

    #[test]
    fn test_day_seven_is_red() {
        let analysis = analyze_day(
            &store().snapshot(),
            &EXPECTED,
            &AnalysisRequest::for_day(7),
            &ResolvedConfig::defaults(),
        )
        .unwrap();

        let assessment = analysis.measured.get();
        assert_eq!(analysis.level(), RiskLevel::Red);
        assert_eq!(assessment.trend_pct, Some(20.0));
        assert_eq!(assessment.alerts[0].id, AlertKind::AreaAboveExpected);
        assert_eq!(assessment.explanation.status, "Attention recommended");
        assert!(analysis.simulation.is_none());
        assert_eq!(analysis.summary.current_diff_cm2, 2.2);
    }

    #[test]
    fn test_day_one_has_history_gap() {
        let analysis = analyze_day(
            &store().snapshot(),
            &EXPECTED,
            &AnalysisRequest::for_day(1),
            &ResolvedConfig::defaults(),
        )
        .unwrap();
        assert_eq!(analysis.level(), RiskLevel::Amber);
        assert!(analysis.flags.data_quality_gaps);
        assert_eq!(
            analysis.measured.get().alerts[0].id,
            AlertKind::IncompleteData
        );
    }

    #[test]
    fn test_out_of_range_day() {
        let err = analyze_day(
            &store().snapshot(),
            &EXPECTED,
            &AnalysisRequest::for_day(8),
            &ResolvedConfig::defaults(),
        )
        .unwrap_err();
        assert_eq!(err, EngineError::OutOfRange { day: 8, len: 7 });
    }

    #[test]
    fn test_simulation_requires_opt_in() {
        let mut request = AnalysisRequest::for_day(7);
        request.context = Some(context());
        let analysis = analyze_day(
            &store().snapshot(),
            &EXPECTED,
            &request,
            &config_with_simulation(),
        )
        .unwrap();
        assert!(analysis.simulation.is_none());
    }

    #[test]
    fn test_simulation_when_opted_in() {
        let request = AnalysisRequest::for_day(7).with_simulation(context());
        let analysis = analyze_day(
            &store().snapshot(),
            &EXPECTED,
            &request,
            &config_with_simulation(),
        )
        .unwrap();
        let sim = analysis.simulation.expect("simulation");
        assert_eq!(sim.get().velocity_multiplier, 0.8);
        // Measured layer is unchanged by the simulation
        assert_eq!(analysis.measured.get().day.actual, 4.2);
    }

    #[test]
    fn test_simulation_without_table_is_absent() {
        let request = AnalysisRequest::for_day(7).with_simulation(context());
        let analysis = analyze_day(
            &store().snapshot(),
            &EXPECTED,
            &request,
            &ResolvedConfig::defaults(),
        )
        .unwrap();
        assert!(analysis.simulation.is_none());
    }

    #[test]
    fn test_override_metrics() {
        let mut request = AnalysisRequest::for_day(7);
        request.override_metrics = Some(MeasuredMetrics {
            area_cm2: 3.2,
            redness_pct: Some(5.0),
            pus_pct: Some(0.5),
        });
        let analysis = analyze_day(
            &store().snapshot(),
            &EXPECTED,
            &request,
            &ResolvedConfig::defaults(),
        )
        .unwrap();
        let assessment = analysis.measured.get();
        assert_eq!(assessment.day.actual, 3.2);
        assert_eq!(assessment.metrics.redness_pct, Some(5.0));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        for area in [f64::NAN, -1.0, f64::INFINITY] {
            let mut request = AnalysisRequest::for_day(7);
            request.override_metrics = Some(MeasuredMetrics {
                area_cm2: area,
                redness_pct: Some(5.0),
                pus_pct: Some(0.5),
            });
            let err = analyze_day(
                &store().snapshot(),
                &EXPECTED,
                &request,
                &ResolvedConfig::defaults(),
            )
            .unwrap_err();
            assert!(matches!(err, EngineError::InvalidObservation { day: 7, .. }));
        }

        let mut request = AnalysisRequest::for_day(7);
        request.override_metrics = Some(MeasuredMetrics {
            area_cm2: 3.2,
            redness_pct: Some(f64::INFINITY),
            pus_pct: Some(0.5),
        });
        assert!(analyze_day(
            &store().snapshot(),
            &EXPECTED,
            &request,
            &ResolvedConfig::defaults(),
        )
        .is_err());
    }

    #[test]
    fn test_far_above_expected_is_never_on_track() {
        // Shrinking 6%/day, but 4.4 cm² above the expected curve
        let trajectory = Trajectory::new(vec![10.0, 5.0], vec![10.0, 9.4]).unwrap();
        let current = MeasuredMetrics {
            area_cm2: 9.4,
            redness_pct: Some(10.0),
            pus_pct: Some(1.0),
        };
        let analysis = analyze_trajectory(
            &trajectory,
            &current,
            &AnalysisRequest::for_day(2),
            &ResolvedConfig::defaults(),
            &HistoryContext::from_trajectory(&trajectory),
        )
        .unwrap();
        let assessment = analysis.measured.get();

        assert_eq!(assessment.alerts[0].id, AlertKind::AreaAboveExpected);
        assert_eq!(analysis.level(), RiskLevel::Red);
        assert!(analysis.level() >= assessment.alerts[0].severity);
        assert_eq!(assessment.explanation.status, "Attention recommended");
    }

    #[test]
    fn test_chart_and_thresholds_travel_with_analysis() {
        let request = AnalysisRequest::for_day(7).with_simulation(context());
        let config = config_with_simulation();
        let analysis = analyze_day(&store().snapshot(), &EXPECTED, &request, &config).unwrap();

        assert_eq!(analysis.thresholds, config.thresholds);
        let kinds: Vec<layer::SeriesKind> = analysis.chart.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                layer::SeriesKind::Measured,
                layer::SeriesKind::Expected,
                layer::SeriesKind::Simulated
            ]
        );
        assert_eq!(analysis.chart[0].points.len(), 7);
    }

    #[test]
    fn test_history_rows() {
        let rows = history(&store().snapshot(), &EXPECTED, &ResolvedConfig::defaults()).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].level, RiskLevel::Amber);
        assert_eq!(rows[0].trend_pct, None);
        assert_eq!(rows[6].level, RiskLevel::Red);
        assert_eq!(rows[6].headline, "Wound area above expected");
    }

    #[test]
    fn test_analyze_trajectory_direct() {
        let trajectory = Trajectory::new(EXPECTED.to_vec(), ACTUAL.to_vec()).unwrap();
        let current = MeasuredMetrics {
            area_cm2: 4.2,
            redness_pct: Some(30.0),
            pus_pct: Some(1.0),
        };
        let analysis = analyze_trajectory(
            &trajectory,
            &current,
            &AnalysisRequest::for_day(7),
            &ResolvedConfig::defaults(),
            &HistoryContext::from_trajectory(&trajectory),
        )
        .unwrap();
        assert_eq!(analysis.level(), RiskLevel::Red);
        assert!(!analysis.flags.demo_mode);
    }

    #[test]
    fn test_demo_history_is_flagged() {
        let store = ObservationStore::new();
        for area in [12.0, 11.2, 10.5] {
            store
                .record(
                    MeasuredMetrics {
                        area_cm2: area,
                        redness_pct: Some(5.0),
                        pus_pct: Some(0.2),
                    },
                    true,
                )
                .unwrap();
        }
        let expected = trajectory::expected_curve(12.0, 3, 0.10);
        let analysis = analyze_day(
            &store.snapshot(),
            &expected,
            &AnalysisRequest::for_day(3),
            &ResolvedConfig::defaults(),
        )
        .unwrap();
        assert!(analysis.flags.demo_mode);
    }
}
