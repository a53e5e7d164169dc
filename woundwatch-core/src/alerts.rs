//! Explainable alert generation
//!
//! Evaluates a fixed rule table against one day's metrics.
//!
//! Global invariants enforced:
//! - Rules are evaluated independently; every matching rule fires
//! - The returned list is never empty (an on-track alert stands in)
//! - Ordering is deterministic (severity descending, then rule order)
//! - Numbers in a description are exactly the numbers in its metric

use crate::deviation::{DayMetrics, Direction};
use crate::observation::MeasuredMetrics;
use crate::risk::{Classification, RiskLevel, Signal, ThresholdTable};
use crate::trajectory::round_to;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Alert identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    AreaAboveExpected,
    AreaBelowExpected,
    AreaIncreasing,
    HealingStalled,
    Redness,
    Exudate,
    IncompleteData,
    OnTrack,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::AreaAboveExpected => "area-above-expected",
            AlertKind::AreaBelowExpected => "area-below-expected",
            AlertKind::AreaIncreasing => "area-increasing",
            AlertKind::HealingStalled => "healing-stalled",
            AlertKind::Redness => "redness",
            AlertKind::Exudate => "exudate",
            AlertKind::IncompleteData => "incomplete-data",
            AlertKind::OnTrack => "on-track",
        }
    }
}

/// The literal measurement behind an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AlertMetric {
    pub label: String,
    pub value: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

/// One explainable alert. Generated per analysis, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Alert {
    pub id: AlertKind,
    pub title: String,
    pub description: String,
    pub severity: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<AlertMetric>,
    /// The threshold rule that fired, quoted with its cut point
    pub rule: String,
}

/// Everything a rule may look at
#[derive(Debug, Clone, Copy)]
pub struct AlertInputs<'a> {
    pub day: &'a DayMetrics,
    pub measured: &'a MeasuredMetrics,
    pub classification: &'a Classification,
}

type Rule = fn(&AlertInputs<'_>, &ThresholdTable) -> Option<Alert>;

/// Evaluation order doubles as the tie-break for equal severities
const RULES: [Rule; 5] = [
    area_deviation_rule,
    area_trend_rule,
    redness_rule,
    exudate_rule,
    data_quality_rule,
];

/// Generate the ordered alert list for one day
pub fn generate_alerts(inputs: &AlertInputs<'_>, table: &ThresholdTable) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = RULES
        .iter()
        .filter_map(|rule| rule(inputs, table))
        .collect();

    if alerts.is_empty() {
        alerts.push(on_track_alert(inputs));
    }

    sort_alerts(&mut alerts);
    alerts
}

/// Severity descending; stable, so rule order breaks ties
pub fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(compare_alerts);
}

fn compare_alerts(a: &Alert, b: &Alert) -> Ordering {
    b.severity.cmp(&a.severity)
}

/// Area deviation
///
/// Triggers when `|deviation| > area_deviation.amber_above` (cm²).
/// RED above `area_deviation.red_above`.
///
/// Above/below follows the sign of the deviation, not the day-over-day
/// direction: a wound can shrink today and still be larger than expected.
/// The direction is carried on the metric instead.
fn area_deviation_rule(inputs: &AlertInputs<'_>, table: &ThresholdTable) -> Option<Alert> {
    let day = inputs.day;
    let band = table.area_deviation;
    let severity = band.level(day.deviation.abs());
    if severity == RiskLevel::Green {
        return None;
    }

    let deviation = round_to(day.deviation, 2);
    let actual = round_to(day.actual, 2);
    let expected = round_to(day.expected, 2);
    let change_pct = (day.expected > 0.0).then(|| round_to(day.deviation / day.expected * 100.0, 1));

    let (id, title, relation) = if day.deviation > 0.0 {
        (
            AlertKind::AreaAboveExpected,
            "Wound area above expected",
            "larger",
        )
    } else {
        (
            AlertKind::AreaBelowExpected,
            "Wound area below expected",
            "smaller",
        )
    };

    let relative = change_pct
        .map(|pct| format!(" ({:+}% relative to expected)", pct))
        .unwrap_or_default();
    let description = format!(
        "Measured area {} cm² is {} cm² {} than the expected {} cm² on day {}{}.",
        actual,
        deviation.abs(),
        relation,
        expected,
        day.day,
        relative
    );

    Some(Alert {
        id,
        title: title.to_string(),
        description,
        severity,
        metric: Some(AlertMetric {
            label: "Area deviation".to_string(),
            value: deviation,
            unit: "cm²".to_string(),
            change_pct,
            direction: Some(day.direction),
        }),
        rule: format!(
            "|Area deviation| {} cm² > {} cm² => {}",
            deviation.abs(),
            band.boundary_for(severity),
            severity
        ),
    })
}

/// Area trend
///
/// Mirrors the classifier's trend reading: RED when the area is growing,
/// AMBER when reduction has stalled.
fn area_trend_rule(inputs: &AlertInputs<'_>, _table: &ThresholdTable) -> Option<Alert> {
    let reading = inputs.classification.reading(Signal::AreaTrend)?;
    let value = reading.value?;
    let limit = reading.band.boundary_for(reading.level);
    let (id, title, description) = match reading.level {
        RiskLevel::Green => return None,
        RiskLevel::Amber => (
            AlertKind::HealingStalled,
            "Healing stalled",
            format!(
                "Area changed {}%/day, slower than the {}%/day healing pace.",
                value, limit
            ),
        ),
        RiskLevel::Red => (
            AlertKind::AreaIncreasing,
            "Wound area increasing",
            format!("Area grew {}%/day (above {}%/day).", value, limit),
        ),
    };

    Some(Alert {
        id,
        title: title.to_string(),
        description,
        severity: reading.level,
        metric: Some(AlertMetric {
            label: "Daily area trend".to_string(),
            value,
            unit: "%/day".to_string(),
            change_pct: Some(value),
            direction: Some(inputs.day.direction),
        }),
        rule: reading.rule_text(),
    })
}

/// Peri-wound redness
///
/// Shares the classifier's redness band: AMBER above `redness.amber_above`,
/// RED above `redness.red_above`.
fn redness_rule(inputs: &AlertInputs<'_>, table: &ThresholdTable) -> Option<Alert> {
    let redness = measured_value(inputs.measured.redness_pct)?;
    let severity = table.redness.level(redness);
    if severity == RiskLevel::Green {
        return None;
    }

    let value = round_to(redness, 2);
    let limit = table.redness.boundary_for(severity);
    Some(Alert {
        id: AlertKind::Redness,
        title: "Elevated redness".to_string(),
        description: format!(
            "Redness covers {}% of the peri-wound region (above {}%).",
            value, limit
        ),
        severity,
        metric: Some(AlertMetric {
            label: "Redness".to_string(),
            value,
            unit: "%".to_string(),
            change_pct: None,
            direction: None,
        }),
        rule: format!("Redness {}% > {}% => {}", value, limit, severity),
    })
}

/// Exudate
///
/// Triggers when exudate `> alerts.exudate_alert_pct`. Always RED.
fn exudate_rule(inputs: &AlertInputs<'_>, table: &ThresholdTable) -> Option<Alert> {
    let exudate = measured_value(inputs.measured.pus_pct)?;
    let limit = table.alerts.exudate_alert_pct;
    if exudate <= limit {
        return None;
    }

    let value = round_to(exudate, 2);
    Some(Alert {
        id: AlertKind::Exudate,
        title: "Exudate detected".to_string(),
        description: format!(
            "Exudate covers {}% of the wound area (above {}%).",
            value, limit
        ),
        severity: RiskLevel::Red,
        metric: Some(AlertMetric {
            label: "Exudate".to_string(),
            value,
            unit: "%".to_string(),
            change_pct: None,
            direction: None,
        }),
        rule: format!("Exudate {}% > {}% => {}", value, limit, RiskLevel::Red),
    })
}

/// Data quality
///
/// One AMBER alert listing every signal the classifier could not read.
fn data_quality_rule(inputs: &AlertInputs<'_>, _table: &ThresholdTable) -> Option<Alert> {
    let gaps = &inputs.classification.data_gaps;
    if gaps.is_empty() {
        return None;
    }

    let listed = gaps
        .iter()
        .map(|g| g.describe())
        .collect::<Vec<_>>()
        .join("; ");
    Some(Alert {
        id: AlertKind::IncompleteData,
        title: "Incomplete measurements".to_string(),
        description: format!("{}. Risk defaults to monitoring until resolved.", listed),
        severity: RiskLevel::Amber,
        metric: None,
        rule: format!(
            "{} signal(s) unavailable => {}",
            gaps.len(),
            RiskLevel::Amber
        ),
    })
}

fn on_track_alert(inputs: &AlertInputs<'_>) -> Alert {
    let day = inputs.day;
    let deviation = round_to(day.deviation, 2);
    Alert {
        id: AlertKind::OnTrack,
        title: "Healing on track".to_string(),
        description: format!(
            "Day {}: no alert thresholds crossed ({:+} cm² from expected).",
            day.day, deviation
        ),
        severity: RiskLevel::Green,
        metric: Some(AlertMetric {
            label: "Area deviation".to_string(),
            value: deviation,
            unit: "cm²".to_string(),
            change_pct: None,
            direction: Some(day.direction),
        }),
        rule: format!("No alert threshold crossed => {}", RiskLevel::Green),
    }
}

fn measured_value(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deviation::compute_day_metrics;
    use crate::risk::{classify_default, RiskSignals};
    use crate::trajectory::Trajectory;

    fn day_metrics(actual: f64, expected: f64, direction: Direction) -> DayMetrics {
        DayMetrics {
            day: 3,
            actual,
            expected,
            deviation: actual - expected,
            change_from_prev_pct: 0.0,
            direction,
        }
    }

    fn measured(redness: f64, exudate: f64) -> MeasuredMetrics {
        MeasuredMetrics {
            area_cm2: 4.0,
            redness_pct: Some(redness),
            pus_pct: Some(exudate),
        }
    }

    fn run(day: &DayMetrics, m: &MeasuredMetrics) -> Vec<Alert> {
        let classification = classify_default(&RiskSignals {
            area_deviation_cm2: Some(day.deviation),
            area_trend_pct: Some(-6.0),
            redness_pct: m.redness_pct,
            exudate_pct: m.pus_pct,
        });
        let inputs = AlertInputs {
            day,
            measured: m,
            classification: &classification,
        };
        generate_alerts(&inputs, &ThresholdTable::default())
    }

    #[test]
    fn test_on_track_when_nothing_fires() {
        let alerts = run(&day_metrics(4.2, 4.0, Direction::Down), &measured(5.0, 1.0));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, AlertKind::OnTrack);
        assert_eq!(alerts[0].severity, RiskLevel::Green);
    }

    #[test]
    fn test_worsening_day_seven_area_alert_is_red() {
        let t = Trajectory::new(
            vec![5.0, 4.5, 4.0, 3.5, 3.0, 2.5, 2.0],
            vec![5.0, 4.7, 4.3, 4.0, 3.8, 3.5, 4.2],
        )
        .unwrap();
        let day = compute_day_metrics(7, &t, None).unwrap();
        let alerts = run(&day, &measured(10.0, 1.0));

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.id, AlertKind::AreaAboveExpected);
        assert_eq!(alert.severity, RiskLevel::Red);
        let metric = alert.metric.as_ref().unwrap();
        assert_eq!(metric.value, 2.2);
        assert_eq!(metric.change_pct, Some(110.0));
        assert_eq!(metric.direction, Some(Direction::Up));
    }

    #[test]
    fn test_area_deviation_amber_band() {
        let alerts = run(&day_metrics(4.0, 3.0, Direction::Up), &measured(5.0, 1.0));
        assert_eq!(alerts[0].id, AlertKind::AreaAboveExpected);
        assert_eq!(alerts[0].severity, RiskLevel::Amber);
    }

    #[test]
    fn test_area_below_expected_title() {
        let alerts = run(&day_metrics(2.0, 3.0, Direction::Down), &measured(5.0, 1.0));
        assert_eq!(alerts[0].id, AlertKind::AreaBelowExpected);
        assert_eq!(alerts[0].title, "Wound area below expected");
        assert_eq!(alerts[0].metric.as_ref().unwrap().value, -1.0);
    }

    #[test]
    fn test_deviation_at_threshold_does_not_fire() {
        let alerts = run(&day_metrics(3.5, 3.0, Direction::Up), &measured(5.0, 1.0));
        assert_eq!(alerts[0].id, AlertKind::OnTrack);
    }

    #[test]
    fn test_redness_severity() {
        let alerts = run(&day_metrics(3.0, 3.0, Direction::Stable), &measured(20.0, 1.0));
        assert_eq!(alerts[0].id, AlertKind::Redness);
        assert_eq!(alerts[0].severity, RiskLevel::Amber);

        let alerts = run(&day_metrics(3.0, 3.0, Direction::Stable), &measured(26.0, 1.0));
        assert_eq!(alerts[0].severity, RiskLevel::Red);
    }

    #[test]
    fn test_exudate_always_red() {
        let alerts = run(&day_metrics(3.0, 3.0, Direction::Stable), &measured(5.0, 5.5));
        assert_eq!(alerts[0].id, AlertKind::Exudate);
        assert_eq!(alerts[0].severity, RiskLevel::Red);

        let alerts = run(&day_metrics(3.0, 3.0, Direction::Stable), &measured(5.0, 5.0));
        assert_eq!(alerts[0].id, AlertKind::OnTrack);
    }

    #[test]
    fn test_all_rules_fire_and_sort_by_severity() {
        // AMBER deviation, AMBER redness, RED exudate
        let alerts = run(&day_metrics(4.0, 3.0, Direction::Up), &measured(20.0, 6.0));
        let ids: Vec<AlertKind> = alerts.iter().map(|a| a.id).collect();
        assert_eq!(
            ids,
            vec![
                AlertKind::Exudate,
                AlertKind::AreaAboveExpected,
                AlertKind::Redness
            ]
        );
    }

    #[test]
    fn test_description_carries_metric_value() {
        let alerts = run(
            &day_metrics(4.0, 3.0, Direction::Up),
            &measured(21.337, 6.004),
        );
        for alert in &alerts {
            let metric = alert.metric.as_ref().unwrap();
            let literal = if metric.value < 0.0 {
                metric.value.abs().to_string()
            } else {
                metric.value.to_string()
            };
            assert!(
                alert.description.contains(&literal),
                "description {:?} should contain {}",
                alert.description,
                literal
            );
        }
    }

    fn run_with_trend(trend: Option<f64>, insufficient_history: bool) -> Vec<Alert> {
        let day = day_metrics(3.0, 3.0, Direction::Stable);
        let m = measured(5.0, 1.0);
        let classification = crate::risk::classify(
            &RiskSignals {
                area_deviation_cm2: Some(day.deviation),
                area_trend_pct: trend,
                redness_pct: m.redness_pct,
                exudate_pct: m.pus_pct,
            },
            &ThresholdTable::default(),
            insufficient_history,
        );
        let inputs = AlertInputs {
            day: &day,
            measured: &m,
            classification: &classification,
        };
        generate_alerts(&inputs, &ThresholdTable::default())
    }

    #[test]
    fn test_stalled_trend_raises_amber() {
        let alerts = run_with_trend(Some(-2.5), false);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, AlertKind::HealingStalled);
        assert_eq!(alerts[0].severity, RiskLevel::Amber);
        assert!(alerts[0].description.contains("-2.5%/day"));
    }

    #[test]
    fn test_growing_area_raises_red() {
        let alerts = run_with_trend(Some(20.0), false);
        assert_eq!(alerts[0].id, AlertKind::AreaIncreasing);
        assert_eq!(alerts[0].severity, RiskLevel::Red);
    }

    #[test]
    fn test_history_gap_raises_incomplete_data() {
        let alerts = run_with_trend(None, true);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, AlertKind::IncompleteData);
        assert_eq!(alerts[0].severity, RiskLevel::Amber);
        assert!(alerts[0].description.contains("not enough history"));
    }

    #[test]
    fn test_missing_secondary_metrics_raise_incomplete_data() {
        let m = MeasuredMetrics {
            area_cm2: 3.0,
            redness_pct: None,
            pus_pct: Some(f64::NAN),
        };
        let alerts = run(&day_metrics(3.0, 3.0, Direction::Stable), &m);
        // Neither the redness nor the exudate rule fires on a missing value
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, AlertKind::IncompleteData);
        assert_eq!(alerts[0].severity, RiskLevel::Amber);
        assert_eq!(alerts[0].rule, "2 signal(s) unavailable => AMBER");
        assert!(alerts[0].description.contains("Redness unavailable (not measured)"));
        assert!(alerts[0].description.contains("Exudate unavailable (not a number)"));
    }

    #[test]
    fn test_level_never_below_area_above_expected_alert() {
        // Shrinking 6%/day but far above the expected curve
        let t = Trajectory::new(vec![10.0, 5.0], vec![10.0, 9.4]).unwrap();
        let day = compute_day_metrics(2, &t, None).unwrap();
        let m = measured(10.0, 1.0);
        let classification = classify_default(&RiskSignals {
            area_deviation_cm2: Some(day.deviation),
            area_trend_pct: Some(-6.0),
            redness_pct: m.redness_pct,
            exudate_pct: m.pus_pct,
        });
        let alerts = generate_alerts(
            &AlertInputs {
                day: &day,
                measured: &m,
                classification: &classification,
            },
            &ThresholdTable::default(),
        );

        assert_eq!(alerts[0].id, AlertKind::AreaAboveExpected);
        assert_eq!(alerts[0].severity, RiskLevel::Red);
        assert!(classification.level >= alerts[0].severity);
    }

    #[test]
    fn test_rule_quotes_cut_point() {
        let alerts = run(&day_metrics(4.2, 2.0, Direction::Up), &measured(20.0, 6.0));
        let rules: Vec<&str> = alerts.iter().map(|a| a.rule.as_str()).collect();
        assert!(rules.contains(&"|Area deviation| 2.2 cm² > 1.5 cm² => RED"));
        assert!(rules.contains(&"Redness 20% > 15% => AMBER"));
        assert!(rules.contains(&"Exudate 6% > 5% => RED"));
    }
}
