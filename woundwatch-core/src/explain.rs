//! Three-tier explanation composer
//!
//! Pure formatting. Every number printed here is copied from the inputs.

use crate::alerts::Alert;
use crate::deviation::DayMetrics;
use crate::risk::Classification;
use crate::trajectory::round_to;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Explanation {
    /// Short status label
    pub status: String,
    /// One sentence from the highest-severity alert
    pub reason: String,
    /// Literal recap of values and the rules that applied
    pub logic: Vec<String>,
}

pub fn compose_explanation(
    classification: &Classification,
    day: &DayMetrics,
    alerts: &[Alert],
) -> Explanation {
    let status = classification.level.label().to_string();

    let reason = match alerts.first() {
        Some(alert) => format!("{}: {}", alert.title, alert.description),
        None => format!("Overall risk {}.", classification.level),
    };

    let mut logic = vec![
        format!(
            "Day {}: measured {} cm², expected {} cm², deviation {:+} cm²",
            day.day,
            round_to(day.actual, 2),
            round_to(day.expected, 2),
            round_to(day.deviation, 2)
        ),
        format!(
            "Change from previous day: {:+}% ({})",
            round_to(day.change_from_prev_pct, 1),
            day.direction.as_str()
        ),
    ];
    logic.extend(classification.readings.iter().map(|r| r.rule_text()));
    logic.extend(
        classification
            .data_gaps
            .iter()
            .map(|gap| format!("Data gap: {}", gap.describe())),
    );
    logic.extend(alerts.iter().map(|a| format!("Alert rule: {}", a.rule)));
    logic.push(format!("Worst signal wins => {}", classification.level));

    Explanation {
        status,
        reason,
        logic,
    }
}
