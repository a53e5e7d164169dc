//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Measured and simulated sections are rendered separately and labelled
//! - Numbers are printed from the analysis, never recomputed

use crate::risk::render_threshold_table;
use crate::simulation::SimulationResult;
use crate::{DayAnalysis, HistoryRow};

/// Render one day's analysis as text output
pub fn render_text(analysis: &DayAnalysis) -> String {
    let assessment = analysis.measured.get();
    let day = &assessment.day;
    let explanation = &assessment.explanation;
    let mut output = String::new();

    if analysis.flags.demo_mode {
        output.push_str("DEMO DATA - not from real observations\n\n");
    }

    output.push_str(&format!(
        "Day {}  {}  {}\n",
        day.day,
        assessment.classification.level,
        explanation.status
    ));
    output.push_str(&format!("{}\n\n", explanation.reason));

    output.push_str("Measured\n");
    for line in &explanation.logic {
        output.push_str(&format!("  {}\n", line));
    }
    output.push_str(&format!(
        "  Latest vs expected: {:+}% ({:+} cm²)\n",
        analysis.summary.deviation_pct, analysis.summary.current_diff_cm2
    ));

    output.push_str("\nAlerts\n");
    output.push_str(&format!("  {:<8} {:<28} {}\n", "SEVERITY", "ALERT", "DETAIL"));
    for alert in &assessment.alerts {
        output.push_str(&format!(
            "  {:<8} {:<28} {}\n",
            alert.severity.as_str(),
            truncate_or_pad(&alert.title, 28),
            alert.description
        ));
    }

    output.push('\n');
    output.push_str(&render_threshold_table(&analysis.thresholds));

    if let Some(ref simulation) = analysis.simulation {
        output.push('\n');
        output.push_str(&render_simulation(simulation.get()));
    }

    output.push_str("\nLimitations\n");
    for limitation in &analysis.limitations {
        output.push_str(&format!("  - {}\n", limitation));
    }

    output
}

fn render_simulation(result: &SimulationResult) -> String {
    let window = &result.completion_window;
    let mut output = String::from("Simulated (hypothetical, not measured)\n");
    output.push_str(&format!(
        "  Completion window: day {} to day {}\n",
        window.start_day, window.end_day
    ));
    output.push_str(&format!(
        "  Confidence: {}  Velocity multiplier: {}  Table: {}\n",
        result.confidence.as_str(),
        result.velocity_multiplier,
        result.table_version
    ));
    for assumption in &result.assumptions {
        output.push_str(&format!("  Assumption: {}\n", assumption));
    }
    output
}

/// Render one day's analysis as JSON output
pub fn render_json(analysis: &DayAnalysis) -> String {
    serde_json::to_string_pretty(analysis).unwrap_or_else(|_| "{}".to_string())
}

/// Render the timeline view as text output
pub fn render_history_text(rows: &[HistoryRow]) -> String {
    let mut output = format!(
        "{:<5} {:<9} {:<9} {:<10} {:<11} {:<7} {}\n",
        "DAY", "ACTUAL", "EXPECTED", "DEVIATION", "TREND", "RISK", "HEADLINE"
    );

    for row in rows {
        let trend = row
            .trend_pct
            .map(|t| format!("{:+}%", t))
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "{:<5} {:<9.2} {:<9.2} {:<+10.2} {:<11} {:<7} {}\n",
            row.day.day,
            row.day.actual,
            row.day.expected,
            row.day.deviation,
            trend,
            row.level.as_str(),
            row.headline
        ));
    }

    output
}

/// Render the timeline view as JSON output
pub fn render_history_json(rows: &[HistoryRow]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::observation::{MeasuredMetrics, ObservationStore};
    use crate::{analyze_day, history, AnalysisRequest};

    fn store() -> ObservationStore {
        let store = ObservationStore::new();
        for area in [5.0, 4.7, 4.3, 4.0, 3.8, 3.5, 4.2] {
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

    const EXPECTED: [f64; 7] = [5.0, 4.5, 4.0, 3.5, 3.0, 2.5, 2.0];

    fn analysis() -> DayAnalysis {
        analyze_day(
            &store().snapshot(),
            &EXPECTED,
            &AnalysisRequest::for_day(7),
            &ResolvedConfig::defaults(),
        )
        .unwrap()
    }

    #[test]
    fn test_render_text_sections() {
        let text = render_text(&analysis());
        assert!(text.starts_with("Day 7  RED  Attention recommended\n"));
        assert!(text.contains("Measured\n"));
        assert!(text.contains("Alerts\n"));
        assert!(text.contains("Limitations\n"));
        assert!(text.contains("Risk classification (heuristic, not diagnostic)\n"));
        assert!(text.contains("When signals disagree the worst level wins."));
        assert!(!text.contains("Simulated"));
        assert!(!text.contains("DEMO DATA"));
    }

    #[test]
    fn test_render_json_tags_layers() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&analysis())).unwrap();
        assert_eq!(json["measured"]["kind"], "measured");
        assert_eq!(json["measured"]["value"]["classification"]["level"], "RED");
        assert!(json["simulation"].is_null());
        assert_eq!(json["flags"]["demo_mode"], false);
        assert_eq!(json["thresholds"]["redness"]["red_above"], 25.0);
        assert_eq!(json["chart"][0]["kind"], "measured");
    }

    #[test]
    fn test_render_json_is_deterministic() {
        assert_eq!(render_json(&analysis()), render_json(&analysis()));
    }

    #[test]
    fn test_render_history_text() {
        let rows = history(&store().snapshot(), &EXPECTED, &ResolvedConfig::defaults()).unwrap();
        let text = render_history_text(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("DAY"));
        assert!(lines[1].contains(" - "));
        assert!(lines[7].contains("+2.20"));
        assert!(lines[7].contains("RED"));
    }

    #[test]
    fn test_truncate_or_pad() {
        assert_eq!(truncate_or_pad("abc", 5), "abc  ");
        assert_eq!(truncate_or_pad("abcdefgh", 6), "abc...");
    }
}
