use serde_json::json;

use crate::plot::*;

fn choice_json(code: &str, label: &str) -> JSValue {
    json!({"code": code, "label": label})
}

fn panel_json(panel: &SeedPanel) -> JSValue {
    match &panel.convergence {
        Convergence::Trajectories(series) => {
            let series_js: Vec<JSValue> = series
                .iter()
                .map(|s| json!({"code": s.code, "label": s.label, "values": s.values}))
                .collect();
            json!({
                "seed": panel.seed,
                "respondents": panel.respondents,
                "series": series_js
            })
        }
        Convergence::Breakdown { answers, rows } => {
            let answers_js: Vec<JSValue> = answers
                .iter()
                .map(|a| choice_json(&a.code, &a.label))
                .collect();
            let rows_js: Vec<JSValue> = rows
                .iter()
                .map(|r| json!({"code": r.code, "label": r.label, "percentages": r.percentages}))
                .collect();
            json!({
                "seed": panel.seed,
                "respondents": panel.respondents,
                "answers": answers_js,
                "rows": rows_js
            })
        }
    }
}

/// The JSON summary of a report, as written to the output and compared to
/// the reference.
pub fn summary_json(summary: &Summary, survey_name: &str) -> JSValue {
    match summary {
        Summary::Convergence(report) => {
            let results: Vec<JSValue> = report.panels.iter().map(panel_json).collect();
            json!({
                "config": {
                    "survey": survey_name,
                    "report": ReportKind::Convergence.name(),
                    "question": report.qname,
                    "text": report.text,
                    "kind": report.kind.name()
                },
                "results": results
            })
        }
        Summary::Arrival(report) => {
            let results: Vec<JSValue> = report
                .series
                .iter()
                .map(|s| json!({"seed": s.seed, "counts": s.counts}))
                .collect();
            json!({
                "config": {
                    "survey": survey_name,
                    "report": ReportKind::Arrival.name(),
                    "binSeconds": report.bin_seconds
                },
                "results": results
            })
        }
        Summary::InterviewLength(h) => {
            json!({
                "config": {
                    "survey": survey_name,
                    "report": ReportKind::InterviewLength.name()
                },
                "results": {
                    "edges": h.edges(),
                    "counts": h.counts
                }
            })
        }
    }
}

fn last_value(values: &[f64]) -> String {
    match values.last() {
        Some(x) => format!("{:.1}%", x),
        None => "-".to_string(),
    }
}

fn panel_text(lines: &mut Vec<String>, panel: &SeedPanel) {
    lines.push(format!("seed {} ({} respondents)", panel.seed, panel.respondents));
    match &panel.convergence {
        Convergence::Trajectories(series) => {
            for s in series.iter() {
                lines.push(format!("  {:>8}  {}", last_value(&s.values), s.label));
            }
        }
        Convergence::Breakdown { answers, rows } => {
            let header: String = answers.iter().map(|a| format!(" {:>10}", a.label)).collect();
            lines.push(format!("  {:<24}{}", "", header));
            for r in rows.iter() {
                let cells: String = r.percentages.iter().map(|p| format!(" {:>9.1}%", p)).collect();
                lines.push(format!("  {:<24}{}", r.label, cells));
            }
        }
    }
}

/// A plain-text rendering: the final shares for trajectories, the table of
/// percentages for breakdowns.
pub fn summary_text(summary: &Summary, survey_name: &str) -> String {
    let mut lines: Vec<String> = vec![survey_name.to_string()];
    match summary {
        Summary::Convergence(report) => {
            lines.push(format!("{} ({}): {}", report.qname, report.kind.name(), report.text));
            for panel in report.panels.iter() {
                panel_text(&mut lines, panel);
            }
        }
        Summary::Arrival(report) => {
            lines.push(format!("responses per {}s", report.bin_seconds));
            for s in report.series.iter() {
                let counts: Vec<String> = s.counts.iter().map(|c| c.to_string()).collect();
                lines.push(format!("seed {}: {}", s.seed, counts.join(" ")));
            }
        }
        Summary::InterviewLength(h) => {
            lines.push("interview length".to_string());
            for (idx, count) in h.counts.iter().enumerate().filter(|(_, c)| **c > 0) {
                let low = h.lower + (idx as f64) * h.width;
                lines.push(format!("  {:>10.1} {:>10.1}  {}", low, low + h.width, count));
            }
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
