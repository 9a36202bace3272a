//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use mockexam_core::clock::format_hms;
use mockexam_core::grading::{EssayAssessment, COMPETENCY_STEP, MAX_COMPETENCY_SCORE};
use mockexam_core::report::GradingResult;
use mockexam_core::scoring::AreaBreakdown;
use mockexam_core::traits::Feedback;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn push_list(html: &mut String, title: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    html.push_str(&format!("<h3>{}</h3>\n<ul>\n", html_escape(title)));
    for entry in entries {
        html.push_str(&format!("<li>{}</li>\n", html_escape(entry)));
    }
    html.push_str("</ul>\n");
}

/// Generate an HTML report from a grading result.
pub fn generate_html(result: &GradingResult) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>mockexam report {}</title>\n",
        result.completed_at.format("%Y-%m-%d")
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    let areas: Vec<&str> = result.areas.iter().map(|a| a.label()).collect();
    html.push_str("<header>\n");
    html.push_str("<h1>mockexam report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">{} | {} items | time spent {} | {}</p>\n",
        html_escape(&areas.join(", ")),
        result.objective.total_items,
        format_hms(result.time_spent_secs),
        result.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Score dashboard
    let objective = &result.objective;
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Scores</h2>\n<div class=\"cards\">\n");
    html.push_str(&format!(
        "<div class=\"card\"><span class=\"label\">Objective</span><span class=\"value\">{}</span><span class=\"detail\">{} of {} correct ({:.1}%)</span></div>\n",
        objective.estimated_score,
        objective.correct_count,
        objective.total_items,
        objective.accuracy * 100.0,
    ));
    if result.include_essay {
        let essay = match &result.essay {
            Some(essay) => essay.total.to_string(),
            None => "not graded".to_string(),
        };
        html.push_str(&format!(
            "<div class=\"card\"><span class=\"label\">Essay</span><span class=\"value\">{}</span><span class=\"detail\">out of 1000</span></div>\n",
            essay
        ));
    }
    html.push_str(&format!(
        "<div class=\"card total\"><span class=\"label\">Total</span><span class=\"value\">{}</span><span class=\"detail\">out of {}</span></div>\n",
        result.total_score, result.max_score
    ));
    html.push_str("</div>\n");

    if !objective.area_breakdown.is_empty() {
        html.push_str("<h3>By area</h3>\n");
        html.push_str(&generate_bar_chart(&objective.area_breakdown));
    }
    html.push_str("</section>\n");

    // Corrections
    html.push_str("<section class=\"corrections\">\n");
    html.push_str("<h2>Corrections</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"corrections\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">#</th><th onclick=\"sortTable(1)\">Area</th><th onclick=\"sortTable(2)\">Competency</th><th onclick=\"sortTable(3)\">Your answer</th><th onclick=\"sortTable(4)\">Key</th><th>Explanation</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for c in &objective.corrections {
        let class = match (c.chosen, c.is_correct) {
            (None, _) => "skip",
            (Some(_), true) => "pass",
            (Some(_), false) => "fail",
        };
        let chosen = c
            .chosen
            .map(|k| k.to_string())
            .unwrap_or_else(|| "unanswered".to_string());
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            class,
            c.number,
            html_escape(c.area.label()),
            html_escape(&c.competency_tag),
            chosen,
            c.correct_option,
            html_escape(&c.explanation),
        ));
    }
    html.push_str("</tbody></table>\n");

    if !objective.missed_competencies.is_empty() {
        html.push_str(&format!(
            "<p>Competencies to review: {}</p>\n",
            html_escape(&objective.missed_competencies.join(", "))
        ));
    }
    html.push_str("</section>\n");

    if let Some(essay) = &result.essay {
        push_essay(&mut html, result.essay_theme.as_deref(), essay);
    }
    if let Some(feedback) = &result.feedback {
        push_feedback(&mut html, feedback);
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(result).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

fn push_essay(html: &mut String, theme: Option<&str>, essay: &EssayAssessment) {
    html.push_str("<section class=\"essay\">\n<h2>Essay</h2>\n");
    if let Some(theme) = theme {
        html.push_str(&format!(
            "<p class=\"meta\">Theme: {}</p>\n",
            html_escape(theme)
        ));
    }
    html.push_str("<table>\n<thead><tr><th>Competency</th><th>Score</th><th>Level</th></tr></thead>\n<tbody>\n");
    for (i, score) in essay.competencies.iter().enumerate() {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{} / {}</td></tr>\n",
            i + 1,
            score,
            score / COMPETENCY_STEP,
            MAX_COMPETENCY_SCORE / COMPETENCY_STEP,
        ));
    }
    html.push_str(&format!(
        "<tr class=\"total\"><td>Total</td><td>{}</td><td></td></tr>\n",
        essay.total
    ));
    html.push_str("</tbody></table>\n");
    html.push_str(&format!("<p>{}</p>\n", html_escape(&essay.narrative)));
    push_list(html, "Strengths", &essay.strengths);
    push_list(html, "To improve", &essay.improvements);
    html.push_str("</section>\n");
}

fn push_feedback(html: &mut String, feedback: &Feedback) {
    html.push_str("<section class=\"feedback\">\n<h2>Feedback</h2>\n");
    html.push_str(&format!("<p>{}</p>\n", html_escape(&feedback.narrative)));
    push_list(html, "Weak areas", &feedback.weak_areas);
    push_list(html, "Study tips", &feedback.study_tips);
    if !feedback.next_goal.is_empty() {
        html.push_str(&format!(
            "<p><strong>Next goal:</strong> {}</p>\n",
            html_escape(&feedback.next_goal)
        ));
    }
    html.push_str("</section>\n");
}

/// Write an HTML report to a file.
pub fn write_html_report(result: &GradingResult, path: &Path) -> Result<()> {
    let html = generate_html(result);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn generate_bar_chart(breakdown: &[AreaBreakdown]) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 320;

    let total_height = breakdown.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 80,
        total_height
    );

    for (i, area) in breakdown.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let accuracy = area.accuracy();
        let width = (accuracy * max_width as f64) as usize;

        let color = if accuracy >= 0.7 {
            "#22c55e"
        } else if accuracy >= 0.4 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{} ({}-{})</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(area.area.label()),
            area.first_item,
            area.last_item,
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}/{}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            area.correct,
            area.total,
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --skip: #fef9c3; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --skip: #713f12; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.cards { display: flex; gap: 1rem; flex-wrap: wrap; }
.card { border: 1px solid var(--border); border-radius: 8px; padding: 1rem 1.5rem; display: flex; flex-direction: column; min-width: 10rem; }
.card .label { color: #6b7280; font-size: 0.85rem; }
.card .value { font-size: 2rem; font-weight: bold; }
.card.total { border-width: 2px; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.skip { background: var(--skip); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('corrections');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = Number(va), nb = Number(vb);
    const cmp = !isNaN(na) && !isNaN(nb) ? na - nb : va.localeCompare(vb);
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_result, with_essay_and_feedback};

    #[test]
    fn html_report_contains_required_elements() {
        let html = generate_html(&sample_result());

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("Mathematics and its Technologies"));
        assert!(html.contains("<svg"));
        assert!(html.contains("unanswered"));
        assert!(html.contains("out of 900"));
        assert!(!html.contains("<h2>Essay</h2>"));
        assert!(!html.contains("<h2>Feedback</h2>"));
    }

    #[test]
    fn essay_and_feedback_sections() {
        let html = generate_html(&with_essay_and_feedback());

        assert!(html.contains("<h2>Essay</h2>"));
        assert!(html.contains("4 / 5"));
        assert!(html.contains("<h2>Feedback</h2>"));
        assert!(html.contains("Next goal:"));
        assert!(html.contains("out of 1900"));
    }

    #[test]
    fn text_is_escaped() {
        let mut result = with_essay_and_feedback();
        if let Some(feedback) = result.feedback.as_mut() {
            feedback.narrative = "<script>alert(1)</script>".into();
        }
        let html = generate_html(&result);
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn html_report_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("report.html");

        write_html_report(&sample_result(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
