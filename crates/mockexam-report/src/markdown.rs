//! Markdown report generator, suited for pasting into notes or issues.

use std::path::Path;

use anyhow::{Context, Result};

use mockexam_core::clock::format_hms;
use mockexam_core::report::GradingResult;

/// Escape characters that would break a table cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

/// Generate a Markdown report from a grading result.
pub fn generate_markdown(result: &GradingResult) -> String {
    let mut md = String::new();
    let objective = &result.objective;

    md.push_str("# mockexam report\n\n");
    let areas: Vec<&str> = result.areas.iter().map(|a| a.label()).collect();
    md.push_str(&format!("- **Areas:** {}\n", areas.join(", ")));
    md.push_str(&format!(
        "- **Completed:** {}\n",
        result.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!(
        "- **Time spent:** {}\n\n",
        format_hms(result.time_spent_secs)
    ));

    md.push_str("## Scores\n\n");
    md.push_str("| Part | Score | Detail |\n|---|---|---|\n");
    md.push_str(&format!(
        "| Objective | {} | {}/{} correct, {} unanswered |\n",
        objective.estimated_score,
        objective.correct_count,
        objective.total_items,
        objective.unanswered_count,
    ));
    if result.include_essay {
        match &result.essay {
            Some(essay) => md.push_str(&format!("| Essay | {} | out of 1000 |\n", essay.total)),
            None => md.push_str("| Essay | - | not graded |\n"),
        }
    }
    md.push_str(&format!(
        "| **Total** | **{}** | out of {} |\n\n",
        result.total_score, result.max_score
    ));

    if !objective.area_breakdown.is_empty() {
        md.push_str("## By area\n\n| Area | Items | Correct | Accuracy |\n|---|---|---|---|\n");
        for area in &objective.area_breakdown {
            md.push_str(&format!(
                "| {} | {}-{} | {}/{} | {:.0}% |\n",
                area.area.label(),
                area.first_item,
                area.last_item,
                area.correct,
                area.total,
                area.accuracy() * 100.0
            ));
        }
        md.push('\n');
    }

    let missed: Vec<_> = objective
        .corrections
        .iter()
        .filter(|c| !c.is_correct)
        .collect();
    if !missed.is_empty() {
        md.push_str("## Corrections\n\n| # | Competency | Yours | Key | Explanation |\n|---|---|---|---|---|\n");
        for c in missed {
            let chosen = c.chosen.map(|k| k.to_string()).unwrap_or_else(|| "-".into());
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                c.number,
                cell(&c.competency_tag),
                chosen,
                c.correct_option,
                cell(&c.explanation)
            ));
        }
        md.push('\n');
    }

    if let Some(essay) = &result.essay {
        md.push_str("## Essay\n\n");
        if let Some(theme) = &result.essay_theme {
            md.push_str(&format!("_Theme: {theme}_\n\n"));
        }
        let scores: Vec<String> = essay
            .competencies
            .iter()
            .enumerate()
            .map(|(i, s)| format!("C{}: {s}", i + 1))
            .collect();
        md.push_str(&format!("{} (total {})\n\n", scores.join(", "), essay.total));
        md.push_str(&essay.narrative);
        md.push_str("\n\n");
        for s in &essay.strengths {
            md.push_str(&format!("- + {s}\n"));
        }
        for s in &essay.improvements {
            md.push_str(&format!("- - {s}\n"));
        }
        md.push('\n');
    }

    if let Some(feedback) = &result.feedback {
        md.push_str("## Feedback\n\n");
        md.push_str(&feedback.narrative);
        md.push_str("\n\n");
        for tip in &feedback.study_tips {
            md.push_str(&format!("- {tip}\n"));
        }
        if !feedback.next_goal.is_empty() {
            md.push_str(&format!("\n**Next goal:** {}\n", feedback.next_goal));
        }
    }

    md
}

/// Write a Markdown report to a file.
pub fn write_markdown_report(result: &GradingResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, generate_markdown(result))
        .with_context(|| format!("failed to write Markdown report to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_result, with_essay_and_feedback};

    #[test]
    fn objective_only_report() {
        let md = generate_markdown(&sample_result());

        assert!(md.starts_with("# mockexam report"));
        assert!(md.contains("| Objective | 599 | 6/10 correct, 4 unanswered |"));
        assert!(md.contains("| **Total** | **599** | out of 900 |"));
        assert!(md.contains("| Mathematics and its Technologies | 1-10 | 6/10 | 60% |"));
        assert!(md.contains("| 7 | H7 | - | A |"));
        assert!(!md.contains("## Essay"));
    }

    #[test]
    fn essay_and_feedback_sections() {
        let md = generate_markdown(&with_essay_and_feedback());

        assert!(md.contains("| Essay | 680 | out of 1000 |"));
        assert!(md.contains("C1: 160"));
        assert!(md.contains("**Next goal:** Reach 700 in mathematics"));
        assert!(md.contains("out of 1900"));
    }

    #[test]
    fn pipes_in_cells_are_escaped() {
        assert_eq!(cell("a|b\nc"), "a\\|b c");
    }

    #[test]
    fn write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_markdown_report(&sample_result(), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("## Scores"));
    }
}
