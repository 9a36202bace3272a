//! Console summary table shared by `run` and `show`.

use comfy_table::{Cell, Table};

use mockexam_core::clock::format_hms;
use mockexam_core::report::GradingResult;

pub fn summary_table(result: &GradingResult) -> Table {
    let objective = &result.objective;

    let mut table = Table::new();
    table.set_header(vec!["Area", "Items", "Correct", "Accuracy"]);
    for area in &objective.area_breakdown {
        table.add_row(vec![
            Cell::new(area.area.label()),
            Cell::new(format!("{}-{}", area.first_item, area.last_item)),
            Cell::new(format!("{}/{}", area.correct, area.total)),
            Cell::new(format!("{:.1}%", area.accuracy() * 100.0)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Objective score"),
        Cell::new(objective.total_items),
        Cell::new(format!(
            "{} ({} unanswered)",
            objective.correct_count, objective.unanswered_count
        )),
        Cell::new(objective.estimated_score),
    ]);
    if result.include_essay {
        let essay = result
            .essay
            .as_ref()
            .map(|e| e.total.to_string())
            .unwrap_or_else(|| "not graded".into());
        table.add_row(vec![
            Cell::new("Essay score"),
            Cell::new(""),
            Cell::new(""),
            Cell::new(essay),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total"),
        Cell::new(format_hms(result.time_spent_secs)),
        Cell::new(""),
        Cell::new(format!("{} / {}", result.total_score, result.max_score)),
    ]);
    table
}

pub fn print_summary(result: &GradingResult) {
    println!("{}", summary_table(result));

    let missed = &result.objective.missed_competencies;
    if !missed.is_empty() {
        println!("Competencies to review: {}", missed.join(", "));
    }
    if let Some(feedback) = &result.feedback {
        println!("\n{}", feedback.narrative);
        if !feedback.next_goal.is_empty() {
            println!("Next goal: {}", feedback.next_goal);
        }
    }
}
