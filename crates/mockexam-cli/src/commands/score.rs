//! The `mockexam score` command.

use anyhow::Result;

use mockexam_core::scoring::{estimate_score, MAX_SCORE};

pub fn execute(total: usize, correct: usize, unanswered: usize) -> Result<()> {
    let score = estimate_score(total, correct, unanswered)?;
    let accuracy = correct as f64 / total as f64;

    println!("Accuracy: {:.1}% ({correct}/{total})", accuracy * 100.0);
    if unanswered > 0 {
        println!("Unanswered: {unanswered}");
    }
    println!("Estimated score: {score} / {MAX_SCORE}");
    Ok(())
}
