//! The `mockexam show` command.

use std::path::PathBuf;

use anyhow::Result;

use mockexam_core::report::GradingResult;
use mockexam_report::{generate_html, generate_markdown};

use super::summary::print_summary;

pub fn execute(report_path: PathBuf, format: String) -> Result<()> {
    let result = GradingResult::load_json(&report_path)?;

    match format.as_str() {
        "text" => print_summary(&result),
        "markdown" | "md" => print!("{}", generate_markdown(&result)),
        "html" => println!("{}", generate_html(&result)),
        other => anyhow::bail!("unknown format: '{other}'. Use text, markdown or html"),
    }
    Ok(())
}
