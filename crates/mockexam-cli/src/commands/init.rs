//! The `mockexam init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("mockexam.toml").exists() {
        println!("mockexam.toml already exists, skipping.");
    } else {
        std::fs::write("mockexam.toml", SAMPLE_CONFIG)?;
        println!("Created mockexam.toml");
    }

    let answers_path = std::path::Path::new("answers.toml");
    if answers_path.exists() {
        println!("answers.toml already exists, skipping.");
    } else {
        std::fs::write(answers_path, EXAMPLE_ANSWERS)?;
        println!("Created answers.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit mockexam.toml with your API keys");
    println!("  2. Run: mockexam list-areas");
    println!("  3. Run: mockexam run --areas mathematics --answers answers.toml --format all");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mockexam configuration

default_provider = "anthropic"
default_model = "claude-sonnet-4-20250514"
default_temperature = 0.7
max_retries = 2
retry_delay_ms = 1000
output_dir = "./mockexam-results"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"

[exam]
seconds_per_item = 180
essay_bonus_secs = 3600
min_essay_chars = 150
generation_parallelism = 1
"#;

const EXAMPLE_ANSWERS: &str = r#"# Answer sheet for `mockexam run --answers`.
# Keys are item numbers, values are options A-E. Missing items stay unanswered.

[answers]
"1" = "A"
"2" = "C"
"3" = "B"
"4" = "E"
"5" = "D"
"#;
