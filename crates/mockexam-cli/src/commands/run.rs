//! The `mockexam run` command.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use mockexam_core::engine::{ExamEngine, SessionObserver};
use mockexam_core::model::{ContentArea, ExamConfiguration, OptionKey};
use mockexam_core::orchestrator::Phase;
use mockexam_core::report::GradingResult;
use mockexam_providers::config::load_config_from;
use mockexam_providers::{LlmExamServices, MockexamConfig};
use mockexam_report::{write_html_report, write_markdown_report};

use super::summary::print_summary;

/// Console observer for phase changes.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_phase_change(&self, phase: Phase) {
        eprintln!("  phase: {phase}");
    }

    fn on_result(&self, result: &GradingResult) {
        eprintln!(
            "  graded: {} / {}",
            result.total_score, result.max_score
        );
    }
}

/// An answer sheet: `[answers]` maps item numbers to option letters.
#[derive(Debug, Deserialize)]
pub struct AnswerSheet {
    #[serde(default)]
    answers: BTreeMap<String, String>,
}

impl AnswerSheet {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read answer sheet: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse answer sheet: {}", path.display()))
    }

    pub fn parse(&self) -> Result<Vec<(u32, OptionKey)>> {
        self.answers
            .iter()
            .map(|(number, option)| {
                let n = number
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| anyhow::anyhow!("invalid item number: '{number}'"))?;
                let key = option.parse::<OptionKey>().map_err(anyhow::Error::msg)?;
                Ok((n, key))
            })
            .collect()
    }
}

pub fn parse_areas(s: &str) -> Result<Vec<ContentArea>> {
    let areas = s
        .split(',')
        .filter(|a| !a.trim().is_empty())
        .map(|a| a.parse::<ContentArea>().map_err(anyhow::Error::msg))
        .collect::<Result<Vec<_>>>()?;
    anyhow::ensure!(!areas.is_empty(), "at least one content area is required");
    Ok(areas)
}

/// Split `provider/model`; a bare model name uses the default provider.
fn parse_model(model: Option<&str>, config: &MockexamConfig) -> (String, String) {
    match model {
        Some(s) => match s.trim().split_once('/') {
            Some((provider, model)) => (provider.to_string(), model.to_string()),
            None => (config.default_provider.clone(), s.trim().to_string()),
        },
        None => (config.default_provider.clone(), config.default_model.clone()),
    }
}

pub async fn execute(
    areas_str: String,
    answers_path: Option<PathBuf>,
    essay_path: Option<PathBuf>,
    model_str: Option<String>,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let areas = parse_areas(&areas_str)?;
    let config = load_config_from(config_path.as_deref())?;

    let answers = match &answers_path {
        Some(path) => AnswerSheet::load(path)?.parse()?,
        None => Vec::new(),
    };
    let essay = match &essay_path {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read essay: {}", path.display()))?,
        ),
        None => None,
    };

    let (provider_name, model) = parse_model(model_str.as_deref(), &config);
    let provider = config.provider(&provider_name)?;
    let services = LlmExamServices::new(provider, &model)
        .with_temperature(config.default_temperature)
        .into_services();

    let engine = ExamEngine::new(services, config.exam.clone(), config.retry_policy())
        .with_observer(Arc::new(ConsoleObserver));

    let mut configuration = ExamConfiguration::new(areas);
    if essay.is_some() {
        configuration = configuration.with_essay();
    }

    let labels: Vec<&str> = configuration.areas.iter().map(|a| a.label()).collect();
    eprintln!(
        "mockexam v{}: {} with {provider_name}/{model}",
        env!("CARGO_PKG_VERSION"),
        labels.join(", ")
    );

    engine.start(configuration).await?;
    let clock = engine.spawn_clock();

    for (number, option) in answers {
        engine
            .answer(number, option)
            .await
            .with_context(|| format!("could not record answer for item {number}"))?;
    }

    if let Some(text) = essay {
        engine.proceed_to_essay().await?;
        engine.write_essay(text).await?;
    }

    let result = match engine.finalize().await? {
        Some(result) => result,
        // The clock ran out and grading was already under way.
        None => loop {
            if let Some(result) = engine.result().await {
                break result;
            }
            if engine.phase().await != Phase::Grading {
                anyhow::bail!(
                    "grading failed: {}",
                    engine.last_error().await.unwrap_or_default()
                );
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        },
    };
    clock.stop();

    print_summary(&result);
    write_outputs(&result, &output.unwrap_or_else(|| config.output_dir.clone()), &format)
}

fn write_outputs(result: &GradingResult, output: &Path, format: &str) -> Result<()> {
    std::fs::create_dir_all(output)?;
    let timestamp = result.completed_at.format("%Y-%m-%dT%H%M%S");

    let formats: Vec<&str> = if format == "all" {
        vec!["json", "html", "md"]
    } else {
        format.split(',').map(str::trim).collect()
    };

    for fmt in &formats {
        match *fmt {
            "json" => {
                let path = output.join(format!("report-{timestamp}.json"));
                result.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "html" => {
                let path = output.join(format!("report-{timestamp}.html"));
                write_html_report(result, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            "md" | "markdown" => {
                let path = output.join(format!("report-{timestamp}.md"));
                write_markdown_report(result, &path)?;
                eprintln!("Markdown report: {}", path.display());
            }
            _ => {
                eprintln!("Unknown format: {fmt}");
            }
        }
    }

    Ok(())
}
