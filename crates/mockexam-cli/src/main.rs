//! mockexam CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mockexam", version, about = "Timed practice exams graded by an LLM")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full exam session headlessly
    Run {
        /// Content areas, comma-separated (e.g. "mathematics,languages")
        #[arg(long)]
        areas: String,

        /// TOML answer sheet with an [answers] table
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Essay text file; enables the essay phase
        #[arg(long)]
        essay: Option<PathBuf>,

        /// Model to use (e.g. "anthropic/claude-sonnet-4-20250514" or "ollama/llama3.1:70b")
        #[arg(long)]
        model: Option<String>,

        /// Output directory (defaults to output_dir from the config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, md, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Estimate the objective score for a set of counts
    Score {
        #[arg(long)]
        total: usize,

        #[arg(long)]
        correct: usize,

        #[arg(long, default_value = "0")]
        unanswered: usize,
    },

    /// Render a saved report
    Show {
        /// Report JSON written by `mockexam run`
        #[arg(long)]
        report: PathBuf,

        /// Output format: text, markdown, html
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List the content areas
    ListAreas,

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and an example answer sheet
    Init,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mockexam=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            areas,
            answers,
            essay,
            model,
            output,
            format,
            config,
        } => commands::run::execute(areas, answers, essay, model, output, format, config).await,
        Commands::Score {
            total,
            correct,
            unanswered,
        } => commands::score::execute(total, correct, unanswered),
        Commands::Show { report, format } => commands::show::execute(report, format),
        Commands::ListAreas => commands::list_areas::execute(),
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config).await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
