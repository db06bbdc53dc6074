use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use transcript_lens::config::Config;
use transcript_lens::output::report::{BranchError, JsonReport};
use transcript_lens::output::terminal;
use transcript_lens::pipeline::analyze::{AnalysisOptions, Analyzer, ModelLoader};
use transcript_lens::summarize::traits::SummaryModel;

/// transcript-lens: summarize a call transcript and chart its topics.
///
/// Paste text with --text, point at a UTF-8 file with --file, or pipe text
/// on stdin (for example, text copied from a web page).
#[derive(Parser)]
#[command(name = "transcript-lens", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the transcript and extract topics
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        topics: TopicArgs,

        #[command(flatten)]
        summary: SummaryArgs,

        /// Print a JSON report instead of terminal charts
        #[arg(long)]
        json: bool,
    },

    /// Extract topics only (no summarization model needed)
    Topics {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        topics: TopicArgs,

        /// Print JSON instead of the terminal chart
        #[arg(long)]
        json: bool,
    },

    /// Summarize only
    Summarize {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        summary: SummaryArgs,

        /// Print JSON instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Download the ONNX summarization model
    DownloadModel,
}

#[derive(Args)]
struct InputArgs {
    /// Transcript text, pasted directly
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,

    /// Path to a UTF-8 text file containing the transcript
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct TopicArgs {
    /// Number of topics to extract, 2-10 (default: 5)
    #[arg(long)]
    topics: Option<usize>,
}

#[derive(Args)]
struct SummaryArgs {
    /// Minimum summary length in model tokens (default: 30)
    #[arg(long)]
    min_length: Option<usize>,

    /// Maximum summary length in model tokens (default: 150)
    #[arg(long)]
    max_length: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("transcript_lens=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            topics,
            summary,
            json,
        } => {
            let config = Config::load()?;
            let text = read_transcript(&input)?;
            let options = build_options(&config, &topics, &summary);
            let analyzer = Analyzer::new(model_loader(&config));

            info!(
                chars = text.chars().count(),
                num_topics = options.num_topics,
                "Analyzing transcript"
            );
            let report = analyzer.analyze(&text, &options).await;

            if json {
                println!("{}", JsonReport::new(&report, options.num_topics).to_json()?);
            } else {
                terminal::display_report(&report);
            }
        }

        Commands::Topics {
            input,
            topics,
            json,
        } => {
            let config = Config::load()?;
            let text = read_transcript(&input)?;
            let options = build_options(&config, &topics, &SummaryArgs::unset());
            let analyzer = Analyzer::new(model_loader(&config));

            match analyzer.topics(Arc::from(text.as_str()), options).await {
                Ok(report) if json => println!("{}", serde_json::to_string_pretty(&report)?),
                Ok(report) => terminal::display_topics(&report),
                Err(e) if json => println!("{}", serde_json::to_string_pretty(&BranchError::from(&e))?),
                Err(e) => terminal::display_branch_warning("Topic extraction", &e),
            }
        }

        Commands::Summarize {
            input,
            summary,
            json,
        } => {
            let config = Config::load()?;
            config.require_model()?;
            let text = read_transcript(&input)?;
            let options = build_options(&config, &TopicArgs { topics: None }, &summary);
            let analyzer = Analyzer::new(model_loader(&config));

            println!("{}", "Generating summary...".dimmed());
            match analyzer.summarize(Arc::from(text.as_str()), options).await {
                Ok(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
                Ok(result) => terminal::display_summary(&result),
                Err(e) if json => println!("{}", serde_json::to_string_pretty(&BranchError::from(&e))?),
                Err(e) => terminal::display_branch_warning("Summarization", &e),
            }
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX summarization model...");
            println!("  Destination: {}", model_dir.display());

            transcript_lens::summarize::download::download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `transcript-lens analyze --file transcript.txt`.");
        }
    }

    Ok(())
}

impl SummaryArgs {
    fn unset() -> Self {
        Self {
            min_length: None,
            max_length: None,
        }
    }
}

/// Merge CLI overrides onto the configured defaults.
fn build_options(config: &Config, topics: &TopicArgs, summary: &SummaryArgs) -> AnalysisOptions {
    let mut options = AnalysisOptions::from(config);
    if let Some(n) = topics.topics {
        options.num_topics = n;
    }
    if let Some(min) = summary.min_length {
        options.min_length = min;
    }
    if let Some(max) = summary.max_length {
        options.max_length = max;
    }
    options
}

/// Lazily loads the ONNX model; the analyzer's cache calls this at most once.
fn model_loader(config: &Config) -> ModelLoader {
    let model_dir = config.model_dir.clone();
    Arc::new(move || -> Result<Arc<dyn SummaryModel>> {
        info!("Using local ONNX summarization model");
        let model = transcript_lens::summarize::onnx::OnnxBartModel::load(&model_dir)?;
        Ok(Arc::new(model) as Arc<dyn SummaryModel>)
    })
}

/// Read the transcript from --text, --file, or stdin, and reject blank input.
///
/// All three input modes end up as the same plain string.
fn read_transcript(input: &InputArgs) -> Result<String> {
    let text = if let Some(text) = &input.text {
        text.clone()
    } else if let Some(path) = &input.file {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read transcript file {}", path.display()))?;
        String::from_utf8(bytes)
            .with_context(|| format!("{} is not valid UTF-8 text", path.display()))?
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read transcript from stdin")?;
        buf
    };

    if text.trim().is_empty() {
        anyhow::bail!(
            "No transcript text provided. Use --text, --file, or pipe text on stdin."
        );
    }
    Ok(text)
}
