use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tcm::batch::{self, Jobs, Responses};
use tcm::config::{Config, Secrets};
use tcm::models::Job;
use tcm::state::AppState;

const DEFAULT_QUESTION: &str = "Tell me what tech credits does the repo possibly use?";

#[derive(Parser)]
#[command(name = "tcm", about = "Find technical credits in a GitHub repository")]
struct Args {
    /// GitHub repository URL to analyze
    #[arg(long, required_unless_present = "json", conflicts_with = "json")]
    repository: Option<String>,

    /// Branch to analyze
    #[arg(long, default_value = "main")]
    branch: String,

    /// Folder inside the repository (empty = whole repository)
    #[arg(long, default_value = "")]
    folder: String,

    /// Batch file mapping job names to {url, branch, folder}
    #[arg(long)]
    json: Option<PathBuf>,

    /// Dotenv file holding the API keys
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Re-ingest the training data even if the collections are populated
    #[arg(long, default_value_t = false)]
    train: bool,

    /// Question asked to the model
    #[arg(long, default_value = DEFAULT_QUESTION)]
    question: String,
}

impl Args {
    fn jobs(&self) -> anyhow::Result<Jobs> {
        if let Some(path) = &self.json {
            return batch::load_jobs(path);
        }
        let url = self
            .repository
            .clone()
            .context("either --repository or --json is required")?;
        Ok(Jobs::from([(
            url.clone(),
            Job {
                url,
                branch: self.branch.clone(),
                folder: self.folder.clone(),
            },
        )]))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let jobs = args.jobs()?;

    let secrets = Secrets::load(&args.env_file)?;
    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.chat_model);
    tracing::info!(
        "Embedding provider: {} ({})",
        config.embedding.provider,
        config.embedding.model
    );

    let state = AppState::new(config, &secrets)?;

    if args.train || state.needs_training() {
        state.train().await?;
    }

    let pipeline = state.pipeline();
    let mut responses = Responses::new();
    for (name, job) in &jobs {
        tracing::info!("Job {name}: {}@{}", job.url, job.branch);
        let result = pipeline.run(&args.question, job).await?;
        let answer = result.answer.unwrap_or_default();
        println!("{answer}");
        responses.insert(name.clone(), answer);
    }

    batch::write_responses(&state.config.responses_path, &responses)?;
    Ok(())
}
