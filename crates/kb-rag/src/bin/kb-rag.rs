//! kb-rag command line
//!
//! Run with: cargo run -p kb-rag -- ask "Quelle est la couleur du ciel ?"

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kb_rag::{
    config::RagConfig,
    learning::{FineTuneJob, LearningDataCollector},
    providers::{build_embedder, build_llm, LlmProvider},
    seed,
    server::HealthServer,
    shell::Shell,
    KnowledgeStore, RagPipeline,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kb-rag", version, about = "Question answering over a local knowledge base")]
struct Cli {
    /// Configuration file (defaults to ./kb-rag.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question
    Ask { question: String },
    /// Add a document to the knowledge base
    Add {
        text: String,
        /// Document id; a UUID is generated when omitted
        #[arg(long)]
        id: Option<String>,
    },
    /// Append a snippet to the learning data file
    Learn { text: String },
    /// Run the external fine-tuning job on the learning data
    FineTune,
    /// Insert the default documents that are missing
    Seed,
    /// Print the number of stored documents
    Count,
    /// Serve the health-check endpoint
    Serve,
    /// Interactive menu (default)
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kb_rag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref())?;
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Store: {}", config.store.path.display());
    tracing::info!("  - LLM model: {}", config.llm.generate_model);

    match cli.command.unwrap_or(Command::Shell) {
        Command::Learn { text } => {
            let collector = LearningDataCollector::new(&config.learning.data_path);
            collector.append(&text).await?;
            println!("Learning data appended to {}", collector.path().display());
        }
        Command::FineTune => {
            let job = FineTuneJob::new(&config.learning.fine_tune, &config.learning.data_path);
            let outcome = job.run().await?;
            println!("{}", outcome.next_steps());
            if !outcome.success {
                std::process::exit(outcome.exit_code.unwrap_or(1));
            }
        }
        Command::Serve => {
            let server = HealthServer::new(config.server.clone());
            println!("Health: http://{}/api/health", server.address());
            server.start().await?;
        }
        command => run_with_pipeline(&config, command).await?,
    }

    Ok(())
}

async fn run_with_pipeline(config: &RagConfig, command: Command) -> anyhow::Result<()> {
    let embedder = build_embedder(config)?;
    tracing::info!("  - Embedding model: {} ({} dims)", embedder.model(), embedder.dimensions());
    let store = Arc::new(KnowledgeStore::open(&config.store.path, embedder, config.store.distance)?);
    let llm = build_llm(config)?;
    let pipeline = RagPipeline::from_config(config, store.clone(), llm.clone()).await?;

    match command {
        Command::Ask { question } => {
            warn_if_unavailable(llm.as_ref()).await;
            let answer = pipeline.answer(&question).await?;
            println!("Question: {}", answer.question);
            println!("Answer: {}", answer.answer);
            println!("Sources:");
            for doc in &answer.sources {
                println!("  - {} (ID: {})", doc.text, doc.id);
            }
        }
        Command::Add { text, id } => {
            let doc = pipeline.add_knowledge(&text, id.as_deref()).await?;
            println!("Added '{}' (ID: {})", doc.text, doc.id);
        }
        Command::Seed => {
            let added = seed::seed(&store, pipeline.collection()).await?;
            println!("Added {} seed documents", added);
        }
        Command::Count => {
            println!("{}", store.count(pipeline.collection()).await?);
        }
        _ => {
            warn_if_unavailable(llm.as_ref()).await;
            let added = seed::seed_if_empty(&store, pipeline.collection()).await?;
            if added > 0 {
                println!("Collection was empty, added {} seed documents", added);
            }

            let collector = LearningDataCollector::new(&config.learning.data_path);
            let job = FineTuneJob::new(&config.learning.fine_tune, &config.learning.data_path);
            Shell::new(&pipeline, &collector, &job)
                .run(tokio::io::BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await?;
        }
    }

    Ok(())
}

async fn warn_if_unavailable(llm: &dyn LlmProvider) {
    match llm.health_check().await {
        Ok(true) => tracing::info!("{} is running ({})", llm.name(), llm.model()),
        _ => {
            tracing::warn!("{} not available; questions will fail until it is started", llm.name());
            tracing::warn!("  1. Start: ollama serve");
            tracing::warn!("  2. Pull model: ollama pull {}", llm.model());
        }
    }
}
