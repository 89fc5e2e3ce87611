use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use optisecure_cli::{
    display_banner, handle_input_with_history, parse_helpful, print_answer, print_help,
    print_statistics, prompt_feedback, AppConfig, Assistant, EmbedderKind,
};
use optisecure_core::{AddOutcome, FeedbackStore};
use optisecure_feedback::SqliteFeedbackStore;
use optisecure_rag::SqliteVectorIndex;

#[derive(Parser)]
#[command(name = "optisecure")]
#[command(about = "Question answering over insurance contract documents", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Overrides for the OPTISECURE_* environment variables
#[derive(Args)]
struct Settings {
    /// Directory holding the HTML documents
    #[arg(long, global = true)]
    documents_dir: Option<PathBuf>,

    /// Directory holding the vector index
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    /// Vector index collection name
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Feedback database file
    #[arg(long, global = true)]
    feedback_db: Option<PathBuf>,

    /// File receiving the chunk set on every ingestion
    #[arg(long, global = true)]
    chunks_file: Option<PathBuf>,

    /// Embedding model for documents and queries
    #[arg(long, value_enum, global = true)]
    embedder: Option<EmbedderKind>,

    /// Number of passages used as context
    #[arg(long, global = true)]
    top_k: Option<usize>,
}

impl Settings {
    fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(dir) = self.documents_dir {
            config.documents_dir = dir;
        }
        if let Some(dir) = self.index_dir {
            config.index_dir = dir;
        }
        if let Some(collection) = self.collection {
            config.collection = collection;
        }
        if let Some(path) = self.feedback_db {
            config.feedback_db = path;
        }
        if let Some(path) = self.chunks_file {
            config.chunks_file = path;
        }
        if let Some(embedder) = self.embedder {
            config.embedder = embedder;
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        config
    }
}

#[derive(Subcommand)]
enum Command {
    /// Load, chunk and index the documents directory
    Ingest,
    /// Answer a single question
    Ask {
        question: String,
        /// Record feedback on the answer (y or n)
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Show the passages closest to a query
    Search {
        query: String,
        /// Number of passages to return
        #[arg(short)]
        k: Option<usize>,
    },
    /// Record feedback on an answer given elsewhere
    Feedback {
        #[arg(long)]
        question: String,
        #[arg(long)]
        response: String,
        #[arg(long, conflicts_with = "not_helpful", required_unless_present = "not_helpful")]
        helpful: bool,
        #[arg(long)]
        not_helpful: bool,
    },
    /// Show feedback statistics
    Stats,
    /// Delete the vector index
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.settings.apply(AppConfig::from_env()?);
    config.validate()?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Some(Command::Ingest) => {
            let mut assistant = Assistant::from_config(config)?;
            let report = assistant.ingest().await?;
            match report.outcome {
                AddOutcome::Inserted(n) => println!(
                    "{} Indexed {} chunks from {} documents",
                    "✅".green(),
                    n,
                    report.documents
                ),
                AddOutcome::Skipped { existing } => println!(
                    "{} Index already holds {} chunks, nothing to do (run `reset` to rebuild)",
                    "ℹ️".blue(),
                    existing
                ),
            }
        }
        Some(Command::Ask { question, feedback }) => {
            let helpful = match feedback.as_deref() {
                Some(raw) => match parse_helpful(raw) {
                    Some(helpful) => Some(helpful),
                    None => anyhow::bail!("--feedback expects y or n, got {raw:?}"),
                },
                None => None,
            };

            let mut assistant = Assistant::from_config(config)?;
            assistant.ingest().await?;
            let answer = assistant.ask(&question).await?;
            print_answer(&answer);

            if let Some(helpful) = helpful {
                assistant.record_feedback(&answer, helpful).await?;
                println!("{} Feedback recorded", "✅".green());
            }
        }
        Some(Command::Search { query, k }) => {
            let k = k.unwrap_or(config.top_k);
            let mut assistant = Assistant::from_config(config)?;
            let retrieval = assistant.search(&query, k).await?;
            if retrieval.hits.is_empty() {
                println!("{} No passages found; has the index been built?", "⚠️".yellow());
            }
            for line in optisecure_cli::format_sources(&retrieval.hits) {
                println!("{}", line);
            }
        }
        Some(Command::Feedback {
            question,
            response,
            helpful,
            not_helpful: _,
        }) => {
            let store = SqliteFeedbackStore::open(&config.feedback_db)?;
            let id = store.add_feedback(&question, &response, helpful).await?;
            println!("{} Feedback #{} recorded", "✅".green(), id);
        }
        Some(Command::Stats) => {
            let store = SqliteFeedbackStore::open(&config.feedback_db)?;
            print_statistics(&store.get_statistics().await?);
        }
        Some(Command::Reset) => {
            SqliteVectorIndex::destroy(&config.index_dir)?;
            println!("{} Vector index deleted", "🗑️".yellow());
        }
        None => interactive(config).await?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn interactive(config: AppConfig) -> Result<()> {
    let mut assistant = Assistant::from_config(config)?;

    println!("{} Preparing the document index...", "🤖".blue());
    let report = assistant.ingest().await?;
    if let AddOutcome::Inserted(n) = report.outcome {
        println!("{} Indexed {} chunks", "✅".green(), n);
    }

    display_banner();
    let mut history = Vec::new();

    loop {
        let Some(input) = handle_input_with_history(&mut history).await? else {
            println!("{}", "👋 Goodbye!".green());
            break;
        };
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" => {
                println!("{}", "👋 Goodbye!".green());
                break;
            }
            "help" => {
                print_help();
                continue;
            }
            "stats" => {
                print_statistics(&assistant.statistics().await?);
                continue;
            }
            _ => {}
        }

        if let Some(query) = input.strip_prefix("search ") {
            let top_k = assistant.config().top_k;
            match assistant.search(query, top_k).await {
                Ok(retrieval) => {
                    for line in optisecure_cli::format_sources(&retrieval.hits) {
                        println!("  {}", line);
                    }
                }
                Err(e) => println!("{} Search failed: {}", "❌".red(), e),
            }
            continue;
        }

        println!("{} Searching the documents...", "🔎".blue());
        match assistant.ask(&input).await {
            Ok(answer) => {
                print_answer(&answer);
                if let Some(helpful) = prompt_feedback()? {
                    assistant.record_feedback(&answer, helpful).await?;
                    println!("{} Thanks for your feedback!", "✅".green());
                }
            }
            Err(e) => println!("{} {}", "❌".red(), e),
        }
    }

    Ok(())
}
