use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::Mutex as TokioMutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docqa::config::Config;
use docqa::indexer::loader::FailurePolicy;
use docqa::rag::{Generation, Pipeline, Session};
use docqa::recommend::Recommender;
use docqa::web::{WebContext, WebServer};

#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version,
    about = "Ask questions about local PDF/text documents through a local LLM"
)]
struct Cli {
    /// Path to the JSON config file (config.json when omitted).
    #[arg(long, global = true, default_value = "")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index every PDF/text file of a folder into a persisted index.
    BuildIndex {
        /// Corpus folder (config `docs_dir` when omitted).
        #[arg(long)]
        docs: Option<PathBuf>,
        /// Index directory (config `persist_dir` when omitted).
        #[arg(long)]
        persist: Option<PathBuf>,
        /// Keep going when a file fails to load instead of aborting the batch.
        #[arg(long)]
        skip_failed: bool,
    },
    /// Answer a question from the persisted index, or from a single file.
    Ask {
        question: String,
        /// Index this file in memory and ask against it instead.
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Print the chunks nearest to a query.
    Search {
        query: String,
        #[arg(short, default_value_t = 5)]
        k: usize,
    },
    /// Show what the persisted index contains.
    Inspect {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Recommend learning resources for a topic.
    Recommend {
        query: String,
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Start the local web UI.
    Serve,
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // 1. Load config
    let config = Config::load(&cli.config)?;
    config.validate().context("invalid configuration")?;

    match cli.command {
        Command::BuildIndex {
            docs,
            persist,
            skip_failed,
        } => {
            let pipeline = Pipeline::from_config(&config)?;
            let docs = docs.unwrap_or_else(|| config.docs_dir.clone());
            let persist = persist.unwrap_or_else(|| config.persist_dir.clone());
            let policy = if skip_failed {
                FailurePolicy::SkipFailed
            } else {
                FailurePolicy::AbortAll
            };

            let report = pipeline.build_index(&docs, &persist, policy, true)?;
            println!(
                "Indexed {} documents into {} chunks ({} dims) in {:.2?}",
                report.documents,
                report.chunks,
                report.dimensions,
                report.total_time()
            );
            println!("Index saved to {}", persist.display());
        }
        Command::Ask {
            question,
            file,
            top_k,
        } => {
            let pipeline = Pipeline::from_config(&config)?;
            let handle = match file {
                Some(file) => pipeline.load_document(&file)?,
                None => pipeline.open_index(&config.persist_dir)?,
            };
            let answer = pipeline.answer(&handle, &question, top_k.unwrap_or(pipeline.top_k))?;

            match &answer.generation {
                Generation::Answer(text) => println!("{text}"),
                Generation::Empty => println!("(the language model returned no answer)"),
                Generation::Failed(reason) => anyhow::bail!("generation failed: {reason}"),
            }
            println!();
            println!("Sources:");
            for (i, hit) in answer.sources.iter().enumerate() {
                println!(
                    "{}. [{}] {}",
                    i + 1,
                    hit.metadata.citation(),
                    preview(&hit.text, 80)
                );
            }
            info!(
                "Retrieval {:.2?}, generation {:.2?}",
                answer.retrieval_time, answer.generation_time
            );
        }
        Command::Search { query, k } => {
            let pipeline = Pipeline::from_config(&config)?;
            let handle = pipeline.open_index(&config.persist_dir)?;
            let hits = pipeline.search(&handle, &query, k)?;
            println!("{} results for '{query}'", hits.len());
            for (i, hit) in hits.iter().enumerate() {
                println!("{}", "=".repeat(70));
                println!("Result {} (score {:.3})", i + 1, hit.score);
                println!("Source: {}", hit.metadata.citation());
                println!("{}", hit.text);
            }
        }
        Command::Inspect { limit } => {
            let pipeline = Pipeline::from_config(&config)?;
            let handle = pipeline.open_index(&config.persist_dir)?;
            let db = handle.index();
            let count = db.count_chunks()?;
            println!("Index: {}", handle.label);
            println!("Embedder: {}", db.fingerprint());
            if let Some(created) = db.created_at()? {
                println!("Created: {created}");
            }
            println!("Entries: {count}");
            for source in db.sources()? {
                println!("  {} ({} chunks)", source.source, source.chunks);
            }
            for entry in db.list_entries(limit)? {
                println!(
                    "{} [{}] {} chars: {}",
                    entry.id,
                    entry.metadata.citation(),
                    entry.text.chars().count(),
                    preview(&entry.text, 120)
                );
            }
        }
        Command::Recommend { query, top_n } => {
            let recommender =
                Recommender::from_catalog(&config.recommend.catalog_path, config.recommend.max_features);
            let top_n = top_n.unwrap_or(config.recommend.default_top_n);
            for rec in recommender.search(&query, top_n) {
                println!("{} | {} | {}", rec.title, rec.url, rec.platform);
            }
        }
        Command::Serve => {
            // 2. Init pipeline and recommendation model
            let pipeline = Arc::new(Pipeline::from_config(&config)?);
            let recommender = Arc::new(Recommender::from_catalog(
                &config.recommend.catalog_path,
                config.recommend.max_features,
            ));
            let session = Session::new(pipeline.clone(), config.prompt.max_sources_shown);

            // 3. Start server. `pipeline` outlives the runtime so its blocking
            // HTTP clients are never dropped on an async thread.
            let ctx = WebContext {
                session: Arc::new(TokioMutex::new(session)),
                recommender,
                config: Arc::new(config),
            };
            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime.block_on(WebServer::new(ctx).start())?;
            drop(runtime);
            drop(pipeline);
        }
    }

    Ok(())
}
