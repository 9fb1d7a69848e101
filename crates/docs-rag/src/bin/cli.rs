//! docs-rag command line: build the index, ask questions from the terminal
//!
//! Run with: cargo run -p docs-rag --bin docs-rag -- build
//!           cargo run -p docs-rag --bin docs-rag -- ask "What is FastAPI?"

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docs_rag::ingestion::{BuildProgress, IndexBuilder};
use docs_rag::{CitedSource, GenerationEvent, RagChain, RagConfig};

/// Words that end the interactive session
const EXIT_WORDS: [&str; 3] = ["quit", "exit", "退出"];

#[derive(Parser, Debug)]
#[command(
    name = "docs-rag",
    version,
    about = "Documentation Q&A: build a vector index and ask grounded questions"
)]
struct Cli {
    /// TOML configuration file (defaults to $DOCS_RAG_CONFIG)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk, embed and persist the scraped documents
    Build {
        /// Scraped documents (JSON array of {url, title, content})
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Index directory
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Answer a question, or start an interactive session when none is given
    Ask {
        /// Question to answer
        question: Option<String>,

        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docs_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .or_else(|| std::env::var_os("DOCS_RAG_CONFIG").map(PathBuf::from));
    let mut config = RagConfig::load(config_path.as_deref())?;

    match cli.command {
        Command::Build { input, output } => {
            if let Some(input) = input {
                config.ingestion.documents_path = input;
            }
            if let Some(output) = output {
                config.index.storage_path = output;
            }
            build(config).await
        }
        Command::Ask { question, top_k } => {
            if let Some(k) = top_k {
                config.retrieval.top_k = k;
            }
            ask(config, question).await
        }
    }
}

async fn build(config: RagConfig) -> Result<()> {
    println!(
        "{} {}",
        style("Building index from").bold(),
        config.ingestion.documents_path.display()
    );

    let builder = IndexBuilder::new(config).context("failed to prepare index build")?;

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message("Loading documents...");

    let progress_bar = bar.clone();
    let report = builder
        .run_with_progress(move |event| match event {
            BuildProgress::Loaded { documents } => {
                progress_bar.set_message(format!("Loaded {} documents, chunking...", documents));
            }
            BuildProgress::Chunked { chunks } => {
                progress_bar.set_length(chunks as u64);
                progress_bar.set_position(0);
                progress_bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{bar:40.cyan/blue} {pos}/{len} chunks embedded ({eta})")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
            }
            BuildProgress::Embedded { done, .. } => progress_bar.set_position(done as u64),
            BuildProgress::Persisted => progress_bar.set_message("Index written"),
        })
        .await;

    bar.finish_and_clear();
    let report = report.context("index build failed")?;

    println!(
        "{} {} documents → {} chunks ({} dimensions) in {}",
        style("✓").green().bold(),
        report.documents,
        report.chunks,
        report.dimensions,
        report.location.display()
    );
    Ok(())
}

async fn ask(config: RagConfig, question: Option<String>) -> Result<()> {
    let chain = RagChain::from_config(&config)
        .await
        .context("failed to initialize the RAG chain (has the index been built?)")?;

    if let Some(question) = question {
        return answer(&chain, &question).await;
    }

    println!(
        "{} documentation assistant ready. Type {} to leave.\n",
        style(&config.prompt.domain).bold(),
        EXIT_WORDS.join(" / ")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("Question:").cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            println!("Goodbye!");
            break;
        }

        if let Err(e) = answer(&chain, question).await {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
        }
        println!("{}\n", "-".repeat(50));
    }
    Ok(())
}

/// Stream one answer to stdout, then list its sources
async fn answer(chain: &RagChain, question: &str) -> Result<()> {
    let mut events = chain.stream_events(question)?;
    let mut sources = Vec::new();
    let mut stdout = std::io::stdout();

    println!("\n{}", style("[Answer]").bold());
    while let Some(event) = events.next().await {
        match event {
            GenerationEvent::SourceList(list) => sources = list,
            GenerationEvent::AnswerDelta(text) => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            GenerationEvent::End => break,
            GenerationEvent::Error(message) => {
                println!();
                anyhow::bail!(message);
            }
        }
    }
    println!();

    println!("\n{}", style("[Sources]").bold());
    let sources = CitedSource::dedup(sources);
    if sources.is_empty() {
        println!("- no explicit sources found");
    } else {
        for source in &sources {
            println!("{}", source.format_line());
        }
    }
    Ok(())
}
