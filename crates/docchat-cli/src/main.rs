//! CLI entry point for docchat (for dev and testing).

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use docchat_core::{
    answer_stream, app_data_dir, chunk_with, config_path, load_config, load_document, status,
    AnswerStream, Config, Embedder, OllamaClient, RankedPassage, Session,
};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "docchat: ask questions about a document")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status (for dev).
    Status,
    /// Show where docchat stores its config (app data directory).
    DataDir,
    /// Print the effective config as TOML.
    Config,
    /// Split a document into passages and list them (no embedding).
    Chunks {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// Override the configured passage size (characters).
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Answer one question about a document.
    Ask {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        question: String,
        /// Passages to retrieve (default from config).
        #[arg(long)]
        top_k: Option<usize>,
        /// Print the retrieved passages instead of asking the model.
        #[arg(long)]
        context_only: bool,
    },
    /// Load a document, then answer one question per line of stdin.
    Chat {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config();

    let result = match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            println!("docchat");
            println!("  core: {}", status());
            Ok(())
        }
        Commands::DataDir => {
            match app_data_dir() {
                Some(p) => println!("{}", p.display()),
                None => eprintln!("Could not determine app data directory."),
            }
            Ok(())
        }
        Commands::Config => print_config(&config),
        Commands::Chunks { path, chunk_size } => print_chunks(&config, &path, chunk_size),
        Commands::Ask {
            path,
            question,
            top_k,
            context_only,
        } => ask(&config, &path, &question, top_k, context_only).await,
        Commands::Chat { path, top_k } => chat(&config, &path, top_k).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_config(config: &Config) -> Result<(), Box<dyn Error>> {
    if let Some(p) = config_path() {
        println!("# {}", p.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn print_chunks(config: &Config, path: &Path, chunk_size: Option<usize>) -> Result<(), Box<dyn Error>> {
    let doc = load_document(path)?;
    let mut options = config.chunk_options();
    if let Some(size) = chunk_size {
        options.chunk_size = size;
    }
    let passages = chunk_with(&doc.text, &options);
    println!("{} passage(s) from {}", passages.len(), doc.name);
    for p in passages {
        println!("  [{}] {}", p.index, preview(&p.text));
    }
    Ok(())
}

fn client(config: &Config) -> Result<OllamaClient, Box<dyn Error>> {
    Ok(OllamaClient::from_url(&config.ollama_url)?
        .with_chat_model(config.chat_model.clone())
        .with_task_prefixes(config.task_prefixes))
}

async fn open_session(
    config: &Config,
    path: &Path,
) -> Result<(Session, Embedder<OllamaClient>, OllamaClient), Box<dyn Error>> {
    let client = client(config)?;
    let embedder = Embedder::new(client.clone(), config.embedder_options());
    eprintln!("Chunking and embedding {}...", path.display());
    let session = Session::open(path, &embedder, &config.chunk_options()).await?;
    if let Some(warning) = degraded_warning(session.degraded(), session.passages().len()) {
        eprintln!("{}", warning);
    }
    eprintln!(
        "'{}' processed: {} passage(s).",
        session.document().name,
        session.passages().len()
    );
    Ok((session, embedder, client))
}

fn degraded_warning(degraded: usize, total: usize) -> Option<String> {
    (degraded > 0).then(|| {
        format!(
            "Warning: {} of {} passage(s) could not be embedded and will score 0.",
            degraded, total
        )
    })
}

async fn ask(
    config: &Config,
    path: &Path,
    question: &str,
    top_k: Option<usize>,
    context_only: bool,
) -> Result<(), Box<dyn Error>> {
    let (session, embedder, generator) = open_session(config, path).await?;
    let top_k = top_k.unwrap_or(config.top_k);
    if context_only {
        print_sources(&session.retrieve(&embedder, question, top_k).await?);
        return Ok(());
    }
    let streamed = answer_stream(&session, &embedder, &generator, question, top_k).await?;
    print_answer(streamed).await
}

async fn chat(config: &Config, path: &Path, top_k: Option<usize>) -> Result<(), Box<dyn Error>> {
    let (session, embedder, generator) = open_session(config, path).await?;
    let top_k = top_k.unwrap_or(config.top_k);
    eprintln!("Ask a question about your document (Ctrl+D to quit).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        let result = match answer_stream(&session, &embedder, &generator, question, top_k).await {
            Ok(streamed) => print_answer(streamed).await,
            Err(e) => Err(e.into()),
        };
        // A failed answer doesn't end the conversation.
        if let Err(e) = result {
            eprintln!("Error generating response: {}", e);
        }
    }
    Ok(())
}

/// Prints fragments as they arrive, then the sources.
async fn print_answer(streamed: AnswerStream) -> Result<(), Box<dyn Error>> {
    let AnswerStream { sources, mut fragments } = streamed;
    let mut stdout = std::io::stdout();
    while let Some(fragment) = fragments.next().await {
        match fragment {
            Ok(text) => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            Err(e) => {
                writeln!(stdout)?;
                return Err(e.into());
            }
        }
    }
    writeln!(stdout)?;
    print_sources(&sources);
    Ok(())
}

fn print_sources(sources: &[RankedPassage]) {
    for r in sources {
        println!("  [{} | {:.3}] {}", r.passage.index, r.score, preview(&r.passage.text));
    }
}

fn preview(text: &str) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() > 60 {
        format!("{}...", line.chars().take(60).collect::<String>())
    } else {
        line
    }
}
