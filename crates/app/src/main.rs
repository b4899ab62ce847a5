use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use postchat_core::{
    ChatPipeline, ChatRole, ContentSource, FolderSource, PipelineOptions, PostsClient, Reply,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_QA_MODEL,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Source = Box<dyn ContentSource + Send + Sync>;

#[derive(Parser)]
#[command(name = "postchat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the content service exposing /fetch-posts
    #[arg(long, env = "POSTCHAT_SOURCE_URL", default_value = "http://127.0.0.1:8080")]
    source_url: String,

    /// Read posts from .txt/.md files under this folder instead of the content service
    #[arg(long, env = "POSTCHAT_FOLDER")]
    folder: Option<PathBuf>,

    /// Request timeout for the content service, in seconds
    #[arg(long, env = "POSTCHAT_SOURCE_TIMEOUT_SECS", default_value = "30")]
    source_timeout_secs: u64,

    /// Target chunk length in characters
    #[arg(long, env = "POSTCHAT_CHUNK_SIZE", default_value = "1000")]
    chunk_size: usize,

    /// Characters repeated between neighbouring chunks
    #[arg(long, env = "POSTCHAT_CHUNK_OVERLAP", default_value = "200")]
    chunk_overlap: usize,

    /// Separator to split on before packing chunks (accepts \n, \t, \r escapes)
    #[arg(long, env = "POSTCHAT_SEPARATOR", default_value = "\\n")]
    separator: String,

    /// Number of chunks retrieved per question
    #[arg(long, env = "POSTCHAT_TOP_K", default_value = "5")]
    top_k: usize,

    /// Embedding model identifier
    #[arg(long, env = "POSTCHAT_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Question-answering model identifier
    #[arg(long, env = "POSTCHAT_QA_MODEL", default_value = DEFAULT_QA_MODEL)]
    qa_model: String,

    /// Withhold answers whose confidence falls below this value (0.0 to 1.0)
    #[arg(long, env = "POSTCHAT_MIN_CONFIDENCE")]
    min_confidence: Option<f32>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch posts, then answer questions read from stdin until :quit.
    Chat,
    /// Fetch posts and answer a single question.
    Ask {
        /// Question to answer
        #[arg(long)]
        question: String,
    },
    /// Fetch posts and print the chunks they are split into.
    Chunks {
        /// Characters of each chunk to print.
        #[arg(long, default_value = "80")]
        preview_chars: usize,
    },
}

impl Cli {
    fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            separator: unescape(&self.separator),
            top_k: self.top_k,
            embedding_model: self.embedding_model.clone(),
            qa_model: self.qa_model.clone(),
            min_answer_confidence: self.min_confidence,
        }
    }

    fn content_source(&self) -> anyhow::Result<Source> {
        if let Some(folder) = &self.folder {
            return Ok(Box::new(FolderSource::new(folder.clone())));
        }
        let client = PostsClient::new(
            &self.source_url,
            Duration::from_secs(self.source_timeout_secs),
        )
        .with_context(|| format!("invalid source url {}", self.source_url))?;
        Ok(Box::new(client))
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
}

fn preview(text: &str, limit: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= limit {
        flat
    } else {
        format!("{}...", flat.chars().take(limit).collect::<String>())
    }
}

async fn refresh(pipeline: &mut ChatPipeline, source: &Source) -> anyhow::Result<()> {
    let summary = pipeline
        .ingest_from(source.as_ref())
        .await
        .with_context(|| format!("failed to ingest posts from {}", source.describe()))?;
    println!("Total chunks created: {}", summary.chunk_count);
    info!(
        corpus_id = %summary.corpus_id,
        dimensions = summary.dimensions,
        model = %summary.embedding_model,
        "vector index ready"
    );
    Ok(())
}

fn print_reply(reply: &Reply, with_sources: bool) {
    println!("Bot: {}", reply.text);
    if !with_sources {
        return;
    }
    println!("confidence={:.2} grounded={}", reply.confidence, reply.grounded);
    for (rank, source) in reply.sources.iter().enumerate() {
        println!(
            "  [{}] chunk={} offset={} distance={:.4} {}",
            rank + 1,
            source.position,
            source.chunk.offset,
            source.distance,
            preview(&source.chunk.text, 60)
        );
    }
}

async fn run_chat(pipeline: &mut ChatPipeline, source: &Source) -> anyhow::Result<()> {
    if let Err(error) = refresh(pipeline, source).await {
        warn!("{error:#}");
        eprintln!("error: {error:#}");
    }
    println!("Ask a question, or use :refresh, :history, :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            ":quit" | ":q" => break,
            ":refresh" => {
                if let Err(error) = refresh(pipeline, source).await {
                    eprintln!("error: {error:#}");
                }
            }
            ":history" => {
                for turn in pipeline.history() {
                    let speaker = match turn.role {
                        ChatRole::User => "You",
                        ChatRole::Bot => "Bot",
                    };
                    println!("{speaker}: {}", turn.content);
                }
            }
            question => match pipeline.ask(question) {
                Ok(reply) => print_reply(&reply, false),
                Err(error) => eprintln!("error: {error}"),
            },
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let source = cli.content_source()?;
    let mut pipeline = ChatPipeline::new(cli.pipeline_options());

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        session = %pipeline.session_id(),
        source = %source.describe(),
        "postchat boot"
    );

    match cli.command {
        Command::Chat => run_chat(&mut pipeline, &source).await?,
        Command::Ask { question } => {
            refresh(&mut pipeline, &source).await?;
            let reply = pipeline.ask(&question)?;
            print_reply(&reply, true);
        }
        Command::Chunks { preview_chars } => {
            refresh(&mut pipeline, &source).await?;
            if let Some(snapshot) = pipeline.snapshot() {
                for (position, chunk) in snapshot.chunks.iter().enumerate() {
                    println!(
                        "[{position}] offset={} chars={} {}",
                        chunk.offset,
                        chunk.char_len(),
                        preview(&chunk.text, preview_chars)
                    );
                }
            }
        }
    }

    Ok(())
}
