//! Hybrid Chunker - Command Line Entry Point
//!
//! Chunks files (or stdin) and prints the chunks as JSON.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use hybrid_chunker::types::{SentenceSplitterKind, TokenizerKind};
use hybrid_chunker::{
    BatchConfig, BatchProcessor, Chunk, ChunkStatistics, ChunkingConfig, Document, HybridChunker,
};

#[derive(Parser, Debug)]
#[command(name = "hybrid-chunker", version, about = "Split text into token-bounded chunks for RAG")]
struct Cli {
    /// Files to chunk; reads stdin when none are given
    files: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum tokens per chunk
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Overlap as a fraction of max tokens (0.0-0.5)
    #[arg(long)]
    overlap_percent: Option<f64>,

    /// Split every paragraph into sentences
    #[arg(long)]
    no_preserve_paragraphs: bool,

    /// Model name used to select the tiktoken encoding
    #[arg(long)]
    model: Option<String>,

    /// Tokenizer backend
    #[arg(long, value_enum)]
    tokenizer: Option<TokenizerArg>,

    /// Sentence splitter backend
    #[arg(long, value_enum)]
    splitter: Option<SplitterArg>,

    /// Include chunk statistics per document
    #[arg(long)]
    stats: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TokenizerArg {
    Tiktoken,
    Whitespace,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplitterArg {
    Unicode,
    Punctuation,
}

impl Cli {
    /// Apply command line overrides on top of file/env configuration.
    fn apply(&self, config: &mut ChunkingConfig) {
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(overlap_percent) = self.overlap_percent {
            config.overlap_percent = overlap_percent;
        }
        if self.no_preserve_paragraphs {
            config.preserve_paragraphs = false;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(tokenizer) = self.tokenizer {
            config.tokenizer = match tokenizer {
                TokenizerArg::Tiktoken => TokenizerKind::Tiktoken,
                TokenizerArg::Whitespace => TokenizerKind::Whitespace,
            };
        }
        if let Some(splitter) = self.splitter {
            config.sentence_splitter = match splitter {
                SplitterArg::Unicode => SentenceSplitterKind::Unicode,
                SplitterArg::Punctuation => SentenceSplitterKind::Punctuation,
            };
        }
    }
}

#[derive(Debug, Serialize)]
struct DocumentOutput {
    document_id: Uuid,
    source: String,
    chunks: Vec<Chunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<ChunkStatistics>,
}

fn read_documents(files: &[PathBuf]) -> Result<Vec<Document>> {
    if files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(vec![Document::new(text).with_metadata("source", "<stdin>")]);
    }

    files
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(Document::new(text).with_metadata("source", path.display().to_string()))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "hybrid_chunker=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let mut config = ChunkingConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.chunker_config().validate()?;

    info!("Starting Hybrid Chunker v{}", env!("CARGO_PKG_VERSION"));
    info!(
        max_tokens = config.max_tokens,
        overlap_percent = config.overlap_percent,
        tokenizer = ?config.tokenizer,
        "Chunker configured"
    );

    let chunker = HybridChunker::from_config(&config)?;
    let processor = BatchProcessor::new(
        Arc::new(chunker),
        BatchConfig {
            concurrency: config.batch_concurrency,
            continue_on_error: config.continue_on_error,
        },
    );

    let documents = read_documents(&cli.files)?;
    let sources: HashMap<Uuid, String> = documents
        .iter()
        .map(|d| {
            let source = d
                .metadata
                .get("source")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            (d.id, source)
        })
        .collect();

    let (outputs, result) = processor.process_batch(documents).await?;

    let outputs: Vec<DocumentOutput> = outputs
        .into_iter()
        .map(|output| DocumentOutput {
            document_id: output.document_id,
            source: sources.get(&output.document_id).cloned().unwrap_or_default(),
            statistics: cli.stats.then(|| ChunkStatistics::from_chunks(&output.chunks)),
            chunks: output.chunks,
        })
        .collect();

    let json = if cli.pretty {
        serde_json::to_string_pretty(&outputs)?
    } else {
        serde_json::to_string(&outputs)?
    };
    println!("{json}");

    info!(
        documents = result.processed_documents,
        failed = result.failed_documents,
        chunks = result.total_chunks,
        "Done"
    );

    Ok(())
}
