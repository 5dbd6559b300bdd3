//! Hybrid Chunker Library
//!
//! Token-bounded text chunking for RAG pipelines. Text is packed by
//! paragraph, then by sentence, under a token budget, with a token overlap
//! between consecutive chunks.

pub mod batch;
pub mod chunkers;
pub mod error;
pub mod stats;
pub mod types;

pub use batch::{BatchConfig, BatchProcessor, BatchResult};
pub use chunkers::{Chunker, HybridChunker, SentenceSplitter, Tokenizer};
pub use error::ChunkerError;
pub use stats::ChunkStatistics;
pub use types::{Chunk, ChunkMetadata, ChunkerConfig, ChunkingConfig, Document, DocumentChunks};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batch::*;
    pub use crate::chunkers::*;
    pub use crate::error::ChunkerError;
    pub use crate::stats::ChunkStatistics;
    pub use crate::types::*;
}

/// Default maximum tokens per chunk
pub const DEFAULT_MAX_TOKENS: usize = 500;

/// Default overlap as a fraction of `max_tokens`
pub const DEFAULT_OVERLAP_PERCENT: f64 = 0.15;

/// Default model used to resolve a tiktoken encoding
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default number of documents chunked concurrently
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;
