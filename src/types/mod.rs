//! Core types for the chunker.

mod chunk;
mod config;
mod document;

pub use chunk::{Chunk, ChunkMetadata};
pub use config::{
    ChunkerConfig, ChunkingConfig, SentenceSplitterKind, TokenizerKind, MAX_OVERLAP_PERCENT,
};
pub use document::{Document, DocumentChunks};
