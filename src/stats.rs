//! Aggregate statistics over a chunk sequence.

use serde::{Deserialize, Serialize};

use crate::types::Chunk;

/// Summary of a chunk sequence.
///
/// Computed from chunks alone; an empty sequence yields all zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkStatistics {
    pub total_chunks: usize,
    pub total_tokens: usize,
    pub total_chars: usize,
    pub avg_tokens_per_chunk: f64,
    pub avg_chars_per_chunk: f64,
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub chunks_with_overlap: usize,
    /// Share of chunks flagged `has_overlap`
    pub overlap_fraction: f64,
    pub avg_fragments_per_chunk: f64,
}

impl ChunkStatistics {
    /// Compute statistics for `chunks`.
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        if chunks.is_empty() {
            return Self::default();
        }

        let count = chunks.len() as f64;
        let total_tokens: usize = chunks.iter().map(|c| c.token_count).sum();
        let total_chars: usize = chunks.iter().map(|c| c.char_count).sum();
        let total_fragments: usize = chunks.iter().map(|c| c.metadata.fragment_count).sum();
        let chunks_with_overlap = chunks.iter().filter(|c| c.metadata.has_overlap).count();

        Self {
            total_chunks: chunks.len(),
            total_tokens,
            total_chars,
            avg_tokens_per_chunk: total_tokens as f64 / count,
            avg_chars_per_chunk: total_chars as f64 / count,
            min_tokens: chunks.iter().map(|c| c.token_count).min().unwrap_or(0),
            max_tokens: chunks.iter().map(|c| c.token_count).max().unwrap_or(0),
            chunks_with_overlap,
            overlap_fraction: chunks_with_overlap as f64 / count,
            avg_fragments_per_chunk: total_fragments as f64 / count,
        }
    }
}
