//! Configuration types for chunking.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChunkerError, Result};
use crate::{DEFAULT_BATCH_CONCURRENCY, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_OVERLAP_PERCENT};

/// Largest accepted `overlap_percent`.
pub const MAX_OVERLAP_PERCENT: f64 = 0.5;

/// Options for a single [`HybridChunker`](crate::chunkers::HybridChunker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum tokens per chunk
    pub max_tokens: usize,

    /// Fraction of `max_tokens` carried into the next chunk (0.0-0.5)
    pub overlap_percent: f64,

    /// Keep whole paragraphs together before falling back to sentences
    pub preserve_paragraphs: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            overlap_percent: DEFAULT_OVERLAP_PERCENT,
            preserve_paragraphs: true,
        }
    }
}

impl ChunkerConfig {
    /// Create a config with the given token budget.
    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            ..Default::default()
        }
    }

    /// Set the overlap fraction.
    pub fn with_overlap(mut self, overlap_percent: f64) -> Self {
        self.overlap_percent = overlap_percent;
        self
    }

    /// Set paragraph preservation.
    pub fn with_preserve_paragraphs(mut self, preserve: bool) -> Self {
        self.preserve_paragraphs = preserve;
        self
    }

    /// Check that every option is in range.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(ChunkerError::invalid("max_tokens must be greater than zero"));
        }
        if !(0.0..=MAX_OVERLAP_PERCENT).contains(&self.overlap_percent) {
            return Err(ChunkerError::invalid(format!(
                "overlap_percent must be within 0.0..={MAX_OVERLAP_PERCENT}, got {}",
                self.overlap_percent
            )));
        }
        Ok(())
    }

    /// Overlap expressed in tokens, `floor(max_tokens * overlap_percent)`.
    pub fn overlap_tokens(&self) -> usize {
        (self.max_tokens as f64 * self.overlap_percent).floor() as usize
    }
}

/// Which tokenizer backs the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// BPE encoding resolved from `model`
    #[default]
    Tiktoken,
    /// One token per whitespace-separated word
    Whitespace,
}

/// Which sentence splitter the chunker falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceSplitterKind {
    /// UAX #29 sentence boundaries
    #[default]
    Unicode,
    /// Terminal punctuation followed by whitespace
    Punctuation,
}

/// Application-level configuration.
///
/// Loaded from an optional TOML file and `CHUNKER_*` environment variables,
/// environment winning over the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum tokens per chunk
    pub max_tokens: usize,

    /// Overlap fraction
    pub overlap_percent: f64,

    /// Paragraph preservation
    pub preserve_paragraphs: bool,

    /// Model name used to pick a BPE encoding
    pub model: String,

    /// Tokenizer backend
    pub tokenizer: TokenizerKind,

    /// Sentence splitter backend
    pub sentence_splitter: SentenceSplitterKind,

    /// Documents chunked concurrently by the batch processor
    pub batch_concurrency: usize,

    /// Whether the batch processor keeps going after a failed document
    pub continue_on_error: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            overlap_percent: DEFAULT_OVERLAP_PERCENT,
            preserve_paragraphs: true,
            model: DEFAULT_MODEL.to_string(),
            tokenizer: TokenizerKind::default(),
            sentence_splitter: SentenceSplitterKind::default(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            continue_on_error: true,
        }
    }
}

impl ChunkingConfig {
    /// Environment variable prefix.
    pub const ENV_PREFIX: &'static str = "CHUNKER";

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load configuration from an optional file, then the environment.
    ///
    /// Values are not range-checked here so that later overrides can still
    /// correct them; validate `chunker_config()` once all layers are applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// The chunker options contained in this configuration.
    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            max_tokens: self.max_tokens,
            overlap_percent: self.overlap_percent,
            preserve_paragraphs: self.preserve_paragraphs,
        }
    }
}
