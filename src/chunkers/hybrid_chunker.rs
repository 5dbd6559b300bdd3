//! Hybrid chunker: paragraph- and sentence-aware packing under a token budget.

use std::mem;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::base::{Chunker, TiktokenTokenizer, Tokenizer, WhitespaceTokenizer};
use super::sentence::{PunctuationSentenceSplitter, SentenceSplitter, UnicodeSentenceSplitter};
use crate::error::{ChunkerError, Result};
use crate::types::{
    Chunk, ChunkMetadata, ChunkerConfig, ChunkingConfig, SentenceSplitterKind, TokenizerKind,
};

/// Separator between paragraphs in the input and between fragments in a chunk.
pub const PARAGRAPH_DELIMITER: &str = "\n\n";

/// Chunker that combines semantic boundaries with a token budget.
///
/// Paragraphs are packed together until the next one would overflow
/// `max_tokens`. Paragraphs that are too large on their own are broken into
/// sentences, which are packed the same way. Each new chunk starts with the
/// last `overlap_tokens` tokens of its predecessor when they fit.
///
/// A single sentence larger than the budget is emitted as its own chunk and
/// is never cut.
pub struct HybridChunker {
    config: ChunkerConfig,
    overlap_tokens: usize,
    tokenizer: Arc<dyn Tokenizer>,
    splitter: Arc<dyn SentenceSplitter>,
}

impl HybridChunker {
    /// Create a chunker, validating the configuration.
    pub fn new(config: ChunkerConfig, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            overlap_tokens: config.overlap_tokens(),
            config,
            tokenizer,
            splitter: Arc::new(UnicodeSentenceSplitter),
        })
    }

    /// Build a chunker with the tokenizer and splitter named in `config`.
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        let tokenizer: Arc<dyn Tokenizer> = match config.tokenizer {
            TokenizerKind::Tiktoken => Arc::new(
                TiktokenTokenizer::for_model(&config.model).map_err(ChunkerError::Tokenizer)?,
            ),
            TokenizerKind::Whitespace => Arc::new(WhitespaceTokenizer::new()),
        };
        let splitter: Arc<dyn SentenceSplitter> = match config.sentence_splitter {
            SentenceSplitterKind::Unicode => Arc::new(UnicodeSentenceSplitter),
            SentenceSplitterKind::Punctuation => Arc::new(PunctuationSentenceSplitter::new()),
        };

        Ok(Self::new(config.chunker_config(), tokenizer)?.with_sentence_splitter(splitter))
    }

    /// Replace the sentence splitter.
    pub fn with_sentence_splitter(mut self, splitter: Arc<dyn SentenceSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Tokens carried from one chunk into the next.
    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Split `text` into chunks, copying `metadata` onto each of them.
    ///
    /// Deterministic for identical inputs. Any tokenizer failure aborts the
    /// whole call.
    pub fn chunk(&self, text: &str, metadata: &Map<String, Value>) -> Result<Vec<Chunk>> {
        let mut assembly = Assembly::new(self, metadata);

        for paragraph in text
            .split(PARAGRAPH_DELIMITER)
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            if !self.config.preserve_paragraphs {
                assembly.push_sentences(paragraph)?;
                continue;
            }

            let paragraph_tokens = self.count(paragraph)?;
            if paragraph_tokens > self.config.max_tokens {
                assembly.flush()?;
                assembly.push_sentences(paragraph)?;
            } else {
                assembly.push(paragraph.to_string(), paragraph_tokens)?;
            }
        }

        let chunks = assembly.finish()?;
        debug!(
            chunks = chunks.len(),
            max_tokens = self.config.max_tokens,
            overlap_tokens = self.overlap_tokens,
            "Chunked text"
        );
        Ok(chunks)
    }

    fn count(&self, text: &str) -> Result<usize> {
        self.tokenizer
            .count_tokens(text)
            .map_err(ChunkerError::Tokenizer)
    }

    fn encode(&self, text: &str) -> Result<Vec<usize>> {
        self.tokenizer.encode(text).map_err(ChunkerError::Tokenizer)
    }

    /// Last `n` tokens of `carry`, decoded and trimmed.
    fn tail(&self, carry: &Carry, n: usize) -> Result<String> {
        if n >= carry.tokens.len() {
            return Ok(carry.text.trim().to_string());
        }
        let suffix = &carry.tokens[carry.tokens.len() - n..];
        let text = self
            .tokenizer
            .decode(suffix)
            .map_err(ChunkerError::Tokenizer)?;
        Ok(text.trim().to_string())
    }

    /// Overlap text to put in front of `fragment`, with the joined token count.
    ///
    /// Shrinks the tail until tail plus fragment fits the budget. Returns
    /// `None` when nothing fits.
    fn fit_overlap(
        &self,
        carry: &Carry,
        fragment: &str,
        fragment_tokens: usize,
    ) -> Result<Option<(String, usize)>> {
        let max_tokens = self.config.max_tokens;
        if fragment_tokens >= max_tokens {
            return Ok(None);
        }

        let mut budget = self.overlap_tokens.min(carry.tokens.len());
        while budget > 0 {
            let tail = self.tail(carry, budget)?;
            if tail.is_empty() {
                return Ok(None);
            }

            let joined_tokens = self.count(&join(&tail, fragment))?;
            if joined_tokens <= max_tokens {
                return Ok(Some((tail, joined_tokens)));
            }
            budget = budget.saturating_sub(joined_tokens - max_tokens);
        }

        Ok(None)
    }
}

impl Chunker for HybridChunker {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn description(&self) -> &'static str {
        "Packs paragraphs, then sentences, under a token budget with token overlap"
    }

    fn chunk(&self, text: &str, metadata: &Map<String, Value>) -> Result<Vec<Chunk>> {
        HybridChunker::chunk(self, text, metadata)
    }
}

fn join(head: &str, tail: &str) -> String {
    let mut joined = String::with_capacity(head.len() + PARAGRAPH_DELIMITER.len() + tail.len());
    joined.push_str(head);
    joined.push_str(PARAGRAPH_DELIMITER);
    joined.push_str(tail);
    joined
}

/// Token stream of the last emitted chunk, kept for overlap extraction.
struct Carry {
    text: String,
    tokens: Vec<usize>,
}

/// Fragments gathered for the chunk under construction.
///
/// Always holds at least one fragment; `token_count` is the exact count of
/// the joined text.
struct Accumulator {
    overlap: Option<String>,
    fragments: Vec<String>,
    token_count: usize,
}

impl Accumulator {
    fn parts(&self) -> impl Iterator<Item = &str> {
        self.overlap
            .iter()
            .chain(self.fragments.iter())
            .map(String::as_str)
    }

    fn joined(&self) -> String {
        self.parts().collect::<Vec<_>>().join(PARAGRAPH_DELIMITER)
    }

    fn joined_with(&self, next: &str) -> String {
        self.parts()
            .chain(std::iter::once(next))
            .collect::<Vec<_>>()
            .join(PARAGRAPH_DELIMITER)
    }
}

enum State {
    /// Nothing buffered since the last emitted chunk.
    Flushed { carry: Option<Carry> },
    /// A chunk is being filled.
    Accumulating(Accumulator),
}

/// Per-call assembly of the chunk stream.
struct Assembly<'a> {
    chunker: &'a HybridChunker,
    metadata: &'a Map<String, Value>,
    chunks: Vec<Chunk>,
    offset: usize,
    state: State,
}

impl<'a> Assembly<'a> {
    fn new(chunker: &'a HybridChunker, metadata: &'a Map<String, Value>) -> Self {
        Self {
            chunker,
            metadata,
            chunks: Vec::new(),
            offset: 0,
            state: State::Flushed { carry: None },
        }
    }

    /// Add a fragment, emitting the current chunk first if it would overflow.
    fn push(&mut self, fragment: String, fragment_tokens: usize) -> Result<()> {
        let state = mem::replace(&mut self.state, State::Flushed { carry: None });

        self.state = match state {
            State::Accumulating(mut acc) => {
                let candidate_tokens = self.chunker.count(&acc.joined_with(&fragment))?;
                if candidate_tokens > self.chunker.config.max_tokens {
                    let carry = self.emit(acc)?;
                    self.seed(carry, fragment, fragment_tokens)?
                } else {
                    acc.fragments.push(fragment);
                    acc.token_count = candidate_tokens;
                    State::Accumulating(acc)
                }
            }
            State::Flushed { carry } => self.seed(carry, fragment, fragment_tokens)?,
        };

        Ok(())
    }

    /// Sentence-split a paragraph and push each sentence.
    fn push_sentences(&mut self, paragraph: &str) -> Result<()> {
        let mut sentences = self.chunker.splitter.split(paragraph);
        if sentences.is_empty() {
            sentences.push(paragraph.to_string());
        }

        for sentence in sentences {
            let sentence_tokens = self.chunker.count(&sentence)?;
            self.push(sentence, sentence_tokens)?;
        }
        Ok(())
    }

    /// Emit the current chunk, if any.
    fn flush(&mut self) -> Result<()> {
        let state = mem::replace(&mut self.state, State::Flushed { carry: None });

        self.state = match state {
            State::Accumulating(acc) => State::Flushed {
                carry: self.emit(acc)?,
            },
            flushed => flushed,
        };
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Chunk>> {
        self.flush()?;
        Ok(self.chunks)
    }

    /// Start a new chunk with `fragment`, preceded by overlap when it fits.
    fn seed(&self, carry: Option<Carry>, fragment: String, fragment_tokens: usize) -> Result<State> {
        let overlap = match carry {
            Some(carry) => self.chunker.fit_overlap(&carry, &fragment, fragment_tokens)?,
            None => None,
        };

        let acc = match overlap {
            Some((tail, joined_tokens)) => Accumulator {
                overlap: Some(tail),
                fragments: vec![fragment],
                token_count: joined_tokens,
            },
            None => Accumulator {
                overlap: None,
                fragments: vec![fragment],
                token_count: fragment_tokens,
            },
        };
        Ok(State::Accumulating(acc))
    }

    /// Append a finished chunk and return the carry for the next one.
    fn emit(&mut self, acc: Accumulator) -> Result<Option<Carry>> {
        let sequence_index = self.chunks.len();
        let metadata = ChunkMetadata::new(
            self.metadata,
            acc.overlap.is_some(),
            sequence_index.checked_sub(1),
            acc.fragments.len(),
        );
        let chunk = Chunk::new(
            acc.joined(),
            sequence_index,
            acc.token_count,
            self.offset,
            metadata,
        );
        self.offset = chunk.end_offset;

        let carry = if self.chunker.overlap_tokens > 0 {
            Some(Carry {
                tokens: self.chunker.encode(&chunk.text)?,
                text: chunk.text.clone(),
            })
        } else {
            None
        };

        self.chunks.push(chunk);
        Ok(carry)
    }
}
