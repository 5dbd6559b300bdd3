//! Chunking strategy, tokenizers and sentence splitters.

mod base;
mod hybrid_chunker;
mod sentence;

pub use base::{Chunker, TiktokenTokenizer, Tokenizer, WhitespaceTokenizer, FALLBACK_ENCODING};
pub use hybrid_chunker::{HybridChunker, PARAGRAPH_DELIMITER};
pub use sentence::{PunctuationSentenceSplitter, SentenceSplitter, UnicodeSentenceSplitter};
