//! Base traits for chunkers and tokenizers.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ChunkerError;
use crate::types::Chunk;

/// The core trait that all chunkers implement.
///
/// A chunker takes raw text and splits it into an ordered sequence of
/// chunks suitable for embedding and retrieval.
pub trait Chunker: Send + Sync {
    /// Get the name of this chunker.
    fn name(&self) -> &'static str;

    /// Chunk the given text, copying `metadata` onto every chunk.
    fn chunk(
        &self,
        text: &str,
        metadata: &Map<String, Value>,
    ) -> std::result::Result<Vec<Chunk>, ChunkerError>;

    /// Get the description of this chunker.
    fn description(&self) -> &'static str {
        "A text chunker"
    }
}

/// Tokenizer capability injected into a chunker.
///
/// The chunker treats token ids as opaque: it only counts them and decodes
/// suffixes of them back into text.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token IDs.
    fn encode(&self, text: &str) -> Result<Vec<usize>>;

    /// Decode token IDs back to text.
    fn decode(&self, tokens: &[usize]) -> Result<String>;

    /// Count the number of tokens in the given text.
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.encode(text)?.len())
    }
}

/// Encoding used when a model name is not recognised.
pub const FALLBACK_ENCODING: &str = "cl100k_base";

/// BPE tokenizer backed by tiktoken encodings.
pub struct TiktokenTokenizer {
    bpe: tiktoken_rs::CoreBPE,
}

impl TiktokenTokenizer {
    /// Create a new tokenizer with the cl100k_base encoding (GPT-4/ChatGPT).
    pub fn new() -> Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::cl100k_base()?,
        })
    }

    /// Create a tokenizer with a specific encoding.
    pub fn with_encoding(encoding_name: &str) -> Result<Self> {
        let bpe = match encoding_name {
            "cl100k_base" => tiktoken_rs::cl100k_base()?,
            "p50k_base" => tiktoken_rs::p50k_base()?,
            "p50k_edit" => tiktoken_rs::p50k_edit()?,
            "r50k_base" | "gpt2" => tiktoken_rs::r50k_base()?,
            "o200k_base" => tiktoken_rs::o200k_base()?,
            other => return Err(anyhow!("unknown encoding: {other}")),
        };
        Ok(Self { bpe })
    }

    /// Resolve the encoding for a model name, falling back to cl100k_base.
    pub fn for_model(model: &str) -> Result<Self> {
        match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => Ok(Self { bpe }),
            Err(e) => {
                warn!(model, error = %e, fallback = FALLBACK_ENCODING, "Unknown model, using fallback encoding");
                Self::with_encoding(FALLBACK_ENCODING)
            }
        }
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<usize>> {
        Ok(self.bpe.encode_ordinary(text))
    }

    /// Decode tokens, dropping leading tokens that begin mid-character.
    ///
    /// A suffix of a token stream may start inside a multi-byte character;
    /// leading tokens are skipped until the rest decodes as UTF-8. A slice
    /// with no decodable suffix yields an empty string.
    fn decode(&self, tokens: &[usize]) -> Result<String> {
        for skip in 0..tokens.len() {
            if let Ok(text) = self.bpe.decode(tokens[skip..].to_vec()) {
                return Ok(text);
            }
        }
        Ok(String::new())
    }
}

/// Word-level tokenizer: one token per whitespace-separated word.
///
/// Meant for tests and offline use. Ids are interned per instance, so two
/// instances may assign different ids to the same word, and the vocabulary
/// grows with every new word seen. Known words are looked up under a read
/// lock; the write lock is only taken to intern new ones. Decoding joins
/// words with a single space.
#[derive(Default)]
pub struct WhitespaceTokenizer {
    vocab: RwLock<Vocab>,
}

#[derive(Default)]
struct Vocab {
    ids: HashMap<String, usize>,
    words: Vec<String>,
}

impl WhitespaceTokenizer {
    /// Create an empty tokenizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct words interned so far.
    pub fn vocab_size(&self) -> usize {
        self.vocab.read().map(|vocab| vocab.words.len()).unwrap_or(0)
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<usize>> {
        {
            let vocab = self
                .vocab
                .read()
                .map_err(|_| anyhow!("tokenizer vocabulary lock poisoned"))?;
            let known = text
                .split_whitespace()
                .map(|word| vocab.ids.get(word).copied())
                .collect::<Option<Vec<_>>>();
            if let Some(tokens) = known {
                return Ok(tokens);
            }
        }

        let mut vocab = self
            .vocab
            .write()
            .map_err(|_| anyhow!("tokenizer vocabulary lock poisoned"))?;

        let tokens = text
            .split_whitespace()
            .map(|word| match vocab.ids.get(word) {
                Some(&id) => id,
                None => {
                    let id = vocab.words.len();
                    vocab.words.push(word.to_string());
                    vocab.ids.insert(word.to_string(), id);
                    id
                }
            })
            .collect();
        Ok(tokens)
    }

    fn decode(&self, tokens: &[usize]) -> Result<String> {
        let vocab = self
            .vocab
            .read()
            .map_err(|_| anyhow!("tokenizer vocabulary lock poisoned"))?;

        let words = tokens
            .iter()
            .map(|&id| {
                vocab
                    .words
                    .get(id)
                    .map(String::as_str)
                    .ok_or_else(|| anyhow!("unknown token id {id}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(words.join(" "))
    }

    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_roundtrip() {
        let tokenizer = WhitespaceTokenizer::new();
        let tokens = tokenizer.encode("the quick  brown\n\nthe fox").unwrap();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], tokens[3]);
        assert_eq!(tokenizer.decode(&tokens[3..]).unwrap(), "the fox");
        assert_eq!(tokenizer.count_tokens("a b\n\nc").unwrap(), 3);
    }

    #[test]
    fn test_whitespace_unknown_id() {
        let tokenizer = WhitespaceTokenizer::new();
        assert!(tokenizer.decode(&[42]).is_err());
    }

    #[test]
    fn test_whitespace_known_words_reuse_ids() {
        let tokenizer = WhitespaceTokenizer::new();
        let first = tokenizer.encode("alpha beta gamma").unwrap();
        assert_eq!(tokenizer.vocab_size(), 3);

        let results: Vec<Vec<usize>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| tokenizer.encode("gamma alpha beta").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for tokens in results {
            assert_eq!(tokens, vec![first[2], first[0], first[1]]);
        }
        assert_eq!(tokenizer.vocab_size(), 3);

        tokenizer.encode("alpha delta").unwrap();
        assert_eq!(tokenizer.vocab_size(), 4);
    }

    #[test]
    fn test_tiktoken_encodings_load() {
        for name in ["cl100k_base", "p50k_base", "r50k_base", "o200k_base"] {
            let tokenizer = TiktokenTokenizer::with_encoding(name).unwrap();
            let tokens = tokenizer.encode("Hello, world!").unwrap();
            assert_eq!(tokenizer.decode(&tokens).unwrap(), "Hello, world!", "{name}");
        }
        assert!(TiktokenTokenizer::with_encoding("no_such_encoding").is_err());
    }

    #[test]
    fn test_tiktoken_decode_empty() {
        let tokenizer = TiktokenTokenizer::new().unwrap();
        assert_eq!(tokenizer.decode(&[]).unwrap(), "");
    }

    #[test]
    fn test_tiktoken_counts() {
        let tokenizer = TiktokenTokenizer::new().unwrap();
        let tokens = tokenizer.encode("Hello, world!").unwrap();
        assert!(!tokens.is_empty());
        assert_eq!(tokenizer.decode(&tokens).unwrap(), "Hello, world!");
    }

    #[test]
    fn test_tiktoken_unknown_model_falls_back() {
        let tokenizer = TiktokenTokenizer::for_model("not-a-real-model").unwrap();
        let reference = TiktokenTokenizer::new().unwrap();
        let text = "Artificial intelligence has a rich history.";
        assert_eq!(
            tokenizer.encode(text).unwrap(),
            reference.encode(text).unwrap()
        );
    }

    #[test]
    fn test_tiktoken_suffix_decode_skips_partial_character() {
        let tokenizer = TiktokenTokenizer::new().unwrap();
        let text = "日本語のテキスト";
        let tokens = tokenizer.encode(text).unwrap();
        for start in 0..tokens.len() {
            let decoded = tokenizer.decode(&tokens[start..]).unwrap();
            assert!(text.ends_with(&decoded), "{decoded:?} is not a suffix");
        }
    }
}
