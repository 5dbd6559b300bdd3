//! Chunk type definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chunk of text produced by one `chunk()` call.
///
/// Chunks are the unit that downstream embedding and retrieval code works
/// with. Offsets refer to a virtual concatenation of the chunk stream, so
/// `start_offset` of a chunk always equals `end_offset` of its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Joined paragraph/sentence fragments
    pub text: String,

    /// Zero-based position within the chunk stream
    pub sequence_index: usize,

    /// Number of tokens as measured by the chunker's tokenizer
    pub token_count: usize,

    /// Length of `text` in characters
    pub char_count: usize,

    /// Starting character offset in the chunk stream
    pub start_offset: usize,

    /// Ending character offset in the chunk stream
    pub end_offset: usize,

    /// Caller metadata plus chunker-derived fields
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a chunk starting at `start_offset`.
    ///
    /// Character count and end offset are derived from `text`.
    pub fn new(
        text: String,
        sequence_index: usize,
        token_count: usize,
        start_offset: usize,
        metadata: ChunkMetadata,
    ) -> Self {
        let char_count = text.chars().count();
        Self {
            text,
            sequence_index,
            token_count,
            char_count,
            start_offset,
            end_offset: start_offset + char_count,
            metadata,
        }
    }

    /// Get the length of the chunk text in characters.
    pub fn len(&self) -> usize {
        self.char_count
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Metadata attached to every chunk.
///
/// Serialized as one flat map: the caller's keys from `extra` alongside the
/// chunker-derived keys. Derived keys win when the caller supplies the same
/// name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Whether text from the previous chunk was carried into this one
    pub has_overlap: bool,

    /// Sequence index of the preceding chunk, if any
    pub previous_chunk_index: Option<usize>,

    /// Number of paragraph/sentence fragments joined into this chunk
    pub fragment_count: usize,

    /// Caller-supplied metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChunkMetadata {
    /// Keys owned by the chunker.
    pub const RESERVED_KEYS: [&'static str; 3] =
        ["has_overlap", "previous_chunk_index", "fragment_count"];

    /// Build metadata from the chunker's fields and the caller's map.
    pub fn new(
        caller: &Map<String, Value>,
        has_overlap: bool,
        previous_chunk_index: Option<usize>,
        fragment_count: usize,
    ) -> Self {
        let extra = caller
            .iter()
            .filter(|(key, _)| !Self::RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            has_overlap,
            previous_chunk_index,
            fragment_count,
            extra,
        }
    }

    /// Look up a caller-supplied value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Insert a caller-level value, ignoring reserved keys.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if !Self::RESERVED_KEYS.contains(&key.as_str()) {
            self.extra.insert(key, value);
        }
    }

    /// Flatten into a single JSON map.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        map.insert("has_overlap".to_string(), Value::Bool(self.has_overlap));
        map.insert(
            "previous_chunk_index".to_string(),
            self.previous_chunk_index.map_or(Value::Null, Value::from),
        );
        map.insert("fragment_count".to_string(), Value::from(self.fragment_count));
        map
    }
}
