//! Batch input documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::Chunk;

/// A document to be chunked by the batch processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier for this document
    pub id: Uuid,

    /// Raw text content
    pub text: String,

    /// Metadata copied onto every chunk of this document
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Create a document with a fresh id and no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            metadata: Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Caller metadata plus the `document_id` key.
    pub fn chunk_metadata(&self) -> Map<String, Value> {
        let mut metadata = self.metadata.clone();
        metadata.insert("document_id".to_string(), Value::String(self.id.to_string()));
        metadata
    }
}

/// Chunks produced for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunks {
    /// ID of the document the chunks came from
    pub document_id: Uuid,

    /// Chunks in sequence order
    pub chunks: Vec<Chunk>,
}
