//! Batch processing: chunk many documents with bounded concurrency.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunkers::Chunker;
use crate::types::{Chunk, Document, DocumentChunks};
use crate::DEFAULT_BATCH_CONCURRENCY;

/// Configuration for batch processing.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum documents chunked concurrently
    pub concurrency: usize,
    /// Whether to continue on individual document failures
    pub continue_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BATCH_CONCURRENCY,
            continue_on_error: true,
        }
    }
}

/// Result of batch processing.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total_documents: usize,
    pub processed_documents: usize,
    pub failed_documents: usize,
    pub total_chunks: usize,
    pub errors: Vec<BatchError>,
}

/// Error during batch processing.
#[derive(Debug, Clone)]
pub struct BatchError {
    pub document_id: Uuid,
    pub error: String,
}

/// Batch processor for chunking many documents.
///
/// Each document is chunked on tokio's blocking pool; results come back in
/// input order.
pub struct BatchProcessor {
    chunker: Arc<dyn Chunker>,
    config: BatchConfig,
}

impl BatchProcessor {
    /// Create a new batch processor.
    pub fn new(chunker: Arc<dyn Chunker>, config: BatchConfig) -> Self {
        Self { chunker, config }
    }

    /// Process a batch of documents and return all chunks.
    pub async fn process_batch(
        &self,
        documents: Vec<Document>,
    ) -> Result<(Vec<DocumentChunks>, BatchResult)> {
        let mut result = BatchResult {
            total_documents: documents.len(),
            ..Default::default()
        };
        let mut outputs = Vec::with_capacity(documents.len());

        info!(
            total_documents = result.total_documents,
            chunker = self.chunker.name(),
            "Starting batch processing"
        );

        let mut results = self.chunk_all(documents);
        while let Some((document_id, outcome)) = results.next().await {
            match outcome {
                Ok(chunks) => {
                    result.total_chunks += chunks.len();
                    result.processed_documents += 1;
                    outputs.push(DocumentChunks { document_id, chunks });
                }
                Err(e) => {
                    self.record_failure(&mut result, document_id, &e)?;
                }
            }
        }

        info!(
            processed = result.processed_documents,
            failed = result.failed_documents,
            chunks = result.total_chunks,
            "Batch processing complete"
        );

        Ok((outputs, result))
    }

    /// Process a batch, sending each document's chunks as soon as they are ready.
    pub async fn process_batch_streaming(
        &self,
        documents: Vec<Document>,
        sender: mpsc::Sender<DocumentChunks>,
    ) -> Result<BatchResult> {
        let mut result = BatchResult {
            total_documents: documents.len(),
            ..Default::default()
        };

        let mut results = self.chunk_all(documents);
        while let Some((document_id, outcome)) = results.next().await {
            match outcome {
                Ok(chunks) => {
                    result.total_chunks += chunks.len();
                    result.processed_documents += 1;

                    if sender.send(DocumentChunks { document_id, chunks }).await.is_err() {
                        warn!("Receiver dropped, stopping batch processing");
                        break;
                    }
                }
                Err(e) => {
                    self.record_failure(&mut result, document_id, &e)?;
                }
            }
        }

        Ok(result)
    }

    /// Chunk every document, at most `concurrency` at a time, in input order.
    fn chunk_all(
        &self,
        documents: Vec<Document>,
    ) -> impl futures::Stream<Item = (Uuid, Result<Vec<Chunk>>)> + '_ {
        let concurrency = self.config.concurrency.max(1);

        stream::iter(documents)
            .map(move |document| {
                let chunker = Arc::clone(&self.chunker);
                async move {
                    let document_id = document.id;
                    debug!(%document_id, chars = document.text.len(), "Chunking document");

                    let outcome = tokio::task::spawn_blocking(move || {
                        chunker
                            .chunk(&document.text, &document.chunk_metadata())
                            .map_err(anyhow::Error::from)
                    })
                    .await
                    .context("chunking task panicked")
                    .and_then(|outcome| outcome);

                    (document_id, outcome)
                }
            })
            .buffered(concurrency)
    }

    fn record_failure(
        &self,
        result: &mut BatchResult,
        document_id: Uuid,
        error: &anyhow::Error,
    ) -> Result<()> {
        result.failed_documents += 1;
        result.errors.push(BatchError {
            document_id,
            error: error.to_string(),
        });

        if !self.config.continue_on_error {
            anyhow::bail!("failed to chunk document {document_id}: {error}");
        }

        warn!(%document_id, error = %error, "Failed to chunk document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunkers::{HybridChunker, WhitespaceTokenizer};
    use crate::error::ChunkerError;
    use crate::types::ChunkerConfig;
    use serde_json::{json, Map, Value};

    fn processor(continue_on_error: bool) -> BatchProcessor {
        let chunker = HybridChunker::new(
            ChunkerConfig::with_max_tokens(5).with_overlap(0.0),
            Arc::new(WhitespaceTokenizer::new()),
        )
        .unwrap();
        BatchProcessor::new(
            Arc::new(chunker),
            BatchConfig {
                concurrency: 2,
                continue_on_error,
            },
        )
    }

    /// Fails on any text containing "poison".
    struct PickyChunker;

    impl Chunker for PickyChunker {
        fn name(&self) -> &'static str {
            "picky"
        }

        fn chunk(
            &self,
            text: &str,
            _metadata: &Map<String, Value>,
        ) -> std::result::Result<Vec<Chunk>, ChunkerError> {
            if text.contains("poison") {
                Err(ChunkerError::Tokenizer(anyhow::anyhow!("cannot tokenize")))
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_metadata() {
        let documents = vec![
            Document::new("one two three\n\nfour five six").with_metadata("source", "a.txt"),
            Document::new("seven"),
            Document::new(""),
        ];
        let ids: Vec<_> = documents.iter().map(|d| d.id).collect();

        let (outputs, result) = processor(true).process_batch(documents).await.unwrap();

        assert_eq!(outputs.iter().map(|o| o.document_id).collect::<Vec<_>>(), ids);
        assert_eq!(outputs[0].chunks.len(), 2);
        assert_eq!(outputs[1].chunks.len(), 1);
        assert!(outputs[2].chunks.is_empty());
        assert_eq!(result.total_documents, 3);
        assert_eq!(result.processed_documents, 3);
        assert_eq!(result.total_chunks, 3);

        let metadata = &outputs[0].chunks[1].metadata;
        assert_eq!(metadata.get("source"), Some(&json!("a.txt")));
        assert_eq!(metadata.get("document_id"), Some(&json!(ids[0].to_string())));
    }

    #[tokio::test]
    async fn test_batch_continues_on_error() {
        let processor = BatchProcessor::new(Arc::new(PickyChunker), BatchConfig::default());
        let bad = Document::new("poison");
        let bad_id = bad.id;

        let (outputs, result) = processor
            .process_batch(vec![Document::new("fine"), bad, Document::new("also fine")])
            .await
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(result.failed_documents, 1);
        assert_eq!(result.errors[0].document_id, bad_id);
        assert_eq!(result.errors[0].error, "cannot tokenize");
    }

    #[tokio::test]
    async fn test_batch_stops_on_error() {
        let processor = BatchProcessor::new(
            Arc::new(PickyChunker),
            BatchConfig {
                concurrency: 1,
                continue_on_error: false,
            },
        );

        let err = processor
            .process_batch(vec![Document::new("poison"), Document::new("fine")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot tokenize"));
    }

    #[tokio::test]
    async fn test_streaming() {
        let (sender, mut receiver) = mpsc::channel(4);
        let documents = vec![Document::new("a b c.\n\nd e f g."), Document::new("h i")];

        let result = processor(true)
            .process_batch_streaming(documents, sender)
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Some(output) = receiver.recv().await {
            received.push(output.chunks.len());
        }
        assert_eq!(received, vec![2, 1]);
        assert_eq!(result.total_chunks, 3);
    }
}
