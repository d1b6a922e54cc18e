use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::chunking::{self, ChunkKind};
use crate::embeddings::{EMBED_BATCH_SIZE, EmbeddingProvider};
use crate::retry::RetryPolicy;
use crate::stores::{ChunkStore, StoredChunk};
use crate::types::RagError;

/// Tuning knobs for the ingestion write path.
#[derive(Debug, Clone)]
pub struct IngestionOptions {
    /// Chunk bodies embedded per remote call.
    pub batch_size: usize,
    /// Fixed delay between consecutive embedding batches; avoids rate-limit
    /// collisions with the upstream provider.
    pub pacing_delay: Duration,
    /// When set, the chunk debug export is written here before embedding.
    pub export_path: Option<PathBuf>,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            batch_size: EMBED_BATCH_SIZE,
            pacing_delay: Duration::from_millis(1500),
            export_path: None,
        }
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub job_id: Uuid,
    pub source_document: String,
    pub chunks_total: usize,
    pub table_chunks: usize,
    pub narrative_chunks: usize,
    pub embedding_batches: usize,
}

/// Chunks a document and writes embedded chunks to the store.
///
/// Re-ingesting a source document replaces its previous chunks. Embedding
/// batches are sent one at a time with a fixed inter-batch delay.
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn ChunkStore>,
    options: IngestionOptions,
    retry: RetryPolicy,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn ChunkStore>) -> Self {
        Self {
            embedder,
            store,
            options: IngestionOptions::default(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: IngestionOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the full write path for one document.
    pub async fn ingest_document(
        &self,
        raw_text: &str,
        source_document: &str,
    ) -> Result<IngestReport, RagError> {
        let job_id = Uuid::new_v4();
        let chunks = chunking::chunk_document(raw_text, source_document)?;
        info!(
            %job_id,
            source = source_document,
            chunks = chunks.len(),
            "document chunked"
        );

        if let Some(path) = &self.options.export_path {
            chunking::write_chunk_export(path, &chunks).await?;
            debug!(%job_id, path = %path.display(), "chunk export written");
        }

        let replaced = self.store.delete_chunks_by_source(source_document).await?;
        if replaced > 0 {
            info!(%job_id, replaced, "replacing previously ingested chunks");
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.body.clone()).collect();
        let batch_size = self.options.batch_size.max(1);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        let mut embedding_batches = 0usize;

        for batch in texts.chunks(batch_size) {
            if embedding_batches > 0 && !self.options.pacing_delay.is_zero() {
                tokio::time::sleep(self.options.pacing_delay).await;
            }
            let embedded = self
                .retry
                .run("embed_batch", || async move {
                    self.embedder.embed_batch(batch).await
                })
                .await?;
            if embedded.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "embedding batch returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
            embedding_batches += 1;
            debug!(%job_id, batch = embedding_batches, "embedded batch");
        }

        let table_chunks = chunks.iter().filter(|c| c.kind == ChunkKind::Table).count();
        let narrative_chunks = chunks.len() - table_chunks;

        let stored: Vec<StoredChunk> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| StoredChunk::from_chunk(chunk).with_embedding(vector))
            .collect();
        let chunks_total = stored.len();
        self.store.insert_chunks(stored).await?;

        info!(
            %job_id,
            source = source_document,
            chunks = chunks_total,
            batches = embedding_batches,
            "ingestion complete"
        );

        Ok(IngestReport {
            job_id,
            source_document: source_document.to_string(),
            chunks_total,
            table_chunks,
            narrative_chunks,
            embedding_batches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        inserted: Mutex<Vec<StoredChunk>>,
        deleted_sources: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChunkStore for RecordingStore {
        async fn insert_chunks(&self, chunks: Vec<StoredChunk>) -> Result<(), RagError> {
            self.inserted.lock().unwrap().extend(chunks);
            Ok(())
        }

        async fn get_chunks_by_source(&self, source: &str) -> Result<Vec<StoredChunk>, RagError> {
            Ok(self
                .inserted
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.source == source)
                .cloned()
                .collect())
        }

        async fn delete_chunks_by_source(&self, source: &str) -> Result<usize, RagError> {
            self.deleted_sources.lock().unwrap().push(source.to_string());
            Ok(0)
        }

        async fn count(&self) -> Result<usize, RagError> {
            Ok(self.inserted.lock().unwrap().len())
        }
    }

    fn sample_text() -> String {
        let mut lines = vec!["Opening narrative about the reporting entity.".to_string()];
        for i in 0..40 {
            lines.push(format!("Disclosure line {i} describing governance practices."));
        }
        lines.join("\n")
    }

    #[tokio::test]
    async fn ingests_chunks_with_embeddings() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = IngestionPipeline::new(
            Arc::new(MockEmbeddingProvider::new()),
            store.clone(),
        )
        .with_options(IngestionOptions {
            batch_size: 2,
            pacing_delay: Duration::ZERO,
            export_path: None,
        });

        let report = pipeline
            .ingest_document(&sample_text(), "report.pdf")
            .await
            .unwrap();

        assert!(report.chunks_total > 0);
        assert_eq!(
            report.chunks_total,
            report.table_chunks + report.narrative_chunks
        );
        assert!(report.embedding_batches >= 1);

        let inserted = store.inserted.lock().unwrap();
        assert_eq!(inserted.len(), report.chunks_total);
        assert!(inserted.iter().all(|c| c.embedding.is_some()));
        assert_eq!(store.deleted_sources.lock().unwrap()[..], ["report.pdf"]);
    }

    #[tokio::test]
    async fn batches_follow_configured_size() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = IngestionPipeline::new(
            Arc::new(MockEmbeddingProvider::new()),
            store,
        )
        .with_options(IngestionOptions {
            batch_size: 1,
            pacing_delay: Duration::ZERO,
            export_path: None,
        });

        let report = pipeline
            .ingest_document(&sample_text(), "report.pdf")
            .await
            .unwrap();
        assert_eq!(report.embedding_batches, report.chunks_total);
    }

    #[tokio::test]
    async fn empty_document_fails_before_touching_the_store() {
        let store = Arc::new(RecordingStore::default());
        let pipeline =
            IngestionPipeline::new(Arc::new(MockEmbeddingProvider::new()), store.clone());

        let result = pipeline.ingest_document("   ", "empty.pdf").await;
        assert!(matches!(result, Err(RagError::Extraction(_))));
        assert!(store.deleted_sources.lock().unwrap().is_empty());
    }
}
