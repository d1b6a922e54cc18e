//! Storage backends for embedded disclosure chunks.
//!
//! Two narrow interfaces keep the pipelines decoupled from any concrete
//! database:
//!
//! * [`VectorIndex`] — the read side the retrieval engine depends on:
//!   nearest-neighbour query by embedding vector, plus a bulk dump for
//!   visualization collaborators.
//! * [`ChunkStore`] — the write/maintenance side the ingestion pipeline
//!   depends on: insert, lookup, delete by source document, count.
//!
//! [`sqlite::SqliteChunkStore`] implements both over SQLite with vector
//! search via `sqlite-vec`.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chunking::Chunk;
use crate::types::RagError;

pub use sqlite::{ChunkDocument, SqliteChunkStore, collection_path};

/// A record representing a chunk with its embedding, ready for storage.
///
/// Backend-agnostic counterpart of the per-backend document types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique identifier within the source document.
    pub id: String,
    /// Originating file.
    pub source: String,
    /// `"table"` or `"narrative"`.
    pub kind: String,
    /// 1-based page of origin.
    pub page: u32,
    /// Section/principle context.
    pub section: String,
    /// Context-prefixed chunk text.
    pub content: String,
    /// Metadata persisted next to the content.
    pub metadata: serde_json::Value,
    /// The embedding vector, when computed.
    pub embedding: Option<Vec<f32>>,
}

impl StoredChunk {
    /// Builds a storage record from a chunk, without an embedding.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            id: chunk.id.clone(),
            source: chunk.source_document.clone(),
            kind: chunk.kind.to_string(),
            page: chunk.page_number,
            section: chunk.section_context.clone(),
            content: chunk.body.clone(),
            metadata: chunk.metadata(),
            embedding: None,
        }
    }

    /// Attaches the embedding vector.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// One nearest-neighbour hit, in the index's relevance order.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub content: String,
    pub metadata: serde_json::Value,
    /// Cosine distance to the query vector (smaller is closer).
    pub distance: f32,
}

/// Bulk dump of the index, aligned by position.
#[derive(Debug, Clone, Default)]
pub struct IndexDump {
    pub documents: Vec<String>,
    pub metadatas: Vec<serde_json::Value>,
    pub embeddings: Vec<Vec<f32>>,
}

/// Read-side interface consumed by the retrieval engine.
///
/// The engine never mutates the index; writes belong to ingestion.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest-neighbour query, most similar first.
    async fn query(&self, embedding: &[f32], n_results: usize) -> Result<Vec<IndexHit>, RagError>;

    /// Exports every document with its metadata and embedding.
    async fn export_all(&self) -> Result<IndexDump, RagError>;
}

/// Write/maintenance interface consumed by the ingestion pipeline.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Inserts chunk records; records without embeddings are skipped.
    async fn insert_chunks(&self, chunks: Vec<StoredChunk>) -> Result<(), RagError>;

    /// All chunks originating from the given source document.
    async fn get_chunks_by_source(&self, source: &str) -> Result<Vec<StoredChunk>, RagError>;

    /// Removes all chunks for a source document, returning the count removed.
    async fn delete_chunks_by_source(&self, source: &str) -> Result<usize, RagError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, RagError>;
}
