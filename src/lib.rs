//! ```text
//! Cleaned report text ──► chunking::chunk_document ──► Vec<Chunk>
//!                                   │
//!                                   ├─► chunking::export (debug/audit dump)
//!                                   ▼
//!              ingestion::IngestionPipeline ──► stores::SqliteChunkStore
//!                    (batched, paced embedding)        (rig-sqlite + sqlite-vec)
//!                                                        │
//! audit question ──► gate::SecurityGate ──► retrieval::RetrievalPipeline
//!                                            rewrite ► search ×N ► merge ► rerank
//!                                                        │
//!                                        (Vec<RetrievedResult>, expanded query)
//! ```
//!
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod gate;
pub mod ingestion;
pub mod llm;
pub mod retrieval;
pub mod retry;
pub mod stores;
pub mod types;

pub use chunking::{Chunk, ChunkKind, chunk_document};
pub use config::RetrievalConfig;
pub use embeddings::{EmbeddingProvider, MockEmbeddingProvider, ProviderEmbeddingModel};
pub use llm::{ChatMessage, CompletionProvider};
pub use retrieval::{
    QueryRewriter, Reranker, RetrievalPipeline, RetrievedResult, VectorRetriever,
};
pub use retry::RetryPolicy;
pub use types::RagError;
