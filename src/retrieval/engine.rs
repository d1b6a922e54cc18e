//! Base vector retrieval: embed the query, search the index, zip results.

use std::sync::Arc;

use tracing::debug;

use super::result::RetrievedResult;
use crate::embeddings::EmbeddingProvider;
use crate::retry::RetryPolicy;
use crate::stores::VectorIndex;
use crate::types::RagError;

/// Raw nearest-neighbour search against a vector index.
///
/// This stage fails loudly: embedding or index errors propagate after the
/// retry budget, because it is the only source of candidates. An empty hit
/// list is a valid, non-error result.
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    retry: RetryPolicy,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Embeds `query` and returns up to `n_results` passages in the index's
    /// relevance order.
    pub async fn fetch_unranked(
        &self,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<RetrievedResult>, RagError> {
        let vector = self
            .retry
            .run("embed_query", || async move {
                self.embedder.embed_one(query).await
            })
            .await?;

        let vector_ref = vector.as_slice();
        let hits = self
            .retry
            .run("index_query", || async move {
                self.index.query(vector_ref, n_results).await
            })
            .await?;

        debug!(query, hits = hits.len(), "vector search complete");
        Ok(hits
            .into_iter()
            .map(|hit| RetrievedResult::new(hit.content, hit.metadata))
            .collect())
    }
}
