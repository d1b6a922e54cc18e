//! Retrieval orchestration.

use std::time::Duration;

use tracing::info;

use super::engine::VectorRetriever;
use super::merge::merge_results;
use super::rerank::Reranker;
use super::result::RetrievedResult;
use super::rewrite::QueryRewriter;
use crate::config::RetrievalConfig;
use crate::llm::ChatMessage;
use crate::types::RagError;

/// Expanded-query display value when query processing is disabled.
pub const NO_EXPANSION_PLACEHOLDER: &str = "N/A (original query only)";

/// Composes query expansion, dual retrieval, merging, reranking, and
/// truncation, driven by a [`RetrievalConfig`].
///
/// The pipeline wraps a base [`VectorRetriever`] rather than extending it:
/// each stage can be exercised, replaced, or disabled independently. Per-call
/// state is local, so one pipeline value can serve concurrent callers.
pub struct RetrievalPipeline {
    retriever: VectorRetriever,
    rewriter: QueryRewriter,
    reranker: Reranker,
    config: RetrievalConfig,
}

impl RetrievalPipeline {
    pub fn new(
        retriever: VectorRetriever,
        rewriter: QueryRewriter,
        reranker: Reranker,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            retriever,
            rewriter,
            reranker,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Runs the full pipeline for `question`.
    ///
    /// Returns the ranked context (at most `final_k` results) together with
    /// the expanded query, or [`NO_EXPANSION_PLACEHOLDER`] when query
    /// processing is disabled. The original question is always searched
    /// first, so merged ranking is biased toward it.
    pub async fn retrieve(
        &self,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<(Vec<RetrievedResult>, String), RagError> {
        let mut target_queries = vec![question.to_string()];
        let mut expanded_display = NO_EXPANSION_PLACEHOLDER.to_string();

        if self.config.pipeline_logic.process_query {
            let rewritten = self.rewriter.rewrite(question, history).await;
            info!(rewritten = %rewritten, "query processed");
            expanded_display = rewritten.clone();
            target_queries.push(rewritten);
        }

        let mut candidates: Vec<RetrievedResult> = Vec::new();
        for query in &target_queries {
            let results = self
                .retriever
                .fetch_unranked(query, self.config.retrieval.initial_k)
                .await
                .map_err(|err| RagError::Retrieval {
                    stage: "vector search",
                    message: err.to_string(),
                })?;
            candidates = merge_results(candidates, results);
        }

        let final_k = self.config.retrieval.final_k;
        let results = if self.config.pipeline_logic.use_reranking {
            info!(candidates = candidates.len(), "reranking candidates");
            let mut ranked = self.reranker.rerank(question, candidates).await;
            ranked.truncate(final_k);
            ranked
        } else {
            candidates.truncate(final_k);
            candidates
        };

        Ok((results, expanded_display))
    }

    /// Runs [`Self::retrieve`] under a deadline.
    ///
    /// On expiry the in-flight pipeline is aborted and a timeout error is
    /// surfaced; partial results are never returned.
    pub async fn retrieve_with_deadline(
        &self,
        question: &str,
        history: &[ChatMessage],
        deadline: Duration,
    ) -> Result<(Vec<RetrievedResult>, String), RagError> {
        match tokio::time::timeout(deadline, self.retrieve(question, history)).await {
            Ok(result) => result,
            Err(_) => Err(RagError::DeadlineExceeded(deadline)),
        }
    }
}
