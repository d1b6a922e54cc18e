//! LLM-judged reranking of candidate chunks.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::result::RetrievedResult;
use crate::llm::{ChatMessage, CompletionProvider, ResponseFormat};
use crate::retry::RetryPolicy;

const RERANK_SYSTEM_PROMPT: &str = "You are a Senior Sustainability Auditor. Rank document chunks \
based on their ability to provide a FACTUAL and QUANTITATIVE answer.\n\
Priority Criteria:\n\
1. Chunks with specific metrics, tables, or financial figures.\n\
2. Chunks explicitly referencing SEBI BRSR Principles.\n\
3. Chunks with specific policy names or web links.\n\
Ignore boilerplate legal disclaimers. Respond with a JSON object of the form \
{\"order\": [chunk ids from most relevant to least relevant]}.";

/// Ranking returned by the model: 1-based chunk ids, most relevant first.
#[derive(Debug, Deserialize)]
struct RankOrder {
    order: Vec<i64>,
}

/// Re-orders candidates by LLM judgment of factual/quantitative relevance.
///
/// Reranking is a pure enhancement: ids outside the candidate range and
/// duplicate ids are dropped, and on any failure (provider error after
/// retries, unparseable payload) the candidates come back in their original
/// order. Output is never longer than input.
pub struct Reranker {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    retry: RetryPolicy,
}

impl Reranker {
    pub fn new(provider: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn rerank(
        &self,
        question: &str,
        candidates: Vec<RetrievedResult>,
    ) -> Vec<RetrievedResult> {
        if candidates.is_empty() {
            return candidates;
        }

        let messages = [
            ChatMessage::system(RERANK_SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(question, &candidates)),
        ];
        let messages_ref = &messages[..];

        let outcome = self
            .retry
            .run("rerank", || async move {
                self.provider
                    .complete(&self.model, messages_ref, ResponseFormat::JsonObject)
                    .await
            })
            .await;

        let payload = match outcome {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "reranking failed, keeping original order");
                return candidates;
            }
        };

        match serde_json::from_str::<RankOrder>(&payload) {
            Ok(ranking) => apply_order(candidates, &ranking.order),
            Err(err) => {
                warn!(error = %err, "rerank payload was not a valid ranking, keeping original order");
                candidates
            }
        }
    }
}

fn build_user_prompt(question: &str, candidates: &[RetrievedResult]) -> String {
    let mut prompt = format!("Target Question: {question}\n\n");
    for (idx, chunk) in candidates.iter().enumerate() {
        let section = chunk.principle().unwrap_or("Unknown Section");
        prompt.push_str(&format!(
            "# CHUNK ID {} (Section: {section}):\n{}\n\n",
            idx + 1,
            chunk.page_content
        ));
    }
    prompt
}

/// Applies a 1-based id ordering, silently dropping hallucinated ids
/// (out of range or repeated).
fn apply_order(candidates: Vec<RetrievedResult>, order: &[i64]) -> Vec<RetrievedResult> {
    let len = candidates.len() as i64;
    let mut seen = HashSet::new();
    let valid: Vec<usize> = order
        .iter()
        .filter(|&&id| id >= 1 && id <= len && seen.insert(id))
        .map(|&id| (id - 1) as usize)
        .collect();

    let dropped = order.len() - valid.len();
    if dropped > 0 {
        debug!(dropped, "discarded invalid rerank ids");
    }

    let mut slots: Vec<Option<RetrievedResult>> = candidates.into_iter().map(Some).collect();
    valid.into_iter().filter_map(|idx| slots[idx].take()).collect()
}
