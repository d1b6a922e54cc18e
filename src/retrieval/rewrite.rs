//! LLM-backed query rewriting.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionProvider, ResponseFormat};
use crate::retry::RetryPolicy;

const REWRITE_SYSTEM_PROMPT: &str = "You are an expert ESG auditor. Rewrite user questions into \
precise search queries for a BRSR (Business Responsibility and Sustainability Report). \
Expand technical terms (e.g., CSR, GHG, Scope 3) using BRSR and NGRBC-aligned language. \
Keep the query concise. Respond ONLY with the refined query.";

/// Rewrites audit questions into retrieval-optimized search phrasing.
///
/// Rewriting is best-effort: on any failure after retries the original
/// question is returned unmodified, so this stage can never block retrieval.
pub struct QueryRewriter {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    retry: RetryPolicy,
}

impl QueryRewriter {
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

    /// Returns the retrieval-optimized phrasing of `question`, or `question`
    /// itself when the upstream call fails.
    ///
    /// Conversation history is accepted for call-site compatibility but never
    /// forwarded to the model: retrieval stays intent-focused rather than
    /// drifting with the dialogue.
    pub async fn rewrite(&self, question: &str, _history: &[ChatMessage]) -> String {
        let messages = [
            ChatMessage::system(REWRITE_SYSTEM_PROMPT),
            ChatMessage::user(question),
        ];
        let messages_ref = &messages[..];

        let outcome = self
            .retry
            .run("rewrite_query", || async move {
                self.provider
                    .complete(&self.model, messages_ref, ResponseFormat::Text)
                    .await
            })
            .await;

        match outcome {
            Ok(rewritten) => {
                let rewritten = rewritten.trim();
                if rewritten.is_empty() {
                    debug!("query rewrite returned empty text, keeping original question");
                    question.to_string()
                } else {
                    rewritten.to_string()
                }
            }
            Err(err) => {
                warn!(error = %err, "query rewrite failed, falling back to original question");
                question.to_string()
            }
        }
    }
}
