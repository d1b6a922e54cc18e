//! Two-layer query screening.
//!
//! The gate is an explicitly constructed service: callers build one with a
//! blacklist and an embedding provider and pass it where it is needed. There
//! is no process-wide instance.
//!
//! Layer 1 is a deterministic Aho-Corasick scan over the blacklist; layer 2
//! compares the query embedding against precomputed blacklist embeddings by
//! cosine similarity.

use std::sync::Arc;

use aho_corasick::AhoCorasick;
use tracing::info;

use crate::embeddings::{EmbeddingProvider, cosine_similarity};
use crate::types::RagError;

/// Default cosine-similarity threshold for the semantic layer.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Outcome of screening one query.
#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    Clean,
    Flagged { reason: String },
}

impl GateVerdict {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged { .. })
    }
}

/// Screens incoming queries against a blacklist before they reach the
/// retrieval pipeline.
pub struct SecurityGate {
    automaton: AhoCorasick,
    blacklist: Vec<String>,
    blacklist_embeddings: Vec<Vec<f32>>,
    threshold: f32,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SecurityGate {
    /// Builds the gate, compiling the automaton and embedding the blacklist
    /// once up front.
    pub async fn build(
        blacklist: Vec<String>,
        threshold: f32,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, RagError> {
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&blacklist)
            .map_err(|err| RagError::Gate(format!("failed to compile blacklist: {err}")))?;

        let blacklist_embeddings = if blacklist.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&blacklist).await?
        };

        info!(
            terms = blacklist.len(),
            threshold, "security gate initialized"
        );

        Ok(Self {
            automaton,
            blacklist,
            blacklist_embeddings,
            threshold,
            embedder,
        })
    }

    /// Screens `text` through both layers.
    ///
    /// The deterministic layer never errors; an embedding failure in the
    /// semantic layer propagates, since the gate cannot vouch for a query it
    /// could not screen.
    pub async fn screen(&self, text: &str) -> Result<GateVerdict, RagError> {
        if let Some(found) = self.automaton.find(text) {
            let term = &self.blacklist[found.pattern().as_usize()];
            return Ok(GateVerdict::Flagged {
                reason: format!("deterministic match: {term}"),
            });
        }

        if self.blacklist_embeddings.is_empty() {
            return Ok(GateVerdict::Clean);
        }

        let query = self.embedder.embed_one(text).await?;
        let best = self
            .blacklist_embeddings
            .iter()
            .map(|candidate| cosine_similarity(&query, candidate))
            .fold(f32::MIN, f32::max);

        if best > self.threshold {
            Ok(GateVerdict::Flagged {
                reason: format!("semantic match (score: {best:.2})"),
            })
        } else {
            Ok(GateVerdict::Clean)
        }
    }
}
