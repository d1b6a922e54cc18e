//! Embedding providers.
//!
//! The pipeline consumes embeddings through the [`EmbeddingProvider`] trait so
//! the retrieval engine, ingestion pipeline, and security gate never depend on
//! a concrete vendor. Two implementations ship with the crate:
//!
//! * [`HttpEmbeddingProvider`] — OpenAI-compatible `/embeddings` endpoint.
//! * [`MockEmbeddingProvider`] — deterministic hash-based vectors for tests
//!   and offline demos.
//!
//! [`ProviderEmbeddingModel`] bridges any provider into rig's
//! `EmbeddingModel` so the SQLite vector store can be opened against it.

use std::sync::Arc;

use async_trait::async_trait;
use rig::embeddings::embedding::{Embedding, EmbeddingError, EmbeddingModel};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::RagError;

/// Batch ceiling for remote embedding calls; keeps request payloads under
/// upstream token limits.
pub const EMBED_BATCH_SIZE: usize = 100;

/// A service that turns text into fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier (usually the model name) for logs.
    fn id(&self) -> &str;

    /// Dimensionality of the produced vectors.
    fn dimensions(&self) -> usize;

    /// Embeds a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embeds a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("provider returned no vector".into()))
    }
}

/// Cosine similarity between two vectors; 0.0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

// ── HTTP provider ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Calls an OpenAI-compatible `/embeddings` endpoint over HTTPS.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl HttpEmbeddingProvider {
    /// Creates a provider for `model` served at `endpoint` (the full
    /// `/embeddings` URL).
    pub fn new(
        endpoint: Url,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .user_agent("brsr-rag/0.1")
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(format!("malformed embedding response: {err}")))?;
        if payload.data.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                payload.data.len()
            )));
        }
        Ok(payload.data.into_iter().map(|d| d.embedding).collect())
    }
}

// ── Mock provider ──────────────────────────────────────────────────────

/// Deterministic embedding provider for tests and offline runs.
///
/// Vectors are derived from a hash of the input text: identical texts map to
/// identical vectors and distinct texts almost always differ.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 8 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_to_vec(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        (0..self.dimensions)
            .map(|i| {
                let bits = seed.rotate_left((i as u32 % 64) * 8) ^ ((i as u64) << 24);
                (bits as f32) / u32::MAX as f32
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn id(&self) -> &str {
        "mock-embedding"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.hash_to_vec(text)).collect())
    }
}

// ── Rig bridge ─────────────────────────────────────────────────────────

/// Adapts an [`EmbeddingProvider`] to rig's `EmbeddingModel` so the SQLite
/// vector store can embed documents through it.
#[derive(Clone)]
pub struct ProviderEmbeddingModel {
    provider: Arc<dyn EmbeddingProvider>,
}

impl ProviderEmbeddingModel {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

impl EmbeddingModel for ProviderEmbeddingModel {
    const MAX_DOCUMENTS: usize = EMBED_BATCH_SIZE;

    fn ndims(&self) -> usize {
        self.provider.dimensions()
    }

    fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> impl std::future::Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send {
        let provider = self.provider.clone();
        let docs: Vec<String> = texts.into_iter().collect();
        async move {
            let vectors = provider
                .embed_batch(&docs)
                .await
                .map_err(|err| EmbeddingError::ProviderError(err.to_string()))?;
            Ok(docs
                .into_iter()
                .zip(vectors)
                .map(|(document, vec)| Embedding {
                    document,
                    vec: vec.into_iter().map(f64::from).collect(),
                })
                .collect())
        }
    }
}
