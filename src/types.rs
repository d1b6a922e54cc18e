//! Crate-wide error taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the chunking, ingestion, and retrieval pipelines.
///
/// Variants map to the failure domains of the system: extraction and chunking
/// errors are fatal to the current document, storage/embedding/completion
/// errors originate at the external-service boundaries, and
/// [`RagError::Retrieval`] wraps any unrecoverable failure inside a retrieval
/// call with the stage it came from.
#[derive(Debug, Error)]
pub enum RagError {
    /// The source document could not be turned into chunks.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Chunk post-processing (serialization, export) failed.
    #[error("chunking failed: {0}")]
    Chunking(String),

    /// The vector store rejected an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// The embedding provider failed or returned an unusable payload.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// The completion provider failed or returned an unusable payload.
    #[error("completion request failed: {0}")]
    Completion(String),

    /// The security gate could not be constructed or consulted.
    #[error("security gate error: {0}")]
    Gate(String),

    /// Unrecoverable failure inside a retrieval call, tagged with the stage
    /// that produced it.
    #[error("retrieval failed in {stage}: {message}")]
    Retrieval {
        stage: &'static str,
        message: String,
    },

    /// A deadline-bounded retrieval call did not finish in time.
    #[error("retrieval deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// A configuration file could not be loaded or validated.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("http error: {0}")]
    Http(String),
}

impl From<crate::config::ConfigError> for RagError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
