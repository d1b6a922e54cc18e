//! Typed retrieval configuration.
//!
//! The pipeline is driven by a YAML file with four sections:
//!
//! ```yaml
//! pipeline_logic:
//!   process_query: true
//!   use_reranking: true
//! retrieval:
//!   initial_k: 20
//!   final_k: 10
//! models:
//!   query_expansion_model: gpt-4.1-nano
//!   reranking_model: gpt-4.1-mini
//! vectorstore:
//!   collection_name: brsr_reports
//!   embedding_model: text-embedding-3-small
//! ```
//!
//! Every field is required; missing keys fail at parse time and value
//! constraints fail in [`RetrievalConfig::validate`]. The config is loaded
//! once at engine construction and never mutated afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the YAML payload.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field carried a value outside its allowed range.
    #[error("invalid config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Feature toggles for the retrieval pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineLogic {
    /// Rewrite the question and search both phrasings (dual retrieval).
    pub process_query: bool,
    /// Re-order merged candidates by LLM judgment before truncation.
    pub use_reranking: bool,
}

/// Candidate pool sizes before and after reranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalLimits {
    /// Nearest-neighbour count requested per query variant.
    pub initial_k: usize,
    /// Result count returned to the caller after merge/rerank.
    pub final_k: usize,
}

/// Model identifiers for the LLM-backed stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSelection {
    pub query_expansion_model: String,
    pub reranking_model: String,
}

/// Vector store addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorstoreConfig {
    pub collection_name: String,
    pub embedding_model: String,
}

/// Declarative settings consumed by the retrieval orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub pipeline_logic: PipelineLogic,
    pub retrieval: RetrievalLimits,
    pub models: ModelSelection,
    pub vectorstore: VectorstoreConfig,
}

impl RetrievalConfig {
    /// Loads and validates a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parses and validates a configuration from a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.initial_k == 0 {
            return Err(ConfigError::Invalid {
                field: "retrieval.initial_k",
                message: "must be at least 1".into(),
            });
        }
        if self.retrieval.final_k == 0 {
            return Err(ConfigError::Invalid {
                field: "retrieval.final_k",
                message: "must be at least 1".into(),
            });
        }
        if self.models.query_expansion_model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "models.query_expansion_model",
                message: "must not be empty".into(),
            });
        }
        if self.models.reranking_model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "models.reranking_model",
                message: "must not be empty".into(),
            });
        }
        if self.vectorstore.collection_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "vectorstore.collection_name",
                message: "must not be empty".into(),
            });
        }
        if self.vectorstore.embedding_model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "vectorstore.embedding_model",
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }
}
