//! Ephemeral retrieval results.

use serde::{Deserialize, Serialize};

/// A retrieved passage with its provenance metadata.
///
/// Constructed per query and never persisted; metadata carries at minimum
/// `page`, `principle`, `type`, and `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedResult {
    pub page_content: String,
    pub metadata: serde_json::Value,
}

impl RetrievedResult {
    pub fn new(page_content: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }

    pub fn page(&self) -> Option<i64> {
        self.metadata.get("page").and_then(serde_json::Value::as_i64)
    }

    pub fn principle(&self) -> Option<&str> {
        self.metadata
            .get("principle")
            .and_then(serde_json::Value::as_str)
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata
            .get("source")
            .and_then(serde_json::Value::as_str)
    }

    /// Exact content+location identity used for dual-retrieval dedup: the
    /// same physical passage retrieved by two query phrasings compares equal,
    /// semantically similar passages do not.
    pub(crate) fn dedup_key(&self) -> (String, Option<i64>, Option<String>) {
        (
            self.page_content.trim().to_string(),
            self.page(),
            self.source().map(str::to_string),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_read_metadata() {
        let result = RetrievedResult::new(
            "body",
            json!({"page": 4, "principle": "Principle 6: Environmental Protection", "source": "r.pdf"}),
        );
        assert_eq!(result.page(), Some(4));
        assert_eq!(result.source(), Some("r.pdf"));
        assert!(result.principle().unwrap().starts_with("Principle 6"));
    }

    #[test]
    fn dedup_key_trims_content_and_ignores_extra_metadata() {
        let a = RetrievedResult::new("  text  ", json!({"page": 1, "source": "r.pdf", "type": "table"}));
        let b = RetrievedResult::new("text", json!({"page": 1, "source": "r.pdf", "type": "narrative"}));
        assert_eq!(a.dedup_key(), b.dedup_key());

        let c = RetrievedResult::new("text", json!({"page": 2, "source": "r.pdf"}));
        assert_ne!(a.dedup_key(), c.dedup_key());
    }
}
