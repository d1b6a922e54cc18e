//! Heuristic document chunking for disclosure reports.
//!
//! ```text
//! Cleaned page-tagged text ──► clean::clean_raw_text
//!                                     │
//!                        ┌────────────┴────────────┐
//!                        ▼                         ▼
//!              tables::extract_tables     narrative::extract_narrative
//!              (first, high precision,    (second, over unmasked lines,
//!               emits used-line mask)      overlap-windowed buffers)
//!                        │                         │
//!                        └────────────┬────────────┘
//!                                     ▼
//!                          ordered Vec<Chunk> (tables, then narrative)
//! ```
//!
//! Chunking is pure and deterministic: the same input text always produces
//! the same chunk sequence. Page provenance is tracked through `<<<`
//! page-break markers and section provenance through `PRINCIPLE <n>` headers
//! mapped to the nine BRSR principle names.
//!
//! Table regions are masked out before the narrative pass, so a source line
//! belongs to at most one table chunk and never to both a table and a
//! narrative chunk.

mod clean;
pub mod export;
mod narrative;
mod principles;
mod tables;

use serde::{Deserialize, Serialize};

use crate::types::RagError;

pub use clean::clean_raw_text;
pub use export::write_chunk_export;
pub use principles::{GENERAL_SECTION, principle_context};

/// Whether a chunk captures tabular or narrative content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Table,
    Narrative,
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Narrative => write!(f, "narrative"),
        }
    }
}

/// The atomic retrievable unit: a span of document text with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `table_<n>` or `narrative_<n>`, unique within a document.
    pub id: String,
    pub kind: ChunkKind,
    /// 1-based page of origin.
    pub page_number: u32,
    /// Enclosing regulatory section; [`GENERAL_SECTION`] until a principle
    /// header is observed.
    pub section_context: String,
    /// Chunk text prefixed with a rendered context header, so the body alone
    /// is self-describing for downstream LLM consumption.
    pub body: String,
    /// Identifier of the originating file.
    pub source_document: String,
}

impl Chunk {
    pub(crate) fn new(
        kind: ChunkKind,
        index: usize,
        page_number: u32,
        section_context: &str,
        text: &str,
        source_document: &str,
    ) -> Self {
        Self {
            id: format!("{kind}_{index}"),
            kind,
            page_number,
            section_context: section_context.to_string(),
            body: format!("[CONTEXT | PAGE: {page_number} | {section_context}]\n\n{text}"),
            source_document: source_document.to_string(),
        }
    }

    /// Metadata persisted alongside the body in the vector store.
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.kind.to_string(),
            "page": self.page_number,
            "principle": self.section_context,
            "source": self.source_document,
        })
    }
}

/// Splits a cleaned, page-tagged document into provenance-tagged chunks.
///
/// Runs the high-precision table pass first, then the narrative pass over the
/// remaining (unmasked) lines. Chunking is all-or-nothing per document: a
/// document that is empty after cleaning is an extraction error, and no
/// partial chunk set is ever returned.
pub fn chunk_document(raw_text: &str, source_document: &str) -> Result<Vec<Chunk>, RagError> {
    let cleaned = clean::clean_raw_text(raw_text);
    if cleaned.is_empty() {
        return Err(RagError::Extraction(format!(
            "document '{source_document}' has no content after cleaning"
        )));
    }
    let lines: Vec<&str> = cleaned.lines().collect();

    let (mut chunks, used) = tables::extract_tables(&lines, source_document);
    let narrative = narrative::extract_narrative(&lines, &used, source_document);
    chunks.extend(narrative);
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> String {
        [
            "--- METADATA START ---",
            "{\"source_file\": \"report.pdf\"}",
            "--- METADATA END ---",
            "Business Responsibility and Sustainability Report",
            "The company discloses its performance for the financial year.",
            "This opening narrative describes the reporting boundary and the",
            "entities included in the consolidated disclosures.",
            "<<< page break >>>",
            "PRINCIPLE 3",
            "Category               Male       Female",
            "Total employees         120           45",
            "Permanent workers        80           30",
            "Other than permanent     40           15",
            "Note: headcount as on 31 March 2024.",
            "The company runs wellbeing programmes for all employees and",
            "their families across every operating location.",
            "============================================",
        ]
        .join("\n")
    }

    #[test]
    fn chunks_cover_tables_and_narrative() {
        let chunks = chunk_document(&sample_report(), "report.pdf").unwrap();
        let tables: Vec<_> = chunks.iter().filter(|c| c.kind == ChunkKind::Table).collect();
        let narrative: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Narrative)
            .collect();
        assert_eq!(tables.len(), 1, "expected one table chunk: {chunks:#?}");
        assert!(!narrative.is_empty());
        assert!(tables[0].body.contains("Total employees"));
    }

    #[test]
    fn table_lines_are_not_recaptured_as_narrative() {
        let chunks = chunk_document(&sample_report(), "report.pdf").unwrap();
        for chunk in chunks.iter().filter(|c| c.kind == ChunkKind::Narrative) {
            assert!(
                !chunk.body.contains("Total employees"),
                "table content leaked into narrative: {}",
                chunk.body
            );
        }
    }

    #[test]
    fn every_nonblank_line_is_covered() {
        let text = sample_report();
        let chunks = chunk_document(&text, "report.pdf").unwrap();
        let cleaned = clean_raw_text(&text);
        for line in cleaned.lines().map(str::trim).filter(|l| !l.is_empty()) {
            assert!(
                chunks.iter().any(|c| c.body.contains(line)),
                "line not covered by any chunk: {line}"
            );
        }
    }

    #[test]
    fn ids_are_stable_and_sequential() {
        let chunks = chunk_document(&sample_report(), "report.pdf").unwrap();
        let table_ids: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Table)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(table_ids, ["table_0"]);
        let narrative_ids: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Narrative)
            .map(|c| c.id.as_str())
            .collect();
        for (i, id) in narrative_ids.iter().enumerate() {
            assert_eq!(*id, format!("narrative_{i}"));
        }
    }

    #[test]
    fn page_numbers_are_monotonic_per_pass() {
        let chunks = chunk_document(&sample_report(), "report.pdf").unwrap();
        for kind in [ChunkKind::Table, ChunkKind::Narrative] {
            let pages: Vec<u32> = chunks
                .iter()
                .filter(|c| c.kind == kind)
                .map(|c| c.page_number)
                .collect();
            assert!(pages.windows(2).all(|w| w[0] <= w[1]), "pages {pages:?}");
        }
    }

    #[test]
    fn bodies_carry_context_headers() {
        let chunks = chunk_document(&sample_report(), "report.pdf").unwrap();
        for chunk in &chunks {
            assert!(chunk.body.starts_with("[CONTEXT | PAGE: "));
            assert!(chunk.body.contains(&chunk.section_context));
            assert!(!chunk.body.trim().is_empty());
        }
    }

    #[test]
    fn empty_document_is_an_extraction_error() {
        let err = chunk_document("   \n====================================\n", "empty.pdf")
            .unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));
    }

    #[test]
    fn metadata_carries_provenance() {
        let chunks = chunk_document(&sample_report(), "report.pdf").unwrap();
        let meta = chunks[0].metadata();
        assert_eq!(meta["source"], "report.pdf");
        assert!(meta["page"].as_u64().is_some());
        assert!(meta["principle"].as_str().is_some());
    }
}
