//! Plain-text chunk export for debugging and audit.
//!
//! Each chunk is written as a delimited block: a JSON object carrying every
//! chunk field except the body, then a `--- TEXT ---` marker and the raw
//! body. The format is for human inspection; the only machine guarantee is
//! that the metadata object parses back as JSON.

use std::path::Path;

use tokio::fs;

use super::Chunk;
use crate::types::RagError;

pub const CHUNK_START: &str = "=== CHUNK START ===";
pub const CHUNK_END: &str = "=== CHUNK END ===";
pub const TEXT_MARKER: &str = "--- TEXT ---";

/// Renders the export document for a chunk sequence.
pub fn render_chunk_export(chunks: &[Chunk]) -> Result<String, RagError> {
    let mut out = String::new();
    for chunk in chunks {
        let metadata = serde_json::json!({
            "id": chunk.id,
            "kind": chunk.kind,
            "page_number": chunk.page_number,
            "section_context": chunk.section_context,
            "source_document": chunk.source_document,
        });
        let metadata = serde_json::to_string_pretty(&metadata)
            .map_err(|err| RagError::Chunking(format!("chunk metadata serialization: {err}")))?;
        out.push_str(CHUNK_START);
        out.push('\n');
        out.push_str(&metadata);
        out.push('\n');
        out.push_str(TEXT_MARKER);
        out.push('\n');
        out.push_str(&chunk.body);
        out.push('\n');
        out.push_str(CHUNK_END);
        out.push_str("\n\n");
    }
    Ok(out)
}

/// Writes the chunk export to `path`, creating parent directories as needed.
pub async fn write_chunk_export(path: impl AsRef<Path>, chunks: &[Chunk]) -> Result<(), RagError> {
    let path = path.as_ref();
    let rendered = render_chunk_export(chunks)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(path, rendered).await?;
    Ok(())
}
