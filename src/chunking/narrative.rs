//! Narrative chunking pass.
//!
//! Runs after the table pass over the same line sequence, skipping every
//! line the table pass consumed. Buffers flush on section changes, on
//! structural headings, and at the line cap; heading and cap flushes keep a
//! trailing overlap so sentences split across chunk boundaries stay
//! retrievable.

use std::sync::LazyLock;

use regex::Regex;

use super::principles::{GENERAL_SECTION, is_page_break, principle_header};
use super::{Chunk, ChunkKind};

/// Buffer size at which a narrative chunk is flushed.
const MAX_CHUNK_LINES: usize = 25;
/// Trailing lines carried into the next buffer on heading/cap flushes.
const OVERLAP_LINES: usize = 5;

static STRUCTURAL_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+\.\s+|Section\s+[A-Z]:|Principle\s+\d+|[IVX]+\.)")
        .expect("structural heading regex is valid")
});

fn flush_buffer(
    buffer: &[&str],
    page: u32,
    section: &str,
    source_document: &str,
    index: &mut usize,
    chunks: &mut Vec<Chunk>,
) {
    let text = buffer.join("\n");
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    chunks.push(Chunk::new(
        ChunkKind::Narrative,
        *index,
        page,
        section,
        text,
        source_document,
    ));
    *index += 1;
}

fn retain_overlap(buffer: &mut Vec<&str>) {
    let keep_from = buffer.len().saturating_sub(OVERLAP_LINES);
    buffer.drain(..keep_from);
}

/// Accumulates unmasked lines into narrative chunks.
///
/// `used` is the table pass's mask; masked lines are skipped entirely and the
/// buffer is flushed when a masked region begins, so no narrative chunk spans
/// a table. Page and section state still advance through masked lines.
pub(crate) fn extract_narrative(
    lines: &[&str],
    used: &[bool],
    source_document: &str,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut index = 0usize;
    let mut page: u32 = 1;
    let mut section = GENERAL_SECTION.to_string();
    let mut in_masked_region = false;

    for (position, &line) in lines.iter().enumerate() {
        if is_page_break(line) {
            page += 1;
        }

        if used.get(position).copied().unwrap_or(false) {
            if !in_masked_region {
                flush_buffer(&buffer, page, &section, source_document, &mut index, &mut chunks);
                buffer.clear();
                in_masked_region = true;
            }
            if let Some(context) = principle_header(line) {
                section = context;
            }
            continue;
        }
        in_masked_region = false;

        if let Some(context) = principle_header(line) {
            // Flush under the outgoing section before adopting the new one;
            // section changes never carry overlap.
            flush_buffer(&buffer, page, &section, source_document, &mut index, &mut chunks);
            buffer.clear();
            section = context;
        }

        if STRUCTURAL_HEADING.is_match(line) && !buffer.is_empty() {
            flush_buffer(&buffer, page, &section, source_document, &mut index, &mut chunks);
            retain_overlap(&mut buffer);
        }

        buffer.push(line);

        if buffer.len() >= MAX_CHUNK_LINES {
            flush_buffer(&buffer, page, &section, source_document, &mut index, &mut chunks);
            retain_overlap(&mut buffer);
        }
    }

    flush_buffer(&buffer, page, &section, source_document, &mut index, &mut chunks);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_mask(lines: &[&str]) -> Vec<bool> {
        vec![false; lines.len()]
    }

    #[test]
    fn buffers_flush_at_line_cap_with_overlap() {
        let owned: Vec<String> = (0..30).map(|i| format!("narrative line {i}")).collect();
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let chunks = extract_narrative(&lines, &no_mask(&lines), "doc.pdf");
        assert_eq!(chunks.len(), 2);
        // Cap flush keeps the trailing five lines for continuity.
        assert!(chunks[0].body.contains("narrative line 24"));
        assert!(chunks[1].body.contains("narrative line 20"));
        assert!(chunks[1].body.contains("narrative line 29"));
    }

    #[test]
    fn structural_headings_flush_with_overlap() {
        let lines = vec![
            "Introductory text about the reporting entity.",
            "More context about operations.",
            "1.  Details of the listed entity",
            "The entity is listed on both exchanges.",
        ];
        let chunks = extract_narrative(&lines, &no_mask(&lines), "doc.pdf");
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].body.contains("Introductory text"));
        // Overlap carries the pre-heading lines into the second chunk too.
        assert!(chunks[1].body.contains("More context"));
        assert!(chunks[1].body.contains("1.  Details"));
    }

    #[test]
    fn principle_header_flushes_without_overlap_and_switches_section() {
        let lines = vec![
            "General disclosures about the company.",
            "PRINCIPLE 2",
            "Product safety narrative follows here.",
        ];
        let chunks = extract_narrative(&lines, &no_mask(&lines), "doc.pdf");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_context, GENERAL_SECTION);
        assert!(chunks[1].section_context.starts_with("Principle 2:"));
        // No overlap across a section change.
        assert!(!chunks[1].body.contains("General disclosures"));
        assert!(chunks[1].body.contains("PRINCIPLE 2"));
    }

    #[test]
    fn masked_regions_are_skipped_and_split_buffers() {
        let lines = vec![
            "Narrative before the table.",
            "Category        Male        Female",
            "Total            12              7",
            "Narrative after the table.",
        ];
        let mut used = no_mask(&lines);
        used[1] = true;
        used[2] = true;
        let chunks = extract_narrative(&lines, &used, "doc.pdf");
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].body.contains("before the table"));
        assert!(chunks[1].body.contains("after the table"));
        for chunk in &chunks {
            assert!(!chunk.body.contains("Total            12"));
        }
    }

    #[test]
    fn pages_advance_on_markers() {
        let lines = vec![
            "Text on the first page.",
            "<<< page break >>>",
            "PRINCIPLE 1",
            "Text on the second page.",
        ];
        let chunks = extract_narrative(&lines, &no_mask(&lines), "doc.pdf");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].page_number, 2);
    }

    #[test]
    fn empty_buffers_are_discarded() {
        let lines = vec!["   ", "", "PRINCIPLE 4", "Stakeholder narrative."];
        let chunks = extract_narrative(&lines, &no_mask(&lines), "doc.pdf");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].section_context.starts_with("Principle 4:"));
    }
}
