//! Whole-document chunking tests over a synthetic BRSR-style report.

use brsr_rag::chunking::export::{CHUNK_START, TEXT_MARKER, write_chunk_export};
use brsr_rag::chunking::{ChunkKind, GENERAL_SECTION, chunk_document, clean_raw_text};

fn sample_report() -> String {
    [
        "--- METADATA START ---",
        "{\"source_file\": \"acme_brsr_2024.pdf\", \"pages_in_batch\": [\"1\", \"2\", \"3\"]}",
        "--- METADATA END ---",
        "Section A: General Disclosures",
        "The company operates across three business segments and publishes",
        "this report for its stakeholders.",
        "Its registered office is in Mumbai and shares are listed on both",
        "national exchanges.",
        "<<< page two >>>",
        "PRINCIPLE 3",
        "Essential Indicators",
        "Category               Male       Female",
        "Total employees         120           45",
        "Permanent workers        80           30",
        "Other than permanent     40           15",
        "Note: headcount as on reporting date.",
        "Employee wellbeing programmes cover health insurance and parental",
        "leave for permanent staff.",
        "<<< page three >>>",
        "PRINCIPLE 6",
        "Particulars                 FY Current    FY Previous",
        "Total energy consumed           310           295",
        "Renewable share                  41            37",
        "Water withdrawn                 120           140",
        "The company continues to invest in renewable power purchase",
        "agreements across its manufacturing sites.",
        "The board reviews progress on these commitments every quarter.",
        "============================================",
    ]
    .join("\n")
}

#[test]
fn extracts_both_tables_with_provenance() {
    let chunks = chunk_document(&sample_report(), "acme_brsr_2024.pdf").unwrap();
    let tables: Vec<_> = chunks
        .iter()
        .filter(|c| c.kind == ChunkKind::Table)
        .collect();
    assert_eq!(tables.len(), 2, "tables: {tables:#?}");

    assert!(tables[0].body.contains("Total employees"));
    assert_eq!(tables[0].page_number, 2);
    assert!(tables[0].section_context.starts_with("Principle 3:"));
    assert!(!tables[0].body.contains("Note: headcount"));

    assert!(tables[1].body.contains("Particulars"));
    assert_eq!(tables[1].page_number, 3);
    assert!(tables[1].section_context.starts_with("Principle 6:"));
}

#[test]
fn narrative_sections_track_principle_context() {
    let chunks = chunk_document(&sample_report(), "acme_brsr_2024.pdf").unwrap();
    let narrative: Vec<_> = chunks
        .iter()
        .filter(|c| c.kind == ChunkKind::Narrative)
        .collect();
    assert!(!narrative.is_empty());

    assert_eq!(narrative[0].section_context, GENERAL_SECTION);
    assert!(narrative[0].body.contains("Section A: General Disclosures"));

    let wellbeing = narrative
        .iter()
        .find(|c| c.body.contains("Employee wellbeing programmes"))
        .expect("wellbeing narrative chunk");
    assert!(wellbeing.section_context.starts_with("Principle 3:"));
}

#[test]
fn table_regions_never_reappear_in_narrative() {
    let chunks = chunk_document(&sample_report(), "acme_brsr_2024.pdf").unwrap();
    for chunk in chunks.iter().filter(|c| c.kind == ChunkKind::Narrative) {
        assert!(!chunk.body.contains("Total employees"));
        assert!(!chunk.body.contains("Total energy consumed"));
    }
}

#[test]
fn all_nonblank_lines_are_covered() {
    let text = sample_report();
    let chunks = chunk_document(&text, "acme_brsr_2024.pdf").unwrap();
    for line in clean_raw_text(&text)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
    {
        assert!(
            chunks.iter().any(|c| c.body.contains(line)),
            "line not covered: {line}"
        );
    }
}

#[test]
fn pages_are_monotonic_within_each_pass() {
    let chunks = chunk_document(&sample_report(), "acme_brsr_2024.pdf").unwrap();
    for kind in [ChunkKind::Table, ChunkKind::Narrative] {
        let pages: Vec<u32> = chunks
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.page_number)
            .collect();
        assert!(
            pages.windows(2).all(|w| w[0] <= w[1]),
            "{kind} pages not monotonic: {pages:?}"
        );
    }
}

#[test]
fn chunking_is_deterministic() {
    let text = sample_report();
    let first = chunk_document(&text, "acme_brsr_2024.pdf").unwrap();
    let second = chunk_document(&text, "acme_brsr_2024.pdf").unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn export_blocks_match_chunks_and_parse_as_json() {
    let chunks = chunk_document(&sample_report(), "acme_brsr_2024.pdf").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chunks_preview.txt");
    write_chunk_export(&path, &chunks).await.unwrap();

    let written = tokio::fs::read_to_string(&path).await.unwrap();
    let blocks: Vec<&str> = written.split(CHUNK_START).skip(1).collect();
    assert_eq!(blocks.len(), chunks.len());

    for (block, chunk) in blocks.iter().zip(&chunks) {
        let metadata_raw = block.split(TEXT_MARKER).next().unwrap().trim();
        let metadata: serde_json::Value = serde_json::from_str(metadata_raw).unwrap();
        assert_eq!(metadata["id"], chunk.id.as_str());
        assert_eq!(metadata["source_document"], "acme_brsr_2024.pdf");
    }
}
