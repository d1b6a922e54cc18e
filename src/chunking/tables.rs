//! High-precision table extraction pass.

use std::sync::LazyLock;

use regex::Regex;

use super::principles::{GENERAL_SECTION, is_page_break, principle_header};
use super::{Chunk, ChunkKind};

/// Keywords that mark tabular header rows in disclosure reports.
const TABLE_HEADER_KEYWORDS: [&str; 11] = [
    "sr.",
    "total",
    "male",
    "female",
    "%",
    "category",
    "fy",
    "particulars",
    "no.",
    "unit",
    "amount",
];

/// Lookahead window scanned for table-start evidence.
const LOOKAHEAD_LINES: usize = 8;
/// Minimum line count for a candidate region to be accepted as a table.
const MIN_TABLE_LINES: usize = 4;
/// Consecutive non-table-shaped lines that terminate a region.
const MAX_NON_TABLE_STREAK: usize = 3;

static WIDE_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{3,}").expect("wide gap regex is valid"));

static SECTION_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(note:|\s*(section\s+[a-z]:|principle\s+\d+)|\s*(essential indicators|leadership indicators))",
    )
    .expect("section boundary regex is valid")
});

fn wide_gap_runs(line: &str) -> usize {
    WIDE_GAP.find_iter(line).count()
}

fn has_digit(line: &str) -> bool {
    line.bytes().any(|b| b.is_ascii_digit())
}

/// A line is table-shaped when it has at least one wide column gap or any
/// digit.
pub(crate) fn looks_like_table_row(line: &str) -> bool {
    wide_gap_runs(line) >= 1 || has_digit(line)
}

fn is_section_boundary(trimmed: &str) -> bool {
    SECTION_BOUNDARY.is_match(trimmed)
}

/// A lookahead window declares a table start when it shows at least two
/// header-keyword lines, two multi-gap lines, and two numeric lines.
pub(crate) fn window_triggers(window: &[&str]) -> bool {
    let header_hits = window
        .iter()
        .filter(|line| {
            let lower = line.to_lowercase();
            TABLE_HEADER_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .count();
    let spaced_lines = window
        .iter()
        .filter(|line| wide_gap_runs(line) >= 2)
        .count();
    let numeric_lines = window.iter().filter(|line| has_digit(line)).count();
    header_hits >= 2 && spaced_lines >= 2 && numeric_lines >= 2
}

/// Scans the document for tables, tracking page and section state, and
/// returns the table chunks plus a used-line mask covering every line that
/// was consumed by a table region.
pub(crate) fn extract_tables(lines: &[&str], source_document: &str) -> (Vec<Chunk>, Vec<bool>) {
    let mut used = vec![false; lines.len()];
    let mut chunks = Vec::new();
    let mut page: u32 = 1;
    let mut section = GENERAL_SECTION.to_string();
    let mut table_count = 0usize;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if is_page_break(line) {
            page += 1;
        }
        if let Some(context) = principle_header(line) {
            section = context;
        }

        let window_end = (i + LOOKAHEAD_LINES).min(lines.len());
        if !window_triggers(&lines[i..window_end]) {
            i += 1;
            continue;
        }

        let start = i;
        let mut j = i;
        let mut non_table_streak = 0usize;
        while j < lines.len() {
            let current = lines[j].trim();
            if current.is_empty() {
                j += 1;
                continue;
            }
            if is_section_boundary(current) {
                break;
            }
            if looks_like_table_row(current) {
                non_table_streak = 0;
            } else {
                non_table_streak += 1;
            }
            if non_table_streak >= MAX_NON_TABLE_STREAK {
                break;
            }
            j += 1;
        }

        let body = lines[start..j].join("\n");
        let body = body.trim();
        if body.lines().count() >= MIN_TABLE_LINES {
            chunks.push(Chunk::new(
                ChunkKind::Table,
                table_count,
                page,
                &section,
                body,
                source_document,
            ));
            table_count += 1;
            for k in start..j {
                used[k] = true;
            }
            // The outer scan skips the consumed region, so account for any
            // page-break markers inside it here.
            for k in (start + 1)..j {
                if is_page_break(lines[k]) {
                    page += 1;
                }
            }
            i = j;
        } else {
            i += 1;
        }
    }

    (chunks, used)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_triggers_at_exactly_two_of_each() {
        // Two header lines, two multi-gap lines, two numeric lines.
        let window = [
            "Category               Staff        Workers",
            "Total employees         120             45",
            "Figures reported as on 31 March",
            "prose line without table shape",
        ];
        assert!(window_triggers(&window));
    }

    #[test]
    fn window_does_not_trigger_at_one_header_hit() {
        // Same shape but only one header-keyword line.
        let window = [
            "Division               Staff        Workers",
            "Total headcount         120             45",
            "Figures reported as on 31 March",
            "prose line without table shape",
        ];
        assert!(!window_triggers(&window));
    }

    #[test]
    fn short_candidates_are_rejected() {
        let lines = vec![
            "Category        Male        Female",
            "Total            12              7",
            "Note: as of March 2024.",
            "Closing narrative text follows here.",
        ];
        let (chunks, used) = extract_tables(&lines, "doc.pdf");
        assert!(chunks.is_empty());
        assert!(used.iter().all(|u| !u));
    }

    #[test]
    fn region_ends_on_section_boundary() {
        let lines = vec![
            "Category        Male        Female",
            "Permanent        100            40",
            "Contract          55            21",
            "Total            155            61",
            "PRINCIPLE 5",
            "Narrative about human rights policies.",
        ];
        let (chunks, used) = extract_tables(&lines, "doc.pdf");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].body.contains("Total"));
        assert!(!chunks[0].body.contains("PRINCIPLE 5"));
        assert_eq!(&used[..], &[true, true, true, true, false, false]);
    }

    #[test]
    fn region_ends_after_three_non_table_lines() {
        let lines = vec![
            "Particulars                 FY 2024       FY 2023",
            "Total energy consumed           310           295",
            "Water withdrawn                 120           140",
            "Emissions intensity              17            19",
            "prose line one without shape",
            "prose line two without shape",
            "prose line three without shape",
            "prose line four without shape",
        ];
        let (chunks, _) = extract_tables(&lines, "doc.pdf");
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].body.contains("prose line four"));
    }

    #[test]
    fn table_records_page_and_section_state() {
        let lines = vec![
            "Opening narrative without any numbers at all.",
            "<<< page break >>>",
            "PRINCIPLE 6",
            "Particulars                 FY 2024       FY 2023",
            "Total energy (GJ)               310           295",
            "Renewable share (%)              41            37",
            "Intensity per rupee              17            19",
        ];
        let (chunks, _) = extract_tables(&lines, "doc.pdf");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_number, 2);
        assert!(chunks[0].section_context.starts_with("Principle 6:"));
    }
}
