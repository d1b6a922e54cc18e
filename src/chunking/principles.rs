//! Page and section provenance tracking.
//!
//! BRSR reports are organised around the nine NGRBC principles; a chunk's
//! section context is the full principle name so the embedded text matches
//! the vocabulary auditors query with.

use std::sync::LazyLock;

use regex::Regex;

/// Section context used before any principle header has been observed.
pub const GENERAL_SECTION: &str = "General Information";

/// The nine NGRBC principle names, indexed by principle number minus one.
const PRINCIPLE_NAMES: [&str; 9] = [
    "Ethics, Transparency and Accountability - Businesses should conduct and govern themselves with integrity and in a manner that is ethical, transparent and accountable.",
    "Sustainable and Safe Goods and Services - Businesses should provide goods and services in a manner that is sustainable and safe.",
    "Well-being of all Employees - Businesses should respect and promote the well-being of all employees, including those in their value chains.",
    "Stakeholder Responsiveness - Businesses should respect the interests of and be responsive to all its stakeholders.",
    "Human Rights - Businesses should respect and promote human rights.",
    "Environmental Protection - Businesses should respect and make efforts to protect and restore the environment.",
    "Responsible Advocacy - Businesses, when engaging in influencing public and regulatory policy, should do so in a manner that is responsible and transparent.",
    "Inclusive Growth - Businesses should promote inclusive growth and equitable development.",
    "Consumer Value - Businesses should engage with and provide value to their consumers in a responsible manner.",
];

static PRINCIPLE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)PRINCIPLE\s+(\d+)").expect("principle header regex is valid"));

/// Renders the section context for a principle number; numbers outside the
/// nine-entry table render as "Unknown".
pub fn principle_context(number: u32) -> String {
    let name = if (1..=9).contains(&number) {
        PRINCIPLE_NAMES[(number - 1) as usize]
    } else {
        "Unknown"
    };
    format!("Principle {number}: {name}")
}

/// Detects a `PRINCIPLE <n>` header anywhere in the line (headers are often
/// buried in extraction noise) and returns the rendered section context.
pub(crate) fn principle_header(line: &str) -> Option<String> {
    let captures = PRINCIPLE_HEADER.captures(line)?;
    let number: u32 = captures.get(1)?.as_str().parse().ok()?;
    Some(principle_context(number))
}

/// True when the line carries a page-break marker from the extraction layer.
pub(crate) fn is_page_break(line: &str) -> bool {
    line.contains("<<<")
}
