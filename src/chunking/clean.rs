//! Pre-chunking text cleanup.

use std::sync::LazyLock;

use regex::Regex;

static METADATA_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)--- METADATA START ---.*?--- METADATA END ---")
        .expect("metadata block regex is valid")
});

static RULE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"={30,}").expect("rule separator regex is valid"));

/// Strips extraction-metadata blocks and decorative separators while keeping
/// page-break markers verbatim.
pub fn clean_raw_text(text: &str) -> String {
    let text = METADATA_BLOCK.replace_all(text, "");
    let text = RULE_SEPARATOR.replace_all(&text, "");
    text.trim().to_string()
}
