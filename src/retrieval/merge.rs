//! Dual-retrieval result merging.

use std::collections::HashSet;

use super::result::RetrievedResult;

/// Order-preserving union of two result sequences.
///
/// `primary` keeps its order and ranking bias; elements of `secondary` are
/// appended only when their content+location key has not been seen.
pub fn merge_results(
    primary: Vec<RetrievedResult>,
    secondary: Vec<RetrievedResult>,
) -> Vec<RetrievedResult> {
    let mut seen: HashSet<_> = primary.iter().map(RetrievedResult::dedup_key).collect();
    let mut merged = primary;
    for candidate in secondary {
        if seen.insert(candidate.dedup_key()) {
            merged.push(candidate);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(content: &str, page: i64) -> RetrievedResult {
        RetrievedResult::new(content, json!({"page": page, "source": "report.pdf"}))
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let a = vec![result("one", 1), result("two", 2)];
        assert_eq!(merge_results(a.clone(), Vec::new()), a);
        assert_eq!(merge_results(Vec::new(), a.clone()), a);
    }

    #[test]
    fn merge_deduplicates_shared_elements() {
        let a = vec![result("shared", 1), result("only-a", 2)];
        let b = vec![result("shared", 1), result("only-b", 3)];
        let merged = merge_results(a.clone(), b.clone());
        assert!(merged.len() < a.len() + b.len());
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn merge_preserves_first_seen_order() {
        let a = vec![result("one", 1), result("two", 2)];
        let b = vec![result("three", 3), result("one", 1), result("four", 4)];
        let merged = merge_results(a, b);
        let contents: Vec<_> = merged.iter().map(|r| r.page_content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "three", "four"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let a = vec![result("one", 1), result("two", 2)];
        let b = vec![result("two", 2), result("three", 3)];
        let once = merge_results(a.clone(), b);
        let twice = merge_results(once.clone(), a);
        assert_eq!(once, twice);
    }

    #[test]
    fn same_content_on_different_pages_is_kept() {
        let a = vec![result("repeated heading", 1)];
        let b = vec![result("repeated heading", 9)];
        assert_eq!(merge_results(a, b).len(), 2);
    }
}
