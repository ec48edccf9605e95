//! Citation extraction and reference filtering.
//!
//! Generated answers cite sources with `[File: <rel_path>, Section:
//! <heading_path>]` markers. Extraction is case-insensitive and
//! whitespace-tolerant, and matching against retrieved chunks is
//! deliberately lenient on both path (suffix/basename) and section
//! (substring or token intersection), because free-form model output
//! rarely reproduces either byte-for-byte.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use vaultmind_core::{Reference, RetrievedChunk};

use crate::lexical::tokenize;

/// A citation marker extracted from an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub path: String,
    pub section: String,
}

fn citation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\[\s*file\s*:\s*([^,\]]+?)\s*,\s*section\s*:\s*([^\]]*?)\s*\]")
            .expect("citation regex is valid")
    })
}

/// Scan an answer for citation markers, in order of appearance.
pub fn extract_citations(answer: &str) -> Vec<Citation> {
    citation_regex()
        .captures_iter(answer)
        .map(|caps| Citation {
            path: caps[1].trim().to_string(),
            section: caps[2].trim().to_string(),
        })
        .collect()
}

fn normalize_path(path: &str) -> String {
    path.trim().to_lowercase().replace('\\', "/")
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Path match: exact, suffix, or basename equality, after lower-casing and
/// forward-slashing both sides.
pub fn path_matches(cited: &str, candidate: &str) -> bool {
    let cited = normalize_path(cited);
    let candidate = normalize_path(candidate);
    if cited.is_empty() {
        return false;
    }
    cited == candidate
        || candidate.ends_with(&cited)
        || basename(&cited) == basename(&candidate)
}

/// Strip heading markers and separators, lower-case, collapse whitespace.
fn normalize_section(section: &str) -> String {
    let stripped: String = section
        .chars()
        .map(|c| if c == '#' || c == '>' { ' ' } else { c })
        .collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Section match: substring in either direction, or non-empty word-set
/// intersection after tokenizing on non-alphanumeric runs.
pub fn section_matches(cited: &str, candidate: &str) -> bool {
    let cited = normalize_section(cited);
    let candidate = normalize_section(candidate);

    if cited.contains(&candidate) || candidate.contains(&cited) {
        return true;
    }

    let cited_words: HashSet<String> = tokenize(&cited).into_iter().collect();
    let candidate_words: HashSet<String> = tokenize(&candidate).into_iter().collect();
    cited_words.intersection(&candidate_words).next().is_some()
}

/// Keep exactly the retrieved chunks whose `(rel_path, heading_path)`
/// matched at least one citation, ordered by first citation appearance.
pub fn filter_references(answer: &str, retrieved: &[RetrievedChunk]) -> Vec<Reference> {
    let citations = extract_citations(answer);
    let mut seen: HashSet<String> = HashSet::new();
    let mut references = Vec::new();

    for citation in &citations {
        for chunk in retrieved {
            if !path_matches(&citation.path, &chunk.rel_path) {
                continue;
            }
            if !section_matches(&citation.section, &chunk.heading_path) {
                continue;
            }
            if seen.insert(chunk.id.clone()) {
                references.push(Reference {
                    vault: chunk.vault.clone(),
                    rel_path: chunk.rel_path.clone(),
                    heading_path: chunk.heading_path.clone(),
                    chunk_index: chunk.chunk_index,
                });
            }
        }
    }
    references
}

/// Whether the answer contains an explicit refusal phrase.
pub fn contains_refusal(answer: &str, refusal_phrases: &[String]) -> bool {
    let lowered = answer.to_lowercase();
    refusal_phrases
        .iter()
        .any(|phrase| lowered.contains(&phrase.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, rel_path: &str, heading_path: &str) -> RetrievedChunk {
        RetrievedChunk {
            id: id.to_string(),
            vault: "personal".to_string(),
            rel_path: rel_path.to_string(),
            heading_path: heading_path.to_string(),
            chunk_index: 0,
            note_title: "T".to_string(),
            text: String::new(),
            score_vector: 0.0,
            score_lexical: 0.0,
            score_final: 0.0,
        }
    }

    // ============================================================================
    // Extraction
    // ============================================================================

    #[test]
    fn test_extract_simple_citation() {
        let citations =
            extract_citations("Yes [File: notes/tips.md, Section: # Go Tips] indeed.");
        assert_eq!(
            citations,
            vec![Citation {
                path: "notes/tips.md".into(),
                section: "# Go Tips".into()
            }]
        );
    }

    #[test]
    fn test_extract_is_case_insensitive_and_whitespace_tolerant() {
        let citations = extract_citations("[ file : a.md ,  SECTION :  Intro ]");
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].path, "a.md");
        assert_eq!(citations[0].section, "Intro");
    }

    #[test]
    fn test_extract_multiple_in_order() {
        let answer = "[File: a.md, Section: A] then [File: b.md, Section: B]";
        let citations = extract_citations(answer);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].path, "a.md");
        assert_eq!(citations[1].path, "b.md");
    }

    #[test]
    fn test_extract_ignores_plain_brackets() {
        assert!(extract_citations("See [1] and [source: x]").is_empty());
    }

    #[test]
    fn test_extract_empty_section() {
        let citations = extract_citations("[File: a.md, Section: ]");
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].section, "");
    }

    // ============================================================================
    // Path matching
    // ============================================================================

    #[test]
    fn test_path_exact_match() {
        assert!(path_matches("notes/tips.md", "notes/tips.md"));
    }

    #[test]
    fn test_path_case_and_slash_normalization() {
        assert!(path_matches("Notes\\Tips.md", "notes/tips.md"));
    }

    #[test]
    fn test_path_suffix_match() {
        assert!(path_matches("tips.md", "notes/tips.md"));
        assert!(path_matches("notes/tips.md", "vault/notes/tips.md"));
    }

    #[test]
    fn test_path_basename_match() {
        assert!(path_matches("other/dir/tips.md", "notes/tips.md"));
    }

    #[test]
    fn test_path_mismatch() {
        assert!(!path_matches("tricks.md", "notes/tips.md"));
        assert!(!path_matches("", "notes/tips.md"));
    }

    // ============================================================================
    // Section matching
    // ============================================================================

    #[test]
    fn test_section_exact_after_normalization() {
        assert!(section_matches("Go Tips", "# Go Tips"));
        assert!(section_matches("# Go Tips > ## Strings", "# Go Tips > ## Strings"));
    }

    #[test]
    fn test_section_substring_match() {
        assert!(section_matches("Strings", "# Go Tips > ## Strings"));
    }

    #[test]
    fn test_section_word_intersection_match() {
        assert!(section_matches("the strings chapter", "# Go Tips > ## Strings"));
    }

    #[test]
    fn test_section_mismatch() {
        assert!(!section_matches("Networking", "# Go Tips > ## Strings"));
    }

    #[test]
    fn test_empty_cited_section_matches_anything() {
        assert!(section_matches("", "# Go Tips"));
    }

    // ============================================================================
    // Reference filtering
    // ============================================================================

    #[test]
    fn test_filter_keeps_only_cited_chunks() {
        let retrieved = vec![
            chunk("c1", "notes/tips.md", "# Go Tips"),
            chunk("c2", "notes/other.md", "# Other"),
        ];
        let refs = filter_references(
            "Answer [File: notes/tips.md, Section: Go Tips].",
            &retrieved,
        );
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].rel_path, "notes/tips.md");
    }

    #[test]
    fn test_filter_orders_by_citation_appearance() {
        let retrieved = vec![
            chunk("c1", "a.md", "# A"),
            chunk("c2", "b.md", "# B"),
        ];
        let refs = filter_references(
            "[File: b.md, Section: B] first, then [File: a.md, Section: A]",
            &retrieved,
        );
        assert_eq!(refs[0].rel_path, "b.md");
        assert_eq!(refs[1].rel_path, "a.md");
    }

    #[test]
    fn test_filter_dedupes_repeated_citations() {
        let retrieved = vec![chunk("c1", "a.md", "# A")];
        let refs = filter_references(
            "[File: a.md, Section: A] and again [File: a.md, Section: A]",
            &retrieved,
        );
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_filter_empty_when_nothing_matches() {
        let retrieved = vec![chunk("c1", "a.md", "# A")];
        let refs = filter_references("[File: z.md, Section: Z]", &retrieved);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_filter_no_citations_yields_no_references() {
        let retrieved = vec![chunk("c1", "a.md", "# A")];
        assert!(filter_references("no citations here", &retrieved).is_empty());
    }

    // ============================================================================
    // Refusal detection
    // ============================================================================

    #[test]
    fn test_contains_refusal() {
        let phrases = vec!["don't have enough information".to_string()];
        assert!(contains_refusal(
            "I don't have enough information in the indexed notes to answer that.",
            &phrases
        ));
        assert!(!contains_refusal("Go has no built-in string sort.", &phrases));
    }

    #[test]
    fn test_refusal_is_case_insensitive() {
        let phrases = vec!["cannot answer".to_string()];
        assert!(contains_refusal("I CANNOT ANSWER this.", &phrases));
    }
}
