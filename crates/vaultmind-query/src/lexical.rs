//! Lightweight bag-of-words lexical scoring.
//!
//! Used by the hybrid reranker as the second signal next to vector
//! similarity: the overlap between the question's tokens (case-folded,
//! stop-word-stripped) and a candidate's heading path plus text prefix.

use std::collections::HashSet;

/// English stop words stripped from question tokens before overlap
/// scoring.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "do", "does", "for", "from",
    "has", "have", "how", "i", "in", "is", "it", "its", "me", "my", "no", "not", "of", "on", "or",
    "s", "so", "t", "that", "the", "their", "there", "these", "they", "this", "to", "was", "we",
    "were", "what", "when", "where", "which", "who", "why", "will", "with", "you", "your",
];

/// Split on non-alphanumeric runs and case-fold.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Question token set: tokenized, case-folded, stop words removed.
pub fn question_terms(question: &str) -> HashSet<String> {
    tokenize(question)
        .into_iter()
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Overlap score in [0, 1]: the fraction of question terms present in the
/// candidate text.
pub fn overlap_score(terms: &HashSet<String>, candidate: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let candidate_tokens: HashSet<String> = tokenize(candidate).into_iter().collect();
    let hits = terms.iter().filter(|t| candidate_tokens.contains(*t)).count();
    hits as f32 / terms.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_on_non_alphanumeric() {
        assert_eq!(
            tokenize("Go's built-in sort?"),
            vec!["go", "s", "built", "in", "sort"]
        );
    }

    #[test]
    fn test_question_terms_strip_stop_words() {
        let terms = question_terms("Does Go have a built-in string sort?");
        assert!(terms.contains("go"));
        assert!(terms.contains("sort"));
        assert!(terms.contains("string"));
        assert!(!terms.contains("does"));
        assert!(!terms.contains("a"));
    }

    #[test]
    fn test_overlap_full_match() {
        let terms = question_terms("string sort");
        let score = overlap_score(&terms, "# Go Tips string sort notes");
        assert!((score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_overlap_partial_match() {
        let terms = question_terms("string sort");
        let score = overlap_score(&terms, "sorting strings is fun; sort them");
        assert!((score - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_overlap_no_match_is_zero() {
        let terms = question_terms("kubernetes ingress");
        assert_eq!(overlap_score(&terms, "# Go Tips\nstring sort"), 0.0);
    }

    #[test]
    fn test_overlap_empty_question_is_zero() {
        let terms = question_terms("");
        assert_eq!(overlap_score(&terms, "anything"), 0.0);
    }

    #[test]
    fn test_overlap_is_case_insensitive() {
        let terms = question_terms("TOKIO runtime");
        assert!(overlap_score(&terms, "the Tokio Runtime") > 0.99);
    }
}
