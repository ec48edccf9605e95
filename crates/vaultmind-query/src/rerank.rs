//! Hybrid reranking: weighted fusion of vector and lexical scores.
//!
//! Vector scores arrive as raw cosine similarity and are normalized into
//! [0, 1] before fusion; how they are normalized is a configured knob
//! because both conventions exist in the wild.

use vaultmind_core::defaults;

/// How raw cosine scores are mapped into [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreNorm {
    /// Fixed affine map from cosine [-1, 1] to [0, 1]. Scores are
    /// comparable across queries.
    #[default]
    Global,
    /// Min-max over the candidate set of one query. Spreads the candidate
    /// scores but is not comparable across queries.
    PerQuery,
}

impl ScoreNorm {
    /// Parse a configuration string. Unknown values fall back to the
    /// default.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "per_query" | "perquery" => ScoreNorm::PerQuery,
            _ => ScoreNorm::Global,
        }
    }
}

/// Fusion weights for the two signals.
#[derive(Debug, Clone, Copy)]
pub struct RerankWeights {
    pub vector: f32,
    pub lexical: f32,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            vector: defaults::WEIGHT_VECTOR,
            lexical: defaults::WEIGHT_LEXICAL,
        }
    }
}

/// A candidate entering the reranker.
#[derive(Debug, Clone)]
pub struct Scored {
    pub id: String,
    /// Raw cosine similarity from the vector store.
    pub raw_vector: f32,
    /// Lexical overlap score in [0, 1].
    pub lexical: f32,
}

/// A candidate after fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub id: String,
    pub score_vector: f32,
    pub score_lexical: f32,
    pub score_final: f32,
}

/// Normalize raw cosine scores into [0, 1] under the chosen scheme.
fn normalize(raw: &[f32], norm: ScoreNorm) -> Vec<f32> {
    match norm {
        ScoreNorm::Global => raw
            .iter()
            .map(|s| ((s + 1.0) / 2.0).clamp(0.0, 1.0))
            .collect(),
        ScoreNorm::PerQuery => {
            let min = raw.iter().cloned().fold(f32::INFINITY, f32::min);
            let max = raw.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            if (max - min).abs() < f32::EPSILON {
                return vec![1.0; raw.len()];
            }
            raw.iter().map(|s| (s - min) / (max - min)).collect()
        }
    }
}

/// Fuse, sort, and truncate to the top `k`.
///
/// Order: `score_final` descending, ties broken by `score_vector`
/// descending, then by id lexicographically.
pub fn rerank(
    candidates: Vec<Scored>,
    weights: RerankWeights,
    norm: ScoreNorm,
    k: usize,
) -> Vec<Ranked> {
    let raw: Vec<f32> = candidates.iter().map(|c| c.raw_vector).collect();
    let normalized = normalize(&raw, norm);

    let mut ranked: Vec<Ranked> = candidates
        .into_iter()
        .zip(normalized)
        .map(|(c, score_vector)| Ranked {
            score_final: weights.vector * score_vector + weights.lexical * c.lexical,
            score_vector,
            score_lexical: c.lexical,
            id: c.id,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score_final
            .partial_cmp(&a.score_final)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.score_vector
                    .partial_cmp(&a.score_vector)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, raw_vector: f32, lexical: f32) -> Scored {
        Scored {
            id: id.to_string(),
            raw_vector,
            lexical,
        }
    }

    #[test]
    fn test_score_norm_parse() {
        assert_eq!(ScoreNorm::parse("global"), ScoreNorm::Global);
        assert_eq!(ScoreNorm::parse("per_query"), ScoreNorm::PerQuery);
        assert_eq!(ScoreNorm::parse("PerQuery"), ScoreNorm::PerQuery);
        assert_eq!(ScoreNorm::parse("nonsense"), ScoreNorm::Global);
    }

    #[test]
    fn test_global_normalization_maps_cosine_range() {
        let ranked = rerank(
            vec![scored("a", 1.0, 0.0), scored("b", -1.0, 0.0), scored("c", 0.0, 0.0)],
            RerankWeights::default(),
            ScoreNorm::Global,
            10,
        );
        let by_id = |id: &str| ranked.iter().find(|r| r.id == id).unwrap().score_vector;
        assert!((by_id("a") - 1.0).abs() < f32::EPSILON);
        assert!(by_id("b").abs() < f32::EPSILON);
        assert!((by_id("c") - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_per_query_normalization_spreads_candidates() {
        let ranked = rerank(
            vec![scored("a", 0.8, 0.0), scored("b", 0.6, 0.0), scored("c", 0.7, 0.0)],
            RerankWeights::default(),
            ScoreNorm::PerQuery,
            10,
        );
        let by_id = |id: &str| ranked.iter().find(|r| r.id == id).unwrap().score_vector;
        assert!((by_id("a") - 1.0).abs() < f32::EPSILON);
        assert!(by_id("b").abs() < f32::EPSILON);
        assert!((by_id("c") - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_per_query_degenerate_set_maps_to_one() {
        let ranked = rerank(
            vec![scored("a", 0.4, 0.0), scored("b", 0.4, 0.0)],
            RerankWeights::default(),
            ScoreNorm::PerQuery,
            10,
        );
        assert!(ranked.iter().all(|r| (r.score_vector - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_weighted_fusion() {
        let weights = RerankWeights {
            vector: 0.7,
            lexical: 0.3,
        };
        let ranked = rerank(vec![scored("a", 0.0, 1.0)], weights, ScoreNorm::Global, 10);
        // vector normalizes to 0.5: 0.7*0.5 + 0.3*1.0 = 0.65
        assert!((ranked[0].score_final - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_lexical_signal_can_reorder() {
        let ranked = rerank(
            vec![scored("vector_wins", 0.6, 0.0), scored("lexical_wins", 0.5, 1.0)],
            RerankWeights::default(),
            ScoreNorm::Global,
            10,
        );
        assert_eq!(ranked[0].id, "lexical_wins");
    }

    #[test]
    fn test_tie_broken_by_vector_then_id() {
        // Same final score, different vector components.
        let weights = RerankWeights {
            vector: 0.5,
            lexical: 0.5,
        };
        let ranked = rerank(
            vec![scored("low_vec", 0.0, 1.0), scored("high_vec", 1.0, 0.0)],
            weights,
            ScoreNorm::Global,
            10,
        );
        assert_eq!(ranked[0].id, "high_vec");

        // Fully identical scores fall back to id order.
        let ranked = rerank(
            vec![scored("b", 0.5, 0.5), scored("a", 0.5, 0.5)],
            weights,
            ScoreNorm::Global,
            10,
        );
        assert_eq!(ranked[0].id, "a");
    }

    #[test]
    fn test_truncates_to_k() {
        let candidates = (0..10).map(|i| scored(&format!("c{i}"), i as f32 / 10.0, 0.0));
        let ranked = rerank(
            candidates.collect(),
            RerankWeights::default(),
            ScoreNorm::Global,
            3,
        );
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].id, "c9");
    }

    #[test]
    fn test_empty_input() {
        let ranked = rerank(vec![], RerankWeights::default(), ScoreNorm::Global, 5);
        assert!(ranked.is_empty());
    }
}
