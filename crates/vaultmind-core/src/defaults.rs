//! Centralized default constants for the vaultmind system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// CHUNKING
// =============================================================================

/// Target token budget per chunk. Sections above this are split at
/// paragraph boundaries.
pub const CHUNK_TOKEN_BUDGET: usize = 400;

/// Approximate characters per token used by the chunker's estimator.
pub const CHARS_PER_TOKEN: usize = 4;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding model name (Ollama).
pub const EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding vector dimension for nomic-embed-text.
pub const EMBED_DIMENSION: usize = 768;

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Character threshold above which a chunk is considered over the
/// embedding model's context limit and dropped when the provider rejects
/// a batch as too long.
pub const MAX_EMBED_CHARS: usize = 32_768;

// =============================================================================
// GENERATION
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model name (Ollama).
pub const GEN_MODEL: &str = "qwen3:8b";

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Default generation temperature for grounded answering.
pub const GEN_TEMPERATURE: f32 = 0.3;

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Default number of chunks returned by a query.
pub const TOP_K_DEFAULT: usize = 5;

/// Hard cap on the number of chunks a caller may request.
pub const TOP_K_MAX: usize = 20;

/// Oversampling factor applied to each per-scope vector search before
/// merging and reranking.
pub const OVERSAMPLE_FACTOR: usize = 3;

/// Default weight of the vector score in hybrid reranking.
pub const WEIGHT_VECTOR: f32 = 0.7;

/// Default weight of the lexical score in hybrid reranking.
pub const WEIGHT_LEXICAL: f32 = 0.3;

/// Characters of chunk text considered by the lexical scorer.
pub const LEXICAL_TEXT_PREFIX: usize = 512;

// =============================================================================
// ANSWERING
// =============================================================================

/// Answer emitted when retrieval produces no usable context.
pub const REFUSAL_PHRASE: &str =
    "I don't have enough information in the indexed notes to answer that.";

/// Max response tokens for the `brief` detail level.
pub const MAX_TOKENS_BRIEF: u32 = 256;

/// Max response tokens for the `normal` detail level.
pub const MAX_TOKENS_NORMAL: u32 = 512;

/// Max response tokens for the `detailed` detail level.
pub const MAX_TOKENS_DETAILED: u32 = 1024;

// =============================================================================
// VECTOR STORE
// =============================================================================

/// Name of the single point collection.
pub const POINT_COLLECTION: &str = "chunk_point";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8080;
