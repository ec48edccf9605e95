//! # vaultmind-query
//!
//! The query engine: folder scoping, hybrid retrieval and reranking,
//! grounded context assembly, citation extraction, and abstention.
//!
//! An ask runs through fixed stages:
//!
//! 1. **Scope** — resolve the vault allowlist, then pin folders either
//!    from the request or by asking the chat backend to route the
//!    question over the stored folder labels.
//! 2. **Embed** — embed the question.
//! 3. **Retrieve** — cosine search per (vault, folder) combination,
//!    oversampled, merged by point id.
//! 4. **Rerank** — weighted fusion of vector similarity and bag-of-words
//!    overlap.
//! 5. **Generate** — numbered context blocks plus a grounding system
//!    prompt, low temperature.
//! 6. **Cite** — extract `[File: …, Section: …]` markers and keep the
//!    retrieved chunks they match.
//! 7. **Abstain** — structured refusal instead of an empty answer when
//!    retrieval or the model comes up short.

pub mod citations;
pub mod context;
pub mod engine;
pub mod lexical;
pub mod rerank;
pub mod scope;

pub use citations::{extract_citations, filter_references, Citation};
pub use engine::{QueryConfig, QueryEngine};
pub use rerank::{RerankWeights, ScoreNorm};
