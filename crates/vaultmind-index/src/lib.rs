//! # vaultmind-index
//!
//! Vault discovery, heading-aware Markdown chunking, and the indexing
//! pipeline that reconciles notes into the metadata and vector stores.

pub mod chunker;
pub mod pipeline;
pub mod walker;

pub use chunker::{extract_title, ChunkerConfig, MarkdownChunker, NoteChunk};
pub use pipeline::{Indexer, IndexerConfig};
pub use walker::{walk_vault, NoteFile};
