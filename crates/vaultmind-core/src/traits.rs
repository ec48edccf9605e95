//! Core traits for vaultmind abstractions.
//!
//! These traits define the capability boundaries between the core and its
//! collaborators (metadata store, vector store, inference services),
//! enabling pluggable backends and plain test doubles.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// METADATA STORE TRAITS
// =============================================================================

/// Repository for vault records.
#[async_trait]
pub trait VaultRepository: Send + Sync {
    /// Create the vault if it does not exist, returning the stored record.
    /// Idempotent; an existing vault keeps its id and has its root updated.
    async fn ensure(&self, name: &str, root: &str) -> Result<Vault>;

    /// Look up a vault by name.
    async fn get_by_name(&self, name: &str) -> Result<Option<Vault>>;

    /// List all vaults.
    async fn list(&self) -> Result<Vec<Vault>>;
}

/// Repository for note records.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Look up a note by its `(vault_id, rel_path)` identity.
    async fn get_by_vault_and_path(&self, vault_id: i64, rel_path: &str)
        -> Result<Option<Note>>;

    /// Insert or update a note, returning its id. An existing
    /// `(vault_id, rel_path)` row keeps its id; hash, title, folder, and
    /// timestamp are replaced.
    async fn upsert(&self, record: NoteRecord) -> Result<Uuid>;

    /// Delete every note record (chunks cascade). Vault records are kept.
    async fn delete_all(&self) -> Result<()>;

    /// List distinct non-empty folder labels across the given vaults.
    /// An empty slice means all vaults.
    async fn list_unique_folders(&self, vault_ids: &[i64]) -> Result<Vec<String>>;
}

/// Repository for chunk records.
#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Insert the given chunks.
    async fn insert_all(&self, chunks: &[StoredChunk]) -> Result<()>;

    /// Delete all chunks belonging to a note.
    async fn delete_by_note(&self, note_id: Uuid) -> Result<()>;

    /// List the chunk ids belonging to a note.
    async fn list_ids_by_note(&self, note_id: Uuid) -> Result<Vec<String>>;

    /// Fetch a chunk by id.
    async fn get_by_id(&self, id: &str) -> Result<Option<StoredChunk>>;
}

// =============================================================================
// VECTOR STORE TRAIT
// =============================================================================

/// Store of `(id, vector, metadata)` points with cosine similarity search.
///
/// Filters support exact match on integer fields and prefix match on string
/// fields. Point ids mirror chunk ids; keeping the two stores aligned is the
/// pipeline's responsibility, not the store's.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the point collection for the given vector width if missing.
    /// Fails if the collection exists with a different width.
    async fn ensure_collection(&self, dim: usize) -> Result<()>;

    /// Whether the point collection exists.
    async fn collection_exists(&self) -> Result<bool>;

    /// Insert or replace points by id.
    async fn upsert(&self, points: Vec<Point>) -> Result<()>;

    /// Cosine similarity search, best first. Scores are raw cosine
    /// similarity in [-1, 1].
    async fn search(
        &self,
        vector: &Vector,
        limit: usize,
        filter: &PointFilter,
    ) -> Result<Vec<ScoredPoint>>;

    /// Delete points by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Delete every point in the collection.
    async fn clear(&self) -> Result<()>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts, one vector per input, each
    /// exactly `dimension()` wide. Over-length input surfaces as
    /// [`crate::Error::OversizeInput`].
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// The enforced vector width.
    fn dimension(&self) -> usize;

    /// The model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for chat completion.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Submit a sequence of role-tagged messages and return a single
    /// completion.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String>;

    /// The model name being used.
    fn model_name(&self) -> &str;
}
