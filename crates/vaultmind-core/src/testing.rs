//! In-memory implementations of the store capabilities.
//!
//! Always compiled so downstream crates can use them in integration tests.
//! These are plain implementations of the traits in [`crate::traits`], with
//! call counters so tests can assert on write behavior (e.g. the hash-skip
//! invariant).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::*;

/// Path-aware folder prefix test: an empty prefix matches everything, and
/// `a` matches `a` and `a/b` but not `ab`.
pub fn folder_matches_prefix(folder: &str, prefix: &str) -> bool {
    prefix.is_empty() || folder == prefix || folder.starts_with(&format!("{prefix}/"))
}

#[derive(Default)]
struct MetadataState {
    vaults: Vec<Vault>,
    notes: HashMap<Uuid, Note>,
    chunks: HashMap<String, StoredChunk>,
    next_vault_id: i64,
}

/// In-memory metadata store implementing the vault, note, and chunk
/// repositories over a single state table set, so note deletion can cascade
/// to chunks the way the relational backend does.
#[derive(Default)]
pub struct MemoryMetadataStore {
    state: Mutex<MetadataState>,
    /// Number of note upserts performed.
    pub note_upserts: AtomicU64,
    /// Number of chunk insert calls performed.
    pub chunk_inserts: AtomicU64,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored chunk count.
    pub fn chunk_count(&self) -> usize {
        self.state.lock().unwrap().chunks.len()
    }

    /// Total stored note count.
    pub fn note_count(&self) -> usize {
        self.state.lock().unwrap().notes.len()
    }

    /// All stored chunk ids, sorted.
    pub fn chunk_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().unwrap().chunks.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl VaultRepository for MemoryMetadataStore {
    async fn ensure(&self, name: &str, root: &str) -> Result<Vault> {
        let mut state = self.state.lock().unwrap();
        if let Some(v) = state.vaults.iter_mut().find(|v| v.name == name) {
            v.root = root.to_string();
            return Ok(v.clone());
        }
        state.next_vault_id += 1;
        let vault = Vault {
            id: state.next_vault_id,
            name: name.to_string(),
            root: root.to_string(),
        };
        state.vaults.push(vault.clone());
        Ok(vault)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Vault>> {
        let state = self.state.lock().unwrap();
        Ok(state.vaults.iter().find(|v| v.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Vault>> {
        Ok(self.state.lock().unwrap().vaults.clone())
    }
}

#[async_trait]
impl NoteRepository for MemoryMetadataStore {
    async fn get_by_vault_and_path(
        &self,
        vault_id: i64,
        rel_path: &str,
    ) -> Result<Option<Note>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .notes
            .values()
            .find(|n| n.vault_id == vault_id && n.rel_path == rel_path)
            .cloned())
    }

    async fn upsert(&self, record: NoteRecord) -> Result<Uuid> {
        self.note_upserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let existing = state
            .notes
            .values()
            .find(|n| n.vault_id == record.vault_id && n.rel_path == record.rel_path)
            .map(|n| n.id);
        let id = existing.unwrap_or_else(Uuid::now_v7);
        state.notes.insert(
            id,
            Note {
                id,
                vault_id: record.vault_id,
                rel_path: record.rel_path,
                folder: record.folder,
                title: record.title,
                content_hash: record.content_hash,
                updated_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn delete_all(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.notes.clear();
        state.chunks.clear();
        Ok(())
    }

    async fn list_unique_folders(&self, vault_ids: &[i64]) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut folders: Vec<String> = state
            .notes
            .values()
            .filter(|n| vault_ids.is_empty() || vault_ids.contains(&n.vault_id))
            .filter(|n| !n.folder.is_empty())
            .map(|n| n.folder.clone())
            .collect();
        folders.sort();
        folders.dedup();
        Ok(folders)
    }
}

#[async_trait]
impl ChunkRepository for MemoryMetadataStore {
    async fn insert_all(&self, chunks: &[StoredChunk]) -> Result<()> {
        self.chunk_inserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        for chunk in chunks {
            state.chunks.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn delete_by_note(&self, note_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.chunks.retain(|_, c| c.note_id != note_id);
        Ok(())
    }

    async fn list_ids_by_note(&self, note_id: Uuid) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut pairs: Vec<(i32, String)> = state
            .chunks
            .values()
            .filter(|c| c.note_id == note_id)
            .map(|c| (c.chunk_index, c.id.clone()))
            .collect();
        pairs.sort();
        Ok(pairs.into_iter().map(|(_, id)| id).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<StoredChunk>> {
        Ok(self.state.lock().unwrap().chunks.get(id).cloned())
    }
}

/// In-memory vector store with brute-force cosine search.
#[derive(Default)]
pub struct MemoryVectorStore {
    points: Mutex<HashMap<String, Point>>,
    dim: Mutex<Option<usize>>,
    /// Number of upsert calls performed.
    pub upsert_calls: AtomicU64,
    /// Number of delete calls performed.
    pub delete_calls: AtomicU64,
    /// When set, every operation fails with a vector-store error.
    pub fail: std::sync::atomic::AtomicBool,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored point count.
    pub fn point_count(&self) -> usize {
        self.points.lock().unwrap().len()
    }

    /// All stored point ids, sorted.
    pub fn point_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.points.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn check_fail(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::VectorStore("injected failure".into()));
        }
        Ok(())
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(&self, dim: usize) -> Result<()> {
        self.check_fail()?;
        let mut stored = self.dim.lock().unwrap();
        match *stored {
            Some(existing) if existing != dim => Err(Error::VectorStore(format!(
                "collection exists with dimension {existing}, requested {dim}"
            ))),
            _ => {
                *stored = Some(dim);
                Ok(())
            }
        }
    }

    async fn collection_exists(&self) -> Result<bool> {
        self.check_fail()?;
        Ok(self.dim.lock().unwrap().is_some())
    }

    async fn upsert(&self, points: Vec<Point>) -> Result<()> {
        self.check_fail()?;
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.points.lock().unwrap();
        for point in points {
            stored.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &Vector,
        limit: usize,
        filter: &PointFilter,
    ) -> Result<Vec<ScoredPoint>> {
        self.check_fail()?;
        let stored = self.points.lock().unwrap();
        let query = vector.as_slice();
        let mut hits: Vec<ScoredPoint> = stored
            .values()
            .filter(|p| {
                filter
                    .vault_id
                    .map_or(true, |vid| p.payload.vault_id == vid)
            })
            .filter(|p| {
                filter
                    .folder_prefix
                    .as_deref()
                    .map_or(true, |prefix| folder_matches_prefix(&p.payload.folder, prefix))
            })
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine(query, p.vector.as_slice()),
                payload: p.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        self.check_fail()?;
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.points.lock().unwrap();
        for id in ids {
            stored.remove(id);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check_fail()?;
        self.points.lock().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(vault_id: i64, folder: &str) -> PointPayload {
        PointPayload {
            vault_id,
            vault_name: "personal".into(),
            note_id: Uuid::nil(),
            rel_path: format!("{folder}/x.md"),
            folder: folder.into(),
            heading_path: "# X".into(),
            chunk_index: 0,
            note_title: "X".into(),
        }
    }

    fn point(id: &str, vec: Vec<f32>, vault_id: i64, folder: &str) -> Point {
        Point {
            id: id.into(),
            vector: Vector::from(vec),
            payload: payload(vault_id, folder),
        }
    }

    #[test]
    fn test_folder_prefix_is_path_aware() {
        assert!(folder_matches_prefix("a", "a"));
        assert!(folder_matches_prefix("a/b", "a"));
        assert!(!folder_matches_prefix("ab", "a"));
        assert!(folder_matches_prefix("anything", ""));
    }

    #[tokio::test]
    async fn test_vault_ensure_is_idempotent() {
        let store = MemoryMetadataStore::new();
        let a = store.ensure("personal", "/tmp/a").await.unwrap();
        let b = store.ensure("personal", "/tmp/b").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.root, "/tmp/b");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_note_upsert_preserves_id() {
        let store = MemoryMetadataStore::new();
        let record = NoteRecord {
            vault_id: 1,
            rel_path: "a.md".into(),
            folder: "".into(),
            title: "A".into(),
            content_hash: "sha256:aa".into(),
        };
        let first = store.upsert(record.clone()).await.unwrap();
        let second = store
            .upsert(NoteRecord {
                content_hash: "sha256:bb".into(),
                ..record
            })
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.note_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_notes_cascades_chunks() {
        let store = MemoryMetadataStore::new();
        let note_id = store
            .upsert(NoteRecord {
                vault_id: 1,
                rel_path: "a.md".into(),
                folder: "".into(),
                title: "A".into(),
                content_hash: "h".into(),
            })
            .await
            .unwrap();
        store
            .insert_all(&[StoredChunk {
                id: "c1".into(),
                note_id,
                chunk_index: 0,
                heading_path: "# A".into(),
                text: "body".into(),
            }])
            .await
            .unwrap();
        NoteRepository::delete_all(&store).await.unwrap();
        assert_eq!(store.note_count(), 0);
        assert_eq!(store.chunk_count(), 0);
    }

    #[tokio::test]
    async fn test_list_unique_folders_filters_and_dedupes() {
        let store = MemoryMetadataStore::new();
        for (vault_id, rel_path, folder) in [
            (1, "a/x.md", "a"),
            (1, "a/y.md", "a"),
            (1, "root.md", ""),
            (2, "b/z.md", "b"),
        ] {
            store
                .upsert(NoteRecord {
                    vault_id,
                    rel_path: rel_path.into(),
                    folder: folder.into(),
                    title: "t".into(),
                    content_hash: "h".into(),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.list_unique_folders(&[1]).await.unwrap(), vec!["a"]);
        assert_eq!(
            store.list_unique_folders(&[]).await.unwrap(),
            vec!["a", "b"]
        );
    }

    #[tokio::test]
    async fn test_vector_search_respects_filters() {
        let store = MemoryVectorStore::new();
        store.ensure_collection(2).await.unwrap();
        store
            .upsert(vec![
                point("p1", vec![1.0, 0.0], 1, "a"),
                point("p2", vec![1.0, 0.0], 1, "a/b"),
                point("p3", vec![1.0, 0.0], 2, "a"),
            ])
            .await
            .unwrap();

        let query = Vector::from(vec![1.0, 0.0]);
        let hits = store
            .search(&query, 10, &PointFilter::vault_folder(1, "a"))
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);

        let hits = store
            .search(&query, 10, &PointFilter::unrestricted())
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_vector_search_orders_by_similarity() {
        let store = MemoryVectorStore::new();
        store.ensure_collection(2).await.unwrap();
        store
            .upsert(vec![
                point("far", vec![0.0, 1.0], 1, ""),
                point("near", vec![1.0, 0.1], 1, ""),
            ])
            .await
            .unwrap();
        let hits = store
            .search(&Vector::from(vec![1.0, 0.0]), 10, &PointFilter::unrestricted())
            .await
            .unwrap();
        assert_eq!(hits[0].id, "near");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_ensure_collection_rejects_dimension_change() {
        let store = MemoryVectorStore::new();
        store.ensure_collection(4).await.unwrap();
        assert!(store.ensure_collection(8).await.is_err());
        assert!(store.ensure_collection(4).await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryVectorStore::new();
        store.fail.store(true, Ordering::SeqCst);
        let err = store.collection_exists().await.unwrap_err();
        assert!(err.is_upstream());
    }
}
