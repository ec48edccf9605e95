//! The indexing pipeline: discover notes, detect changes by content hash,
//! chunk, embed, and persist to the metadata and vector stores.
//!
//! Reconciliation is per note and mutates the stores in a fixed order so
//! the no-orphan-points invariant holds: old points are purged before old
//! chunk rows, and new chunk rows land before new points. A failure midway
//! leaves the note's hash mismatched, which guarantees a retry on the next
//! run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vaultmind_core::defaults;
use vaultmind_core::{
    chunk_id, content_hash, folder_of, ChunkRepository, EmbeddingBackend, Error, IndexCounters,
    IndexStatus, NoteRecord, NoteRepository, Point, PointPayload, Result, StoredChunk, Vault,
    VaultRepository, VectorStore,
};

use crate::chunker::{extract_title, ChunkerConfig, MarkdownChunker, NoteChunk};
use crate::walker::{walk_vault, NoteFile};

/// Configuration for the indexing pipeline.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Maximum vaults processed in parallel. `None` means one worker per
    /// vault.
    pub max_workers: Option<usize>,
    /// Character threshold used to identify over-limit chunks when the
    /// embedding provider rejects a batch as too long.
    pub max_embed_chars: usize,
    /// Chunker configuration.
    pub chunker: ChunkerConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            max_embed_chars: defaults::MAX_EMBED_CHARS,
            chunker: ChunkerConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `VAULTMIND_INDEX_WORKERS` | vault count | Max parallel vaults |
    /// | `VAULTMIND_MAX_EMBED_CHARS` | `32768` | Oversize chunk threshold |
    pub fn from_env() -> Self {
        let max_workers = std::env::var("VAULTMIND_INDEX_WORKERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0);

        let max_embed_chars = std::env::var("VAULTMIND_MAX_EMBED_CHARS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::MAX_EMBED_CHARS);

        Self {
            max_workers,
            max_embed_chars,
            chunker: ChunkerConfig::default(),
        }
    }
}

/// Per-run coverage counters, shared across vault workers.
#[derive(Default)]
struct RunCounters {
    notes_processed: AtomicU64,
    notes_unchanged: AtomicU64,
    notes_failed: AtomicU64,
    chunks_emitted: AtomicU64,
    chunks_skipped_oversize: AtomicU64,
}

impl RunCounters {
    fn snapshot(&self) -> IndexCounters {
        IndexCounters {
            notes_processed: self.notes_processed.load(Ordering::SeqCst),
            notes_unchanged: self.notes_unchanged.load(Ordering::SeqCst),
            notes_failed: self.notes_failed.load(Ordering::SeqCst),
            chunks_emitted: self.chunks_emitted.load(Ordering::SeqCst),
            chunks_skipped_oversize: self.chunks_skipped_oversize.load(Ordering::SeqCst),
        }
    }
}

type NoteLockMap = Mutex<HashMap<(i64, String), Arc<tokio::sync::Mutex<()>>>>;

/// The indexing pipeline.
#[derive(Clone)]
pub struct Indexer {
    vaults: Arc<dyn VaultRepository>,
    notes: Arc<dyn NoteRepository>,
    chunks: Arc<dyn ChunkRepository>,
    points: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingBackend>,
    chunker: MarkdownChunker,
    config: IndexerConfig,
    /// Process-wide guard: a second concurrent `index_all` gets `Busy`
    /// instead of queueing.
    run_lock: Arc<tokio::sync::Mutex<()>>,
    /// Per-note advisory locks keyed by `(vault_id, rel_path)`.
    note_locks: Arc<NoteLockMap>,
    status: Arc<Mutex<IndexStatus>>,
}

impl Indexer {
    /// Create a new indexing pipeline over the given stores and backend.
    pub fn new(
        vaults: Arc<dyn VaultRepository>,
        notes: Arc<dyn NoteRepository>,
        chunks: Arc<dyn ChunkRepository>,
        points: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            vaults,
            notes,
            chunks,
            points,
            embedder,
            chunker: MarkdownChunker::new(config.chunker.clone()),
            config,
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
            note_locks: Arc::new(Mutex::new(HashMap::new())),
            status: Arc::new(Mutex::new(IndexStatus::default())),
        }
    }

    /// Snapshot of the pipeline's current state.
    pub fn status(&self) -> IndexStatus {
        self.status.lock().unwrap().clone()
    }

    /// Walk every configured vault and reconcile its notes. Vaults are
    /// processed in parallel up to the worker bound; notes within a vault
    /// run sequentially. Returns `Busy` if a run is already in progress.
    pub async fn index_all(&self, cancel: &CancellationToken) -> Result<IndexCounters> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| Error::Busy("an indexing run is already in progress".into()))?;

        let start = Instant::now();
        self.status.lock().unwrap().running = true;

        let counters = Arc::new(RunCounters::default());
        let result = self.run_vaults(cancel, &counters).await;

        let snapshot = counters.snapshot();
        {
            let mut status = self.status.lock().unwrap();
            status.running = false;
            status.last_run = Some(snapshot);
        }

        info!(
            subsystem = "index",
            component = "pipeline",
            op = "index_all",
            notes_processed = snapshot.notes_processed,
            notes_unchanged = snapshot.notes_unchanged,
            notes_failed = snapshot.notes_failed,
            chunks_emitted = snapshot.chunks_emitted,
            chunks_skipped_oversize = snapshot.chunks_skipped_oversize,
            duration_ms = start.elapsed().as_millis() as u64,
            "Indexing run complete"
        );

        result.map(|_| snapshot)
    }

    async fn run_vaults(
        &self,
        cancel: &CancellationToken,
        counters: &Arc<RunCounters>,
    ) -> Result<()> {
        let vaults = self.vaults.list().await?;
        if vaults.is_empty() {
            return Ok(());
        }

        let workers = self.config.max_workers.unwrap_or(vaults.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for vault in vaults {
            let indexer = self.clone();
            let cancel = cancel.clone();
            let counters = counters.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                indexer.index_vault(&cancel, &vault, &counters).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(subsystem = "index", error = %e, "Vault worker panicked");
            }
        }
        Ok(())
    }

    /// Reconcile every note of one vault, sequentially.
    async fn index_vault(
        &self,
        cancel: &CancellationToken,
        vault: &Vault,
        counters: &RunCounters,
    ) {
        let files = match walk_vault(Path::new(&vault.root)) {
            Ok(files) => files,
            Err(e) => {
                warn!(
                    subsystem = "index",
                    component = "pipeline",
                    vault = %vault.name,
                    error = %e,
                    "Failed to walk vault"
                );
                return;
            }
        };

        debug!(
            subsystem = "index",
            component = "pipeline",
            vault = %vault.name,
            result_count = files.len(),
            "Vault walk complete"
        );

        for file in files {
            if cancel.is_cancelled() {
                info!(
                    subsystem = "index",
                    vault = %vault.name,
                    "Indexing cancelled"
                );
                return;
            }
            if let Err(e) = self.reconcile(cancel, vault, &file, counters).await {
                counters.notes_failed.fetch_add(1, Ordering::SeqCst);
                warn!(
                    subsystem = "index",
                    component = "pipeline",
                    vault = %vault.name,
                    rel_path = %file.rel_path,
                    error = %e,
                    "Note reconciliation failed"
                );
            }
        }
    }

    /// Reconcile one note by vault name and relative path.
    pub async fn index_note(
        &self,
        cancel: &CancellationToken,
        vault_name: &str,
        rel_path: &str,
    ) -> Result<IndexCounters> {
        let vault = self
            .vaults
            .get_by_name(vault_name)
            .await?
            .ok_or_else(|| Error::VaultNotFound(vault_name.to_string()))?;

        let file = NoteFile {
            folder: folder_of(rel_path),
            rel_path: rel_path.to_string(),
        };
        let counters = RunCounters::default();
        self.reconcile(cancel, &vault, &file, &counters).await?;
        Ok(counters.snapshot())
    }

    /// Delete every chunk, every point, and every note record. Vault
    /// records are kept.
    pub async fn clear_all(&self) -> Result<()> {
        self.points.clear().await?;
        self.notes.delete_all().await?;
        self.status.lock().unwrap().last_run = None;
        info!(
            subsystem = "index",
            component = "pipeline",
            op = "clear_all",
            "Index cleared"
        );
        Ok(())
    }

    fn note_lock(&self, vault_id: i64, rel_path: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.note_locks.lock().unwrap();
        locks
            .entry((vault_id, rel_path.to_string()))
            .or_default()
            .clone()
    }

    /// The only state transition that mutates the stores.
    async fn reconcile(
        &self,
        cancel: &CancellationToken,
        vault: &Vault,
        file: &NoteFile,
        counters: &RunCounters,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let lock = self.note_lock(vault.id, &file.rel_path);
        let _note_guard = lock.lock().await;

        let path = Path::new(&vault.root).join(&file.rel_path);
        let bytes = tokio::fs::read(&path).await?;
        let hash = content_hash(&bytes);

        counters.notes_processed.fetch_add(1, Ordering::SeqCst);

        let existing = self
            .notes
            .get_by_vault_and_path(vault.id, &file.rel_path)
            .await?;

        if existing
            .as_ref()
            .is_some_and(|note| note.content_hash == hash)
        {
            counters.notes_unchanged.fetch_add(1, Ordering::SeqCst);
            debug!(
                subsystem = "index",
                component = "pipeline",
                vault = %vault.name,
                rel_path = %file.rel_path,
                "Note unchanged, skipping"
            );
            return Ok(());
        }

        let text = String::from_utf8_lossy(&bytes);
        let title = extract_title(&text, &file.rel_path);
        let note_chunks = self.chunker.chunk(&text, &title);

        let (kept, vectors) = self.embed_chunks(vault, file, note_chunks, counters).await?;

        let prev_ids = match &existing {
            Some(note) => self.chunks.list_ids_by_note(note.id).await?,
            None => Vec::new(),
        };

        // Ordered mutation protocol: purge old points, then old chunk
        // rows, then upsert the note, insert new chunks, upsert new
        // points. Old points must go first so no point ever outlives a
        // replacement cycle.
        self.points.delete(&prev_ids).await?;
        if let Some(note) = &existing {
            self.chunks.delete_by_note(note.id).await?;
        }

        let note_id = self
            .notes
            .upsert(NoteRecord {
                vault_id: vault.id,
                rel_path: file.rel_path.clone(),
                folder: file.folder.clone(),
                title: title.clone(),
                content_hash: hash,
            })
            .await?;

        let stored: Vec<StoredChunk> = kept
            .iter()
            .enumerate()
            .map(|(index, (id, chunk))| StoredChunk {
                id: id.clone(),
                note_id,
                chunk_index: index as i32,
                heading_path: chunk.heading_path.clone(),
                text: chunk.text.clone(),
            })
            .collect();
        self.chunks.insert_all(&stored).await?;

        let points: Vec<Point> = stored
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| Point {
                id: chunk.id.clone(),
                vector,
                payload: PointPayload {
                    vault_id: vault.id,
                    vault_name: vault.name.clone(),
                    note_id,
                    rel_path: file.rel_path.clone(),
                    folder: file.folder.clone(),
                    heading_path: chunk.heading_path.clone(),
                    chunk_index: chunk.chunk_index,
                    note_title: title.clone(),
                },
            })
            .collect();
        self.points.upsert(points).await?;

        counters
            .chunks_emitted
            .fetch_add(stored.len() as u64, Ordering::SeqCst);

        debug!(
            subsystem = "index",
            component = "pipeline",
            vault = %vault.name,
            rel_path = %file.rel_path,
            chunk_count = stored.len(),
            "Note reconciled"
        );
        Ok(())
    }

    /// Embed all chunk texts in one batched call. When the provider
    /// rejects the batch as too long, over-limit chunks are dropped and
    /// counted, and the remainder is retried; the note is never aborted
    /// for oversize input alone.
    async fn embed_chunks(
        &self,
        vault: &Vault,
        file: &NoteFile,
        note_chunks: Vec<NoteChunk>,
        counters: &RunCounters,
    ) -> Result<(Vec<(String, NoteChunk)>, Vec<vaultmind_core::Vector>)> {
        let mut kept: Vec<(String, NoteChunk)> = note_chunks
            .into_iter()
            .map(|chunk| {
                let id = chunk_id(vault.id, &file.rel_path, &chunk.heading_path, &chunk.text);
                (id, chunk)
            })
            .collect();

        let texts: Vec<String> = kept.iter().map(|(_, c)| c.text.clone()).collect();
        if texts.is_empty() {
            return Ok((kept, Vec::new()));
        }

        match self.embedder.embed_texts(&texts).await {
            Ok(vectors) => Ok((kept, vectors)),
            Err(Error::OversizeInput(msg)) => {
                let before = kept.len();
                kept.retain(|(_, c)| c.text.chars().count() <= self.config.max_embed_chars);
                let dropped = before - kept.len();
                if dropped == 0 {
                    return Err(Error::Embedding(format!(
                        "provider rejected batch as too long but no chunk exceeds {} chars: {msg}",
                        self.config.max_embed_chars
                    )));
                }
                counters
                    .chunks_skipped_oversize
                    .fetch_add(dropped as u64, Ordering::SeqCst);
                warn!(
                    subsystem = "index",
                    component = "pipeline",
                    vault = %vault.name,
                    rel_path = %file.rel_path,
                    chunk_count = dropped,
                    "Dropped oversize chunks"
                );

                let retry_texts: Vec<String> = kept.iter().map(|(_, c)| c.text.clone()).collect();
                let vectors = if retry_texts.is_empty() {
                    Vec::new()
                } else {
                    self.embedder.embed_texts(&retry_texts).await?
                };
                Ok((kept, vectors))
            }
            Err(e) => Err(e),
        }
    }
}
