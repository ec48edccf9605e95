//! The query engine: scope, retrieve, rerank, generate, cite, abstain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vaultmind_core::defaults;
use vaultmind_core::{
    AbstainReason, AskDebug, AskRequest, AskResponse, ChatBackend, ChunkRepository,
    EmbeddingBackend, Error, NoteRepository, PointFilter, Result, RetrievedChunk, ScopeDecision,
    ScoredPoint, Vault, VaultRepository, VectorStore,
};

use crate::citations::{contains_refusal, filter_references};
use crate::context::build_messages;
use crate::lexical::{overlap_score, question_terms};
use crate::rerank::{rerank, RerankWeights, Scored, ScoreNorm};
use crate::scope::select_folders;

/// Configuration for the query engine.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Whether to ask the chat backend to pick folders when the caller
    /// does not.
    pub folder_mode: bool,
    /// Whether an empty folder selection falls through to unrestricted
    /// search.
    pub folder_fallback: bool,
    /// Hybrid fusion weights.
    pub weights: RerankWeights,
    /// Vector score normalization scheme.
    pub score_norm: ScoreNorm,
    /// Oversampling factor applied to each per-scope search.
    pub oversample: usize,
    /// Answer emitted on abstention, and the primary refusal marker.
    pub refusal_phrase: String,
    /// Generation temperature.
    pub temperature: f32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            folder_mode: true,
            folder_fallback: true,
            weights: RerankWeights::default(),
            score_norm: ScoreNorm::default(),
            oversample: defaults::OVERSAMPLE_FACTOR,
            refusal_phrase: defaults::REFUSAL_PHRASE.to_string(),
            temperature: defaults::GEN_TEMPERATURE,
        }
    }
}

impl QueryConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `VAULTMIND_FOLDER_MODE` | `true` |
    /// | `VAULTMIND_FOLDER_FALLBACK` | `true` |
    /// | `VAULTMIND_W_VECTOR` | `0.7` |
    /// | `VAULTMIND_W_LEXICAL` | `0.3` |
    /// | `VAULTMIND_SCORE_NORM` | `global` |
    /// | `VAULTMIND_OVERSAMPLE` | `3` |
    /// | `VAULTMIND_REFUSAL_PHRASE` | built-in phrase |
    /// | `VAULTMIND_GEN_TEMPERATURE` | `0.3` |
    pub fn from_env() -> Self {
        let d = Self::default();
        let flag = |name: &str, default: bool| {
            std::env::var(name)
                .map(|v| v != "false" && v != "0")
                .unwrap_or(default)
        };
        Self {
            folder_mode: flag("VAULTMIND_FOLDER_MODE", d.folder_mode),
            folder_fallback: flag("VAULTMIND_FOLDER_FALLBACK", d.folder_fallback),
            weights: RerankWeights {
                vector: std::env::var("VAULTMIND_W_VECTOR")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(d.weights.vector),
                lexical: std::env::var("VAULTMIND_W_LEXICAL")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(d.weights.lexical),
            },
            score_norm: std::env::var("VAULTMIND_SCORE_NORM")
                .map(|v| ScoreNorm::parse(&v))
                .unwrap_or(d.score_norm),
            oversample: std::env::var("VAULTMIND_OVERSAMPLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(d.oversample),
            refusal_phrase: std::env::var("VAULTMIND_REFUSAL_PHRASE")
                .unwrap_or(d.refusal_phrase),
            temperature: std::env::var("VAULTMIND_GEN_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.temperature),
        }
    }

    /// Refusal markers checked against generated answers.
    fn refusal_markers(&self) -> Vec<String> {
        vec![
            self.refusal_phrase.clone(),
            "don't have enough information".to_string(),
            "do not have enough information".to_string(),
            "cannot answer".to_string(),
        ]
    }
}

/// Answers natural-language questions over the indexed corpus.
pub struct QueryEngine {
    vaults: Arc<dyn VaultRepository>,
    notes: Arc<dyn NoteRepository>,
    chunks: Arc<dyn ChunkRepository>,
    points: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingBackend>,
    chat: Arc<dyn ChatBackend>,
    config: QueryConfig,
}

impl QueryEngine {
    /// Create a new query engine over the given stores and backends.
    pub fn new(
        vaults: Arc<dyn VaultRepository>,
        notes: Arc<dyn NoteRepository>,
        chunks: Arc<dyn ChunkRepository>,
        points: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        chat: Arc<dyn ChatBackend>,
        config: QueryConfig,
    ) -> Self {
        Self {
            vaults,
            notes,
            chunks,
            points,
            embedder,
            chat,
            config,
        }
    }

    /// Answer a question. See the crate docs for the stage breakdown.
    pub async fn ask(
        &self,
        cancel: &CancellationToken,
        request: AskRequest,
    ) -> Result<AskResponse> {
        let start = Instant::now();

        // Validation consults nothing beyond the metadata store.
        let question = request.question.trim().to_string();
        if question.is_empty() {
            return Err(Error::Validation("question must not be empty".into()));
        }
        let k = request.k.unwrap_or(defaults::TOP_K_DEFAULT);
        if k == 0 || k > defaults::TOP_K_MAX {
            return Err(Error::Validation(format!(
                "k must be between 1 and {}",
                defaults::TOP_K_MAX
            )));
        }

        let scoped_vaults = self.resolve_vaults(&request.vaults).await?;
        let vault_ids: Vec<i64> = scoped_vaults.iter().map(|v| v.id).collect();

        // (a) Scope selection.
        let mut scope = ScopeDecision {
            vault_ids: vault_ids.clone(),
            ..ScopeDecision::default()
        };
        let folders = self
            .select_scope(&question, &request, &vault_ids, &mut scope)
            .await?;

        if folders.is_empty() && !scope.unrestricted {
            // Folder mode selected nothing and fallback is disabled:
            // the scope is empty, so retrieval cannot produce chunks.
            return Ok(self.abstain_response(&request, scope, Vec::new()));
        }

        if cancel.is_cancelled() {
            return Err(Error::Internal("ask cancelled".into()));
        }

        // (b) Query embedding.
        let mut vectors = self.embedder.embed_texts(&[question.clone()]).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| Error::Embedding("backend returned no vector".into()))?;

        // (c) Vector retrieval across the scope, merged by id.
        let merged = self
            .retrieve(cancel, &query_vector, k, &vault_ids, &request.vaults, &folders)
            .await?;

        if merged.is_empty() {
            debug!(
                subsystem = "query",
                component = "engine",
                op = "ask",
                "Retrieval produced no candidates, abstaining"
            );
            return Ok(self.abstain_response(&request, scope, Vec::new()));
        }

        // (d) Hybrid rerank.
        let retrieved = self.rerank_candidates(cancel, &question, merged, k).await?;
        if retrieved.is_empty() {
            return Ok(self.abstain_response(&request, scope, Vec::new()));
        }

        // (e) Context assembly and generation.
        let messages = build_messages(
            &question,
            &retrieved,
            request.detail,
            &self.config.refusal_phrase,
        );
        let answer = self
            .chat
            .complete(&messages, self.config.temperature, request.detail.max_tokens())
            .await?;

        // (f) Citation extraction and reference filtering.
        let references = filter_references(&answer, &retrieved);

        // (g) Abstention.
        let refused =
            references.is_empty() && contains_refusal(&answer, &self.config.refusal_markers());

        info!(
            subsystem = "query",
            component = "engine",
            op = "ask",
            result_count = retrieved.len(),
            reference_count = references.len(),
            abstained = refused,
            duration_ms = start.elapsed().as_millis() as u64,
            "Ask complete"
        );

        Ok(AskResponse {
            answer,
            references,
            abstained: refused,
            abstain_reason: refused.then_some(AbstainReason::InsufficientInformation),
            debug: request.debug.then(|| AskDebug {
                scope,
                chunks: retrieved,
            }),
        })
    }

    /// Resolve the request's vault allowlist. Unknown names are a
    /// validation error; an empty allowlist means all vaults.
    async fn resolve_vaults(&self, names: &[String]) -> Result<Vec<Vault>> {
        let all = self.vaults.list().await?;
        if names.is_empty() {
            return Ok(all);
        }
        let mut scoped = Vec::with_capacity(names.len());
        for name in names {
            match all.iter().find(|v| v.name == *name) {
                Some(vault) => scoped.push(vault.clone()),
                None => return Err(Error::VaultNotFound(name.clone())),
            }
        }
        Ok(scoped)
    }

    /// Decide the folder scope, recording the decision for debugging.
    /// Returns the folder labels to search; empty plus
    /// `scope.unrestricted` means search without a folder filter.
    async fn select_scope(
        &self,
        question: &str,
        request: &AskRequest,
        vault_ids: &[i64],
        scope: &mut ScopeDecision,
    ) -> Result<Vec<String>> {
        if !request.folders.is_empty() {
            scope.selected_folders = request.folders.clone();
            return Ok(request.folders.clone());
        }

        if !self.config.folder_mode {
            scope.unrestricted = true;
            return Ok(Vec::new());
        }

        let candidates = self.notes.list_unique_folders(vault_ids).await?;
        scope.candidate_folders = candidates.clone();
        if candidates.is_empty() {
            scope.unrestricted = true;
            return Ok(Vec::new());
        }

        let selected = select_folders(&self.chat, question, &candidates).await?;
        if selected.is_empty() {
            if self.config.folder_fallback {
                debug!(
                    subsystem = "query",
                    component = "scope",
                    "Empty folder selection, falling back to unrestricted"
                );
                scope.unrestricted = true;
            }
            return Ok(Vec::new());
        }

        scope.selected_folders = selected.clone();
        Ok(selected)
    }

    /// Search every (vault, folder) combination in scope, oversampled,
    /// merging results by point id with the maximum score.
    async fn retrieve(
        &self,
        cancel: &CancellationToken,
        query_vector: &vaultmind_core::Vector,
        k: usize,
        vault_ids: &[i64],
        requested_vaults: &[String],
        folders: &[String],
    ) -> Result<Vec<ScoredPoint>> {
        let mut filters = Vec::new();
        if folders.is_empty() {
            if requested_vaults.is_empty() {
                filters.push(PointFilter::unrestricted());
            } else {
                filters.extend(vault_ids.iter().map(|id| PointFilter::vault(*id)));
            }
        } else {
            for vault_id in vault_ids {
                for folder in folders {
                    filters.push(PointFilter::vault_folder(*vault_id, folder.clone()));
                }
            }
        }

        let limit = k * self.config.oversample;
        let mut merged: HashMap<String, ScoredPoint> = HashMap::new();
        for filter in &filters {
            if cancel.is_cancelled() {
                return Err(Error::Internal("ask cancelled".into()));
            }
            let hits = self.points.search(query_vector, limit, filter).await?;
            for hit in hits {
                merged
                    .entry(hit.id.clone())
                    .and_modify(|existing| {
                        if hit.score > existing.score {
                            existing.score = hit.score;
                        }
                    })
                    .or_insert(hit);
            }
        }

        let mut candidates: Vec<ScoredPoint> = merged.into_values().collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(candidates)
    }

    /// Fetch chunk bodies, score lexically, fuse, and keep the top `k`.
    /// Candidates whose chunk row has vanished (a note mid-reconciliation)
    /// are silently dropped.
    async fn rerank_candidates(
        &self,
        cancel: &CancellationToken,
        question: &str,
        candidates: Vec<ScoredPoint>,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let terms = question_terms(question);
        let mut scored = Vec::with_capacity(candidates.len());
        let mut by_id: HashMap<String, (ScoredPoint, String)> = HashMap::new();

        for candidate in candidates {
            if cancel.is_cancelled() {
                return Err(Error::Internal("ask cancelled".into()));
            }
            let Some(chunk) = self.chunks.get_by_id(&candidate.id).await? else {
                warn!(
                    subsystem = "query",
                    component = "engine",
                    "Point without chunk row, skipping candidate"
                );
                continue;
            };

            let text_prefix: String = chunk
                .text
                .chars()
                .take(defaults::LEXICAL_TEXT_PREFIX)
                .collect();
            let lexical = overlap_score(
                &terms,
                &format!("{} {}", candidate.payload.heading_path, text_prefix),
            );

            scored.push(Scored {
                id: candidate.id.clone(),
                raw_vector: candidate.score,
                lexical,
            });
            by_id.insert(candidate.id.clone(), (candidate, chunk.text));
        }

        let ranked = rerank(scored, self.config.weights, self.config.score_norm, k);

        Ok(ranked
            .into_iter()
            .filter_map(|r| {
                by_id.remove(&r.id).map(|(point, text)| RetrievedChunk {
                    id: r.id,
                    vault: point.payload.vault_name,
                    rel_path: point.payload.rel_path,
                    heading_path: point.payload.heading_path,
                    chunk_index: point.payload.chunk_index,
                    note_title: point.payload.note_title,
                    text,
                    score_vector: r.score_vector,
                    score_lexical: r.score_lexical,
                    score_final: r.score_final,
                })
            })
            .collect())
    }

    fn abstain_response(
        &self,
        request: &AskRequest,
        scope: ScopeDecision,
        chunks: Vec<RetrievedChunk>,
    ) -> AskResponse {
        AskResponse {
            answer: self.config.refusal_phrase.clone(),
            references: Vec::new(),
            abstained: true,
            abstain_reason: Some(AbstainReason::NoRelevantContext),
            debug: request.debug.then(|| AskDebug { scope, chunks }),
        }
    }
}
