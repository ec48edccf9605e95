//! Data model for vaultmind: vaults, notes, chunks, vector points, and the
//! ask request/response contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Vector type used throughout (pgvector-compatible).
pub use pgvector::Vector;

use crate::defaults;

// =============================================================================
// VAULTS AND NOTES
// =============================================================================

/// A named root directory of Markdown files.
///
/// Vaults are created on first startup and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    /// Opaque integer id assigned by the metadata store.
    pub id: i64,
    /// Unique short name, e.g. `personal`.
    pub name: String,
    /// Root directory on disk.
    pub root: String,
}

/// A Markdown note identified by `(vault_id, rel_path)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Stable id, preserved across re-indexes.
    pub id: Uuid,
    pub vault_id: i64,
    /// Path relative to the vault root, forward-slash separated.
    pub rel_path: String,
    /// Directory portion of `rel_path`; empty for root-level files.
    pub folder: String,
    /// Title extracted from the first heading, or the filename stem.
    pub title: String,
    /// Content hash of the raw file bytes, `sha256:<hex>`.
    pub content_hash: String,
    pub updated_at: DateTime<Utc>,
}

/// Fields written when reconciling a note. The repository preserves the
/// existing note id when the `(vault_id, rel_path)` pair is already known.
#[derive(Debug, Clone)]
pub struct NoteRecord {
    pub vault_id: i64,
    pub rel_path: String,
    pub folder: String,
    pub title: String,
    pub content_hash: String,
}

/// A bounded piece of a note's text carrying a heading-path label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Deterministic id, see [`crate::identity::chunk_id`].
    pub id: String,
    pub note_id: Uuid,
    /// Position within the note in traversal order, starting at 0.
    pub chunk_index: i32,
    /// Serialized heading stack, e.g. `# H1 > ## H2`.
    pub heading_path: String,
    pub text: String,
}

// =============================================================================
// VECTOR POINTS
// =============================================================================

/// Metadata stored alongside every vector point.
///
/// Field names are part of the wire contract with evaluators and must be
/// preserved byte-for-byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub vault_id: i64,
    pub vault_name: String,
    pub note_id: Uuid,
    pub rel_path: String,
    pub folder: String,
    pub heading_path: String,
    pub chunk_index: i32,
    pub note_title: String,
}

/// A point to be upserted into the vector store. The id mirrors the chunk id.
#[derive(Debug, Clone)]
pub struct Point {
    pub id: String,
    pub vector: Vector,
    pub payload: PointPayload,
}

/// A search hit from the vector store. `score` is raw cosine similarity.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: PointPayload,
}

/// Metadata filter for vector searches: exact match on the integer vault id
/// and prefix match on the folder label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointFilter {
    pub vault_id: Option<i64>,
    pub folder_prefix: Option<String>,
}

impl PointFilter {
    /// Filter matching every point.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Filter scoped to a single vault.
    pub fn vault(vault_id: i64) -> Self {
        Self {
            vault_id: Some(vault_id),
            folder_prefix: None,
        }
    }

    /// Filter scoped to a (vault, folder-prefix) pair.
    pub fn vault_folder(vault_id: i64, folder: impl Into<String>) -> Self {
        Self {
            vault_id: Some(vault_id),
            folder_prefix: Some(folder.into()),
        }
    }
}

// =============================================================================
// CHAT MESSAGES
// =============================================================================

/// Role tag on a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single role-tagged message in a chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

// =============================================================================
// ASK REQUEST / RESPONSE
// =============================================================================

/// Requested answer length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Brief,
    #[default]
    Normal,
    Detailed,
}

impl DetailLevel {
    /// Token cap applied to generation for this level.
    pub fn max_tokens(self) -> u32 {
        match self {
            DetailLevel::Brief => defaults::MAX_TOKENS_BRIEF,
            DetailLevel::Normal => defaults::MAX_TOKENS_NORMAL,
            DetailLevel::Detailed => defaults::MAX_TOKENS_DETAILED,
        }
    }

    /// Prose-length directive embedded in the system prompt.
    pub fn directive(self) -> &'static str {
        match self {
            DetailLevel::Brief => "Answer in 2-3 sentences.",
            DetailLevel::Normal => "Answer in a focused paragraph or two.",
            DetailLevel::Detailed => "Give a thorough, structured answer.",
        }
    }
}

/// A question over the indexed corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Optional allowlist of vault names; empty means all vaults.
    #[serde(default)]
    pub vaults: Vec<String>,
    /// Optional allowlist of folder paths; empty means model-selected or
    /// unrestricted depending on configuration.
    #[serde(default)]
    pub folders: Vec<String>,
    /// Top-K chunks to retrieve. Defaults to 5, capped at 20.
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub detail: DetailLevel,
    #[serde(default)]
    pub debug: bool,
}

/// A retrieved chunk that was cited by the generated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub vault: String,
    pub rel_path: String,
    pub heading_path: String,
    pub chunk_index: i32,
}

/// Why the engine declined to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstainReason {
    /// Retrieval produced zero chunks after scoping.
    NoRelevantContext,
    /// The model refused and no citations were extracted.
    InsufficientInformation,
}

impl AbstainReason {
    pub fn as_str(self) -> &'static str {
        match self {
            AbstainReason::NoRelevantContext => "no_relevant_context",
            AbstainReason::InsufficientInformation => "insufficient_information",
        }
    }
}

/// A candidate chunk after retrieval and reranking. Returned in the debug
/// block when the caller sets `debug`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub vault: String,
    pub rel_path: String,
    pub heading_path: String,
    pub chunk_index: i32,
    pub note_title: String,
    pub text: String,
    pub score_vector: f32,
    pub score_lexical: f32,
    pub score_final: f32,
}

/// The folder-selection decision made during scoping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeDecision {
    /// Vault ids considered for retrieval.
    pub vault_ids: Vec<i64>,
    /// Folder labels offered to the selector.
    pub candidate_folders: Vec<String>,
    /// Folder labels actually searched; empty means unrestricted.
    pub selected_folders: Vec<String>,
    /// True when folder scoping was skipped or fell through.
    pub unrestricted: bool,
}

/// Diagnostics attached to a response when `debug` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskDebug {
    pub scope: ScopeDecision,
    pub chunks: Vec<RetrievedChunk>,
}

/// The engine's answer to an [`AskRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub references: Vec<Reference>,
    pub abstained: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstain_reason: Option<AbstainReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<AskDebug>,
}

// =============================================================================
// INDEX STATUS
// =============================================================================

/// Coverage counters reported by the indexing pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCounters {
    pub notes_processed: u64,
    pub notes_unchanged: u64,
    pub notes_failed: u64,
    pub chunks_emitted: u64,
    pub chunks_skipped_oversize: u64,
}

/// Snapshot of the pipeline's state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStatus {
    /// Whether an `index_all` run is currently in progress.
    pub running: bool,
    /// Counters from the most recent completed run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<IndexCounters>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_level_default_is_normal() {
        assert_eq!(DetailLevel::default(), DetailLevel::Normal);
    }

    #[test]
    fn test_detail_level_serde_lowercase() {
        assert_eq!(serde_json::to_string(&DetailLevel::Brief).unwrap(), "\"brief\"");
        let d: DetailLevel = serde_json::from_str("\"detailed\"").unwrap();
        assert_eq!(d, DetailLevel::Detailed);
    }

    #[test]
    fn test_detail_level_token_caps_increase() {
        assert!(DetailLevel::Brief.max_tokens() < DetailLevel::Normal.max_tokens());
        assert!(DetailLevel::Normal.max_tokens() < DetailLevel::Detailed.max_tokens());
    }

    #[test]
    fn test_abstain_reason_wire_strings() {
        assert_eq!(
            serde_json::to_string(&AbstainReason::NoRelevantContext).unwrap(),
            "\"no_relevant_context\""
        );
        assert_eq!(
            AbstainReason::InsufficientInformation.as_str(),
            "insufficient_information"
        );
    }

    #[test]
    fn test_ask_request_deserialize_minimal() {
        let req: AskRequest = serde_json::from_str(r#"{"question":"what is a vault?"}"#).unwrap();
        assert_eq!(req.question, "what is a vault?");
        assert!(req.vaults.is_empty());
        assert!(req.folders.is_empty());
        assert!(req.k.is_none());
        assert_eq!(req.detail, DetailLevel::Normal);
        assert!(!req.debug);
    }

    #[test]
    fn test_ask_response_omits_empty_optionals() {
        let resp = AskResponse {
            answer: "yes".into(),
            references: vec![],
            abstained: false,
            abstain_reason: None,
            debug: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("abstain_reason"));
        assert!(!json.contains("debug"));
    }

    #[test]
    fn test_point_payload_field_names_are_contract() {
        let payload = PointPayload {
            vault_id: 1,
            vault_name: "personal".into(),
            note_id: Uuid::nil(),
            rel_path: "notes/tips.md".into(),
            folder: "notes".into(),
            heading_path: "# Go Tips".into(),
            chunk_index: 0,
            note_title: "Go Tips".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        for key in [
            "vault_id",
            "vault_name",
            "note_id",
            "rel_path",
            "folder",
            "heading_path",
            "chunk_index",
            "note_title",
        ] {
            assert!(json.get(key).is_some(), "missing payload field {key}");
        }
    }

    #[test]
    fn test_point_filter_constructors() {
        assert_eq!(PointFilter::unrestricted(), PointFilter::default());
        let f = PointFilter::vault_folder(3, "a/b");
        assert_eq!(f.vault_id, Some(3));
        assert_eq!(f.folder_prefix.as_deref(), Some("a/b"));
    }

    #[test]
    fn test_chat_message_constructors() {
        let m = ChatMessage::system("be terse");
        assert_eq!(m.role, ChatRole::System);
        let m = ChatMessage::user("hello");
        assert_eq!(m.role, ChatRole::User);
    }

    #[test]
    fn test_index_counters_default_zeroed() {
        let c = IndexCounters::default();
        assert_eq!(c.notes_processed, 0);
        assert_eq!(c.chunks_skipped_oversize, 0);
    }
}
