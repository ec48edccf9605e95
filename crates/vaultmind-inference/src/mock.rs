//! Mock inference backend for deterministic testing.
//!
//! Implements both [`EmbeddingBackend`] and [`ChatBackend`] with
//! content-derived embeddings, scripted chat replies, a call log, and
//! failure injection.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vaultmind_inference::mock::MockInferenceBackend;
//!
//! let backend = MockInferenceBackend::new()
//!     .with_dimension(8)
//!     .with_reply("The answer [File: notes/tips.md, Section: Go Tips]");
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use vaultmind_core::{ChatBackend, ChatMessage, EmbeddingBackend, Error, Result, Vector};

/// Mock inference backend for testing.
#[derive(Clone, Default)]
pub struct MockInferenceBackend {
    inner: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    dimension: Mutex<usize>,
    /// Replies consumed in order; the last one repeats once the queue
    /// drains.
    replies: Mutex<VecDeque<String>>,
    default_reply: Mutex<String>,
    /// Exact-text embedding overrides.
    fixed_embeddings: Mutex<HashMap<String, Vec<f32>>>,
    /// Inputs longer than this are rejected as oversize (0 = unlimited).
    max_embed_chars: Mutex<usize>,
    fail_embeddings: AtomicBool,
    fail_chat: AtomicBool,
    embed_calls: AtomicU64,
    chat_calls: AtomicU64,
    embedded_texts: Mutex<Vec<String>>,
    chat_transcripts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockInferenceBackend {
    /// Create a new mock backend with an 8-wide embedding space.
    pub fn new() -> Self {
        let backend = Self::default();
        *backend.inner.dimension.lock().unwrap() = 8;
        *backend.inner.default_reply.lock().unwrap() = "Mock reply".to_string();
        backend
    }

    /// Set the embedding dimension.
    pub fn with_dimension(self, dimension: usize) -> Self {
        *self.inner.dimension.lock().unwrap() = dimension;
        self
    }

    /// Set the fallback chat reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        *self.inner.default_reply.lock().unwrap() = reply.into();
        self
    }

    /// Queue a scripted chat reply; queued replies are consumed in order
    /// before the fallback is used.
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.inner.replies.lock().unwrap().push_back(reply.into());
    }

    /// Fix the embedding returned for an exact input text.
    pub fn with_embedding_for(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.inner
            .fixed_embeddings
            .lock()
            .unwrap()
            .insert(text.into(), vector);
        self
    }

    /// Reject inputs above the given character count as oversize,
    /// simulating the provider's context-window limit.
    pub fn with_max_embed_chars(self, max: usize) -> Self {
        *self.inner.max_embed_chars.lock().unwrap() = max;
        self
    }

    /// Make every embedding call fail with a generic error.
    pub fn fail_embeddings(&self, fail: bool) {
        self.inner.fail_embeddings.store(fail, Ordering::SeqCst);
    }

    /// Make every chat call fail.
    pub fn fail_chat(&self, fail: bool) {
        self.inner.fail_chat.store(fail, Ordering::SeqCst);
    }

    /// Number of embedding calls made.
    pub fn embed_calls(&self) -> u64 {
        self.inner.embed_calls.load(Ordering::SeqCst)
    }

    /// Number of chat calls made.
    pub fn chat_calls(&self) -> u64 {
        self.inner.chat_calls.load(Ordering::SeqCst)
    }

    /// Every text that has been embedded, in call order.
    pub fn embedded_texts(&self) -> Vec<String> {
        self.inner.embedded_texts.lock().unwrap().clone()
    }

    /// Every message list submitted to chat, in call order.
    pub fn chat_transcripts(&self) -> Vec<Vec<ChatMessage>> {
        self.inner.chat_transcripts.lock().unwrap().clone()
    }

    /// Deterministic embedding derived from the text's SHA-256 digest.
    fn derive_embedding(text: &str, dimension: usize) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        (0..dimension)
            .map(|i| {
                let byte = digest[i % digest.len()];
                (byte as f32 / 255.0) - 0.5
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingBackend for MockInferenceBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        self.inner.embed_calls.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_embeddings.load(Ordering::SeqCst) {
            return Err(Error::Embedding("injected embedding failure".into()));
        }

        let max = *self.inner.max_embed_chars.lock().unwrap();
        if max > 0 {
            if let Some(long) = texts.iter().find(|t| t.chars().count() > max) {
                return Err(Error::OversizeInput(format!(
                    "input of {} chars exceeds limit {max}",
                    long.chars().count()
                )));
            }
        }

        self.inner
            .embedded_texts
            .lock()
            .unwrap()
            .extend(texts.iter().cloned());

        let dimension = *self.inner.dimension.lock().unwrap();
        let fixed = self.inner.fixed_embeddings.lock().unwrap();
        Ok(texts
            .iter()
            .map(|text| {
                let values = fixed
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| Self::derive_embedding(text, dimension));
                Vector::from(values)
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        *self.inner.dimension.lock().unwrap()
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

#[async_trait]
impl ChatBackend for MockInferenceBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String> {
        self.inner.chat_calls.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_chat.load(Ordering::SeqCst) {
            return Err(Error::Inference("injected chat failure".into()));
        }

        self.inner
            .chat_transcripts
            .lock()
            .unwrap()
            .push(messages.to_vec());

        let mut replies = self.inner.replies.lock().unwrap();
        Ok(replies
            .pop_front()
            .unwrap_or_else(|| self.inner.default_reply.lock().unwrap().clone()))
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embeddings_are_deterministic() {
        let backend = MockInferenceBackend::new().with_dimension(16);
        let texts = vec!["hello world".to_string()];
        let a = backend.embed_texts(&texts).await.unwrap();
        let b = backend.embed_texts(&texts).await.unwrap();
        assert_eq!(a[0].as_slice(), b[0].as_slice());
        assert_eq!(a[0].as_slice().len(), 16);
    }

    #[tokio::test]
    async fn test_distinct_texts_get_distinct_embeddings() {
        let backend = MockInferenceBackend::new();
        let vecs = backend
            .embed_texts(&["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();
        assert_ne!(vecs[0].as_slice(), vecs[1].as_slice());
    }

    #[tokio::test]
    async fn test_fixed_embedding_override() {
        let backend = MockInferenceBackend::new()
            .with_dimension(2)
            .with_embedding_for("pinned", vec![1.0, 0.0]);
        let vecs = backend.embed_texts(&["pinned".to_string()]).await.unwrap();
        assert_eq!(vecs[0].as_slice(), &[1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_oversize_rejection() {
        let backend = MockInferenceBackend::new().with_max_embed_chars(10);
        let err = backend
            .embed_texts(&["a".repeat(50)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OversizeInput(_)));
    }

    #[tokio::test]
    async fn test_scripted_replies_consumed_in_order() {
        let backend = MockInferenceBackend::new().with_reply("fallback");
        backend.push_reply("first");
        backend.push_reply("second");

        let msgs = [ChatMessage::user("q")];
        assert_eq!(backend.complete(&msgs, 0.0, 10).await.unwrap(), "first");
        assert_eq!(backend.complete(&msgs, 0.0, 10).await.unwrap(), "second");
        assert_eq!(backend.complete(&msgs, 0.0, 10).await.unwrap(), "fallback");
        assert_eq!(backend.chat_calls(), 3);
    }

    #[tokio::test]
    async fn test_call_log_records_inputs() {
        let backend = MockInferenceBackend::new();
        backend.embed_texts(&["t1".to_string()]).await.unwrap();
        backend
            .complete(&[ChatMessage::user("q1")], 0.0, 10)
            .await
            .unwrap();

        assert_eq!(backend.embedded_texts(), vec!["t1"]);
        assert_eq!(backend.chat_transcripts().len(), 1);
        assert_eq!(backend.chat_transcripts()[0][0].content, "q1");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MockInferenceBackend::new();
        backend.fail_embeddings(true);
        assert!(backend.embed_texts(&["x".to_string()]).await.is_err());
        backend.fail_embeddings(false);
        assert!(backend.embed_texts(&["x".to_string()]).await.is_ok());
    }
}
