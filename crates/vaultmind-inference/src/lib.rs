//! # vaultmind-inference
//!
//! Embedding and chat backends for vaultmind.
//!
//! The [`ollama::OllamaBackend`] talks to an Ollama-compatible HTTP server
//! for both embeddings (`/api/embed`) and chat completion (`/api/chat`).
//! The [`mock::MockInferenceBackend`] is a deterministic stand-in for
//! tests.

pub mod config;
pub mod mock;
pub mod ollama;

pub use config::InferenceConfig;
pub use mock::MockInferenceBackend;
pub use ollama::OllamaBackend;
