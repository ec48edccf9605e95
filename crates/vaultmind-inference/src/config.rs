//! Inference backend configuration.

use vaultmind_core::defaults;

/// Configuration for the Ollama backend.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Embedding model name.
    pub embed_model: String,
    /// Enforced embedding vector width.
    pub embed_dimension: usize,
    /// Chat/generation model name.
    pub gen_model: String,
    /// Timeout for embedding requests in seconds.
    pub embed_timeout_secs: u64,
    /// Timeout for generation requests in seconds.
    pub gen_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OLLAMA_URL.to_string(),
            embed_model: defaults::EMBED_MODEL.to_string(),
            embed_dimension: defaults::EMBED_DIMENSION,
            gen_model: defaults::GEN_MODEL.to_string(),
            embed_timeout_secs: defaults::EMBED_TIMEOUT_SECS,
            gen_timeout_secs: defaults::GEN_TIMEOUT_SECS,
        }
    }
}

impl InferenceConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OLLAMA_BASE` | `http://127.0.0.1:11434` |
    /// | `VAULTMIND_EMBED_MODEL` | `nomic-embed-text` |
    /// | `VAULTMIND_EMBED_DIM` | `768` |
    /// | `VAULTMIND_GEN_MODEL` | `qwen3:8b` |
    /// | `VAULTMIND_EMBED_TIMEOUT_SECS` | `30` |
    /// | `VAULTMIND_GEN_TIMEOUT_SECS` | `120` |
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: std::env::var("OLLAMA_BASE").unwrap_or(d.base_url),
            embed_model: std::env::var("VAULTMIND_EMBED_MODEL").unwrap_or(d.embed_model),
            embed_dimension: std::env::var("VAULTMIND_EMBED_DIM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.embed_dimension),
            gen_model: std::env::var("VAULTMIND_GEN_MODEL").unwrap_or(d.gen_model),
            embed_timeout_secs: std::env::var("VAULTMIND_EMBED_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.embed_timeout_secs),
            gen_timeout_secs: std::env::var("VAULTMIND_GEN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.gen_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();
        assert_eq!(config.base_url, defaults::OLLAMA_URL);
        assert_eq!(config.embed_dimension, defaults::EMBED_DIMENSION);
        assert_eq!(config.embed_model, defaults::EMBED_MODEL);
    }
}
