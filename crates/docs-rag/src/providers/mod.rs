//! Provider abstractions for embeddings and LLM generation
//!
//! Trait objects let the pipeline switch between a local Ollama server and an
//! OpenAI-compatible remote API without touching retrieval or generation code.

pub mod embedding;
pub mod lines;
pub mod llm;
pub mod ollama;
pub mod remote;

use std::sync::Arc;

pub use embedding::EmbeddingProvider;
pub use llm::{LlmProvider, TextStream};

use crate::config::{BackendProvider, RagConfig};
use crate::error::Result;

/// Shared embedding provider
pub type SharedEmbedder = Arc<dyn EmbeddingProvider>;
/// Shared LLM provider
pub type SharedLlm = Arc<dyn LlmProvider>;

/// Build only the embedder (offline index builds need no LLM)
pub fn build_embedder(config: &RagConfig) -> Result<SharedEmbedder> {
    let dimensions = config.embeddings.dimensions;

    let embedder: SharedEmbedder = match config.backend {
        BackendProvider::Local => {
            tracing::info!("Using Ollama embeddings at {}", config.llm.base_url);
            Arc::new(ollama::OllamaEmbedder::new(&config.llm, dimensions)?)
        }
        BackendProvider::Remote => {
            tracing::info!("Using remote embeddings at {}", config.remote.base_url);
            let client = Arc::new(remote::RemoteClient::new(&config.remote)?);
            Arc::new(remote::RemoteEmbedder::from_client(
                client,
                dimensions,
                config.remote.embed_model.clone(),
            ))
        }
    };
    Ok(embedder)
}

/// Build only the LLM
pub fn build_llm(config: &RagConfig) -> Result<SharedLlm> {
    let llm: SharedLlm = match config.backend {
        BackendProvider::Local => Arc::new(ollama::OllamaLlm::new(&config.llm)?),
        BackendProvider::Remote => {
            let client = Arc::new(remote::RemoteClient::new(&config.remote)?);
            Arc::new(remote::RemoteLlm::from_client(
                client,
                config.remote.generate_model.clone(),
            ))
        }
    };
    Ok(llm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_local_providers() {
        let config = RagConfig::default();
        let embedder = build_embedder(&config).unwrap();
        let llm = build_llm(&config).unwrap();
        assert_eq!(embedder.name(), "ollama");
        assert_eq!(embedder.model_id(), config.embedding_model_id());
        assert_eq!(llm.model(), "qwen2.5:7b");
    }

    #[test]
    fn test_remote_needs_key() {
        let mut config = RagConfig {
            backend: BackendProvider::Remote,
            ..Default::default()
        };
        assert!(matches!(build_llm(&config), Err(Error::Config(_))));

        config.remote.api_key = Some("sk-test".to_string());
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.model_id(), "remote:text-embedding-v3");
    }
}
