//! Provider abstractions for embeddings and text generation
//!
//! The pipeline only sees the traits, so the Ollama backends can be swapped
//! for the offline hashing embedder or for test doubles.

pub mod embedding;
pub mod hashing;
pub mod llm;
pub mod ollama;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use hashing::{HashingEmbedder, HASHING_MODEL};
pub use llm::LlmProvider;
pub use ollama::{OllamaEmbedder, OllamaLlm};

/// Build the embedding provider selected in the configuration
pub fn build_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.provider {
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(&config.llm, &config.embeddings)?),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.embeddings.dimensions)),
    };
    tracing::debug!(
        "Embedding provider: {} ({}, {} dims)",
        embedder.name(),
        embedder.model(),
        embedder.dimensions()
    );
    Ok(embedder)
}

/// Build the generation provider
pub fn build_llm(config: &RagConfig) -> Result<Arc<dyn LlmProvider>> {
    Ok(Arc::new(OllamaLlm::new(&config.llm)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_hashing_embedder() {
        let mut config = RagConfig::default();
        config.embeddings.provider = EmbeddingBackend::Hashing;
        config.embeddings.dimensions = 384;

        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.model(), HASHING_MODEL);
        // The configured Ollama model name does not describe this embedder
        assert_ne!(embedder.model(), config.embeddings.model);
        assert_eq!(embedder.dimensions(), 384);
    }

    #[test]
    fn test_build_ollama_embedder() {
        let embedder = build_embedder(&RagConfig::default()).unwrap();
        assert_eq!(embedder.name(), "ollama");
        assert_eq!(embedder.model(), "nomic-embed-text");
    }
}
