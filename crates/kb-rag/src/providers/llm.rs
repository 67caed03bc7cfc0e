//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;

/// Trait for text generation
///
/// Given a fully assembled prompt, produce a completion of at most
/// `max_tokens` tokens. Implementations surface failures as
/// [`Error::Generation`](crate::Error::Generation) and do not retry.
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (tinyllama, phi3, fine-tuned models, ...)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
