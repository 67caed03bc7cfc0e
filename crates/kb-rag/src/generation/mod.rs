//! Prompt assembly and the Ollama generation client

pub mod ollama;
pub mod prompt;

pub use ollama::OllamaClient;
pub use prompt::{PromptTemplate, CONTEXT_DELIMITER};
