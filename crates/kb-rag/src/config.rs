//! Configuration for the knowledge base and answering pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::retrieval::DistanceMetric;

/// File name looked up in the working directory when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "kb-rag.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Knowledge store configuration
    pub store: StoreConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Answering pipeline configuration
    pub pipeline: PipelineConfig,
    /// Learning data and fine-tuning configuration
    pub learning: LearningConfig,
    /// Health server configuration
    pub server: ServerConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: RagConfig = toml::from_str(&raw).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else `kb-rag.toml` in the working directory, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    tracing::info!("Loading configuration from {}", local.display());
                    Self::from_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.store.collection.trim().is_empty() {
            return Err(Error::Config("store.collection must not be empty".to_string()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be greater than zero".to_string()));
        }
        if self.embeddings.model.trim().is_empty() {
            return Err(Error::Config("embeddings.model must not be empty".to_string()));
        }
        if self.llm.generate_model.trim().is_empty() {
            return Err(Error::Config("llm.generate_model must not be empty".to_string()));
        }
        if self.pipeline.top_k == 0 {
            return Err(Error::Config("pipeline.top_k must be greater than zero".to_string()));
        }
        if self.pipeline.max_tokens == 0 {
            return Err(Error::Config("pipeline.max_tokens must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Knowledge store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub path: PathBuf,
    /// Collection used by the CLI and the pipeline
    pub collection: String,
    /// Distance metric for newly created collections
    pub distance: DistanceMetric,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kb-rag")
            .join("knowledge.db");

        Self {
            path,
            collection: "llm_knowledge".to_string(),
            distance: DistanceMetric::Cosine,
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama embeddings endpoint
    #[default]
    Ollama,
    /// Offline feature-hashing embedder
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend provider
    pub provider: EmbeddingBackend,
    /// Model name (part of the collection identity)
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name; repoint this at a fine-tuned model to activate it
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed embedding requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "tinyllama".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Prompt language for the grounding template
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PromptLanguage {
    #[default]
    French,
    English,
}

/// Answering pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of documents passed to the prompt
    pub top_k: usize,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Upper bound on a single generation call in seconds (0 disables)
    pub generation_timeout_secs: u64,
    /// Template language
    pub language: PromptLanguage,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            max_tokens: 150,
            generation_timeout_secs: 180,
            language: PromptLanguage::French,
        }
    }
}

impl PipelineConfig {
    /// Generation timeout, `None` when disabled
    pub fn generation_timeout(&self) -> Option<std::time::Duration> {
        (self.generation_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.generation_timeout_secs))
    }
}

/// Learning data configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Append-only file of learning snippets
    pub data_path: PathBuf,
    /// External fine-tuning job
    pub fine_tune: FineTuneConfig,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("learning_data.txt"),
            fine_tune: FineTuneConfig::default(),
        }
    }
}

/// External fine-tuning job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FineTuneConfig {
    /// Program to run
    pub program: String,
    /// Arguments; `{data}` and `{output}` are substituted
    pub args: Vec<String>,
    /// Directory the job writes the new model artifact to
    pub output_dir: PathBuf,
}

impl Default for FineTuneConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec![
                "fine_tune_model.py".to_string(),
                "{data}".to_string(),
                "{output}".to_string(),
            ],
            output_dir: PathBuf::from("tinyllama_finetuned"),
        }
    }
}

/// Health server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}
