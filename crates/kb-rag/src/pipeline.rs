//! Answering pipeline
//!
//! [`RagPipeline`] ties retrieval, prompt assembly and generation into a
//! single `answer(question)` call that also reports which stored documents
//! the answer was grounded on.
//!
//! ```rust,ignore
//! let pipeline = RagPipeline::builder()
//!     .store(store)
//!     .llm(llm)
//!     .collection(collection)
//!     .top_k(2)
//!     .build()?;
//!
//! let answer = pipeline.answer("Quelle est la couleur du ciel ?").await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::config::{PromptLanguage, RagConfig};
use crate::error::{Error, Result};
use crate::generation::PromptTemplate;
use crate::providers::LlmProvider;
use crate::retrieval::{Retriever, DEFAULT_TOP_K};
use crate::storage::KnowledgeStore;
use crate::types::{Collection, Document, QueryAnswer};

/// Default cap on generated tokens
pub const DEFAULT_MAX_TOKENS: usize = 150;

/// Retrieval-augmented answering over one collection
pub struct RagPipeline {
    retriever: Retriever,
    llm: Arc<dyn LlmProvider>,
    collection: Collection,
    template: PromptTemplate,
    max_tokens: usize,
    generation_timeout: Option<Duration>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`]
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Build a pipeline from configuration, opening the configured collection
    pub async fn from_config(
        config: &RagConfig,
        store: Arc<KnowledgeStore>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let collection = store.get_or_create(&config.store.collection).await?;

        let mut builder = Self::builder()
            .store(store)
            .llm(llm)
            .collection(collection)
            .top_k(config.pipeline.top_k)
            .max_tokens(config.pipeline.max_tokens)
            .language(config.pipeline.language);
        if let Some(timeout) = config.pipeline.generation_timeout() {
            builder = builder.generation_timeout(timeout);
        }
        builder.build()
    }

    /// Collection this pipeline answers from
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Knowledge store behind the retriever
    pub fn store(&self) -> &Arc<KnowledgeStore> {
        self.retriever.store()
    }

    /// Number of documents passed to the prompt
    pub fn top_k(&self) -> usize {
        self.retriever.top_k()
    }

    /// Answer `question` from the knowledge store.
    ///
    /// Empty questions are rejected before any embedding or generation call.
    /// Generation failures are returned as-is and never retried.
    pub async fn answer(&self, question: &str) -> Result<QueryAnswer> {
        if question.trim().is_empty() {
            return Err(Error::validation("question must not be empty"));
        }

        let start = Instant::now();

        let retrieved = self
            .retriever
            .retrieve_default(&self.collection, question)
            .await
            .map_err(|e| {
                error!(collection = %self.collection.name, error = %e, "retrieval failed");
                e
            })?;

        let prompt = self.template.assemble(question, &retrieved);

        let answer = self.generate(&prompt).await.map_err(|e| {
            error!(model = self.llm.model(), error = %e, "generation failed");
            e
        })?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            sources = ?retrieved.ids(),
            processing_time_ms,
            "answered question"
        );

        Ok(QueryAnswer {
            question: question.to_string(),
            answer,
            sources: retrieved.into_documents(),
            processing_time_ms,
        })
    }

    /// Add a document to the pipeline's collection, generating an id when none is given
    pub async fn add_knowledge(&self, text: &str, id: Option<&str>) -> Result<Document> {
        let id = match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => Document::generate_id(),
        };
        self.store().add(&self.collection, &id, text).await
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let generation = self.llm.generate(prompt, self.max_tokens);

        let output = match self.generation_timeout {
            Some(limit) => tokio::time::timeout(limit, generation)
                .await
                .map_err(|_| Error::GenerationTimeout { timeout: limit })??,
            None => generation.await?,
        };

        let output = output.trim();
        if output.is_empty() {
            return Err(Error::generation(format!(
                "model '{}' returned an empty answer",
                self.llm.model()
            )));
        }
        Ok(output.to_string())
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `store`, `llm` and `collection` are required.
pub struct RagPipelineBuilder {
    store: Option<Arc<KnowledgeStore>>,
    llm: Option<Arc<dyn LlmProvider>>,
    collection: Option<Collection>,
    top_k: usize,
    max_tokens: usize,
    language: PromptLanguage,
    generation_timeout: Option<Duration>,
}

impl Default for RagPipelineBuilder {
    fn default() -> Self {
        Self {
            store: None,
            llm: None,
            collection: None,
            top_k: DEFAULT_TOP_K,
            max_tokens: DEFAULT_MAX_TOKENS,
            language: PromptLanguage::default(),
            generation_timeout: None,
        }
    }
}

impl RagPipelineBuilder {
    /// Set the knowledge store
    pub fn store(mut self, store: Arc<KnowledgeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the generation provider
    pub fn llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the collection to answer from
    pub fn collection(mut self, collection: Collection) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Number of documents retrieved per question
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Maximum tokens to generate
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Prompt template language
    pub fn language(mut self, language: PromptLanguage) -> Self {
        self.language = language;
        self
    }

    /// Upper bound on a single generation call
    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = Some(timeout);
        self
    }

    /// Build the [`RagPipeline`]
    pub fn build(self) -> Result<RagPipeline> {
        let store = self
            .store
            .ok_or_else(|| Error::Config("store is required".to_string()))?;
        let llm = self
            .llm
            .ok_or_else(|| Error::Config("llm is required".to_string()))?;
        let collection = self
            .collection
            .ok_or_else(|| Error::Config("collection is required".to_string()))?;

        if self.top_k == 0 {
            return Err(Error::Config("top_k must be at least 1".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(Error::Config("max_tokens must be at least 1".to_string()));
        }

        Ok(RagPipeline {
            retriever: Retriever::new(store, self.top_k),
            llm,
            collection,
            template: PromptTemplate::new(self.language),
            max_tokens: self.max_tokens,
            generation_timeout: self.generation_timeout,
        })
    }
}
