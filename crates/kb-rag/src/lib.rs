//! kb-rag: retrieval-augmented answering over a persistent knowledge base
//!
//! Documents are embedded and stored in SQLite collections keyed by
//! `(name, embedding model)`. A question is embedded, its nearest documents
//! are retrieved, rendered into a grounding prompt and handed to a local
//! generation model; the answer comes back with the documents it used.

pub mod config;
pub mod error;
pub mod generation;
pub mod learning;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod seed;
pub mod server;
pub mod shell;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use storage::KnowledgeStore;
pub use types::{Collection, Document, QueryAnswer, RetrievalResult, RetrievedDocument};
