//! Storage module for persistent data storage
//!
//! SQLite persistence for collections and documents, and the async
//! knowledge store built on top of it.

mod database;
mod knowledge_store;

pub use database::KnowledgeDb;
pub use knowledge_store::KnowledgeStore;
