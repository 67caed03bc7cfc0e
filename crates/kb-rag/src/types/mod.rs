//! Core types for the knowledge base

pub mod document;
pub mod response;

pub use document::{Collection, Document};
pub use response::{QueryAnswer, RetrievalResult, RetrievedDocument};
