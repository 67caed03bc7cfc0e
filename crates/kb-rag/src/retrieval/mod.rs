//! Nearest-neighbor retrieval over the knowledge store

pub mod distance;
pub mod retriever;

pub use distance::DistanceMetric;
pub use retriever::{Retriever, DEFAULT_TOP_K};
