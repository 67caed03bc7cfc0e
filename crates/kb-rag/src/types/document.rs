//! Stored documents and the collections that hold them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::retrieval::DistanceMetric;

/// A document persisted in a collection.
///
/// The `id` is always populated and unique within its collection; the
/// embedding is computed once at insert time and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Caller-supplied or generated identifier
    pub id: String,
    /// Document text (never empty)
    pub text: String,
    /// Embedding of `text`, dimension fixed by the collection
    #[serde(default, skip_serializing)]
    pub embedding: Vec<f32>,
    /// When the document was stored
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding,
            created_at: Utc::now(),
        }
    }

    /// Generate a fresh unique document id
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Handle to a named, persistent set of documents.
///
/// A collection is identified by `(name, embedding_model)`; its dimension and
/// distance metric are fixed when it is first created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    /// Collection name
    pub name: String,
    /// Embedding model the stored vectors were produced with
    pub embedding_model: String,
    /// Embedding dimension shared by every document
    pub dimensions: usize,
    /// Distance metric used for every query against this collection
    pub distance: DistanceMetric,
    /// When the collection was created
    pub created_at: DateTime<Utc>,
}

impl Collection {
    /// Human-readable label for logs and messages
    pub fn label(&self) -> String {
        format!("{} ({}, {}d, {})", self.name, self.embedding_model, self.dimensions, self.distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Document::generate_id();
        let b = Document::generate_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_embedding_not_serialized() {
        let doc = Document::new("doc1", "Le ciel est bleu.", vec![0.5, 0.5]);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["id"], "doc1");
        assert!(json.get("embedding").is_none());
    }
}
