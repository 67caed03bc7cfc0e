//! Question → nearest stored documents

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::storage::KnowledgeStore;
use crate::types::{Collection, RetrievalResult};

/// Default number of documents handed to the prompt
pub const DEFAULT_TOP_K: usize = 2;

/// Embeds a question and asks the knowledge store for its nearest documents.
///
/// Holds no cache: every call reads the current store state, so documents
/// added between calls are visible immediately.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<KnowledgeStore>,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever with the given default `k`
    pub fn new(store: Arc<KnowledgeStore>, top_k: usize) -> Self {
        Self { store, top_k }
    }

    /// Underlying knowledge store
    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    /// Default number of documents retrieved
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve the default number of documents
    pub async fn retrieve_default(
        &self,
        collection: &Collection,
        question: &str,
    ) -> Result<RetrievalResult> {
        self.retrieve(collection, question, self.top_k).await
    }

    /// Retrieve at most `k` documents ordered by ascending distance.
    ///
    /// An empty collection yields an empty result.
    pub async fn retrieve(
        &self,
        collection: &Collection,
        question: &str,
        k: usize,
    ) -> Result<RetrievalResult> {
        let start = Instant::now();
        let result = self.store.query(collection, question, k).await?;

        tracing::debug!(
            collection = %collection.name,
            k,
            hits = result.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "retrieved {:?}",
            result.ids()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use crate::retrieval::DistanceMetric;

    async fn retriever() -> (Retriever, Collection) {
        let store = Arc::new(
            KnowledgeStore::in_memory(Arc::new(HashingEmbedder::new(384)), DistanceMetric::Cosine)
                .unwrap(),
        );
        let collection = store.get_or_create("test").await.unwrap();
        (Retriever::new(store, DEFAULT_TOP_K), collection)
    }

    #[tokio::test]
    async fn test_empty_collection_returns_empty_result() {
        let (retriever, collection) = retriever().await;
        let result = retriever.retrieve_default(&collection, "anything").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_new_documents_visible_immediately() {
        let (retriever, collection) = retriever().await;
        retriever.store().add(&collection, "a", "Le ciel est bleu.").await.unwrap();
        assert_eq!(retriever.retrieve_default(&collection, "ciel").await.unwrap().len(), 1);

        retriever.store().add(&collection, "b", "L'herbe est verte.").await.unwrap();
        assert_eq!(retriever.retrieve_default(&collection, "ciel").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_k_bounds_result() {
        let (retriever, collection) = retriever().await;
        for i in 0..5 {
            retriever
                .store()
                .add(&collection, &format!("doc{}", i), &format!("document number {}", i))
                .await
                .unwrap();
        }
        assert_eq!(retriever.retrieve(&collection, "document", 3).await.unwrap().len(), 3);
        assert!(retriever.retrieve(&collection, "document", 0).await.unwrap().is_empty());
    }
}
