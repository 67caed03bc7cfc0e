//! Persistent knowledge store
//!
//! Embeds documents on insert, persists them through [`KnowledgeDb`] and
//! answers nearest-neighbor queries with an exact scan. Blocking SQLite work
//! runs on the blocking pool.

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::retrieval::DistanceMetric;
use crate::types::{Collection, Document, RetrievalResult, RetrievedDocument};

use super::database::KnowledgeDb;

/// Collections of embedded documents backed by SQLite
pub struct KnowledgeStore {
    db: KnowledgeDb,
    embedder: Arc<dyn EmbeddingProvider>,
    metric: DistanceMetric,
}

impl KnowledgeStore {
    /// Open (or create) the store at `path`
    pub fn open(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingProvider>,
        metric: DistanceMetric,
    ) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Opening knowledge store at {}", path.display());
        Ok(Self {
            db: KnowledgeDb::new(path)?,
            embedder,
            metric,
        })
    }

    /// Create a store that lives only as long as the process
    pub fn in_memory(embedder: Arc<dyn EmbeddingProvider>, metric: DistanceMetric) -> Result<Self> {
        Ok(Self {
            db: KnowledgeDb::in_memory()?,
            embedder,
            metric,
        })
    }

    /// Open the named collection for this store's embedding model, creating it if needed
    pub async fn get_or_create(&self, name: &str) -> Result<Collection> {
        if name.trim().is_empty() {
            return Err(Error::validation("collection name must not be empty"));
        }

        let db = self.db.clone();
        let name = name.to_string();
        let model = self.embedder.model().to_string();
        let dimensions = self.embedder.dimensions();
        let metric = self.metric;

        tokio::task::spawn_blocking(move || {
            db.get_or_create_collection(&name, &model, dimensions, metric)
        })
        .await?
    }

    /// List every collection in the store
    pub async fn collections(&self) -> Result<Vec<Collection>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.list_collections()).await?
    }

    /// Embed and store a document. The id must be new to the collection.
    ///
    /// Surrounding whitespace is trimmed from the id. Nothing is written when
    /// validation, the duplicate check or embedding fails.
    pub async fn add(&self, collection: &Collection, id: &str, text: &str) -> Result<Document> {
        let id = validate_document(id, text)?;

        if self.contains(collection, id).await? {
            return Err(Error::duplicate_id(&collection.name, id));
        }

        let document = self.embed_document(collection, id, text).await?;

        let db = self.db.clone();
        let target = collection.clone();
        let stored = document.clone();
        tokio::task::spawn_blocking(move || db.insert_document(&target, &stored)).await??;

        tracing::info!(collection = %collection.name, id, "Added document");
        Ok(document)
    }

    /// Store a document unless its id already exists. Returns whether it was added.
    pub async fn add_if_absent(&self, collection: &Collection, id: &str, text: &str) -> Result<bool> {
        let id = validate_document(id, text)?;

        if self.contains(collection, id).await? {
            return Ok(false);
        }

        let document = self.embed_document(collection, id, text).await?;

        let db = self.db.clone();
        let target = collection.clone();
        let inserted =
            tokio::task::spawn_blocking(move || db.insert_document_if_absent(&target, &document))
                .await??;

        if inserted {
            tracing::debug!(collection = %collection.name, id, "Added document");
        }
        Ok(inserted)
    }

    /// Whether the id exists in the collection
    pub async fn contains(&self, collection: &Collection, id: &str) -> Result<bool> {
        let db = self.db.clone();
        let collection = collection.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || db.contains(&collection, &id)).await?
    }

    /// Fetch a stored document
    pub async fn get(&self, collection: &Collection, id: &str) -> Result<Option<Document>> {
        let db = self.db.clone();
        let collection = collection.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || db.get_document(&collection, &id)).await?
    }

    /// Number of documents in the collection
    pub async fn count(&self, collection: &Collection) -> Result<usize> {
        let db = self.db.clone();
        let collection = collection.clone();
        tokio::task::spawn_blocking(move || db.count(&collection)).await?
    }

    /// The `k` documents nearest to `text`, ascending by distance.
    ///
    /// `k == 0` and empty collections both yield an empty result.
    pub async fn query(&self, collection: &Collection, text: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Ok(RetrievalResult::empty());
        }

        self.check_model(collection)?;
        let query = self.embedder.embed(text).await?;
        check_dimensions(collection, &query)?;

        let db = self.db.clone();
        let collection = collection.clone();
        tokio::task::spawn_blocking(move || {
            let hits = db
                .documents(&collection)?
                .into_iter()
                .map(|document| RetrievedDocument {
                    distance: collection.distance.distance(&query, &document.embedding),
                    document,
                })
                .collect();

            let mut result = RetrievalResult::from_hits(hits);
            result.truncate(k);
            Ok::<_, Error>(result)
        })
        .await?
    }

    async fn embed_document(&self, collection: &Collection, id: &str, text: &str) -> Result<Document> {
        self.check_model(collection)?;
        let embedding = self.embedder.embed(text).await?;
        check_dimensions(collection, &embedding)?;
        Ok(Document::new(id, text, embedding))
    }

    fn check_model(&self, collection: &Collection) -> Result<()> {
        if collection.embedding_model != self.embedder.model() {
            return Err(Error::store(format!(
                "Collection '{}' was built with '{}', store embeds with '{}'",
                collection.name,
                collection.embedding_model,
                self.embedder.model()
            )));
        }
        Ok(())
    }
}

/// Returns the trimmed id
fn validate_document<'a>(id: &'a str, text: &str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::validation("document id must not be empty"));
    }
    if text.trim().is_empty() {
        return Err(Error::validation("document text must not be empty"));
    }
    Ok(id)
}

fn check_dimensions(collection: &Collection, embedding: &[f32]) -> Result<()> {
    if embedding.len() != collection.dimensions {
        return Err(Error::store(format!(
            "Embedding has {} dimensions, collection '{}' expects {}",
            embedding.len(),
            collection.name,
            collection.dimensions
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use async_trait::async_trait;

    fn store() -> KnowledgeStore {
        KnowledgeStore::in_memory(Arc::new(HashingEmbedder::new(384)), DistanceMetric::Cosine).unwrap()
    }

    /// Embedder whose output length differs from what it reports
    struct WrongSizeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for WrongSizeEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 3])
        }
        fn dimensions(&self) -> usize {
            4
        }
        fn model(&self) -> &str {
            "wrong-size"
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "wrong-size"
        }
    }

    #[tokio::test]
    async fn test_add_increments_count() {
        let store = store();
        let c = store.get_or_create("llm_knowledge").await.unwrap();
        assert_eq!(store.count(&c).await.unwrap(), 0);

        store.add(&c, "doc1", "Le ciel est bleu.").await.unwrap();
        assert_eq!(store.count(&c).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_add_leaves_store_unchanged() {
        let store = store();
        let c = store.get_or_create("llm_knowledge").await.unwrap();
        store.add(&c, "doc1", "Le ciel est bleu.").await.unwrap();

        let err = store.add(&c, "doc1", "autre texte").await.unwrap_err();
        assert!(matches!(err, Error::DuplicateId { .. }));
        assert_eq!(store.count(&c).await.unwrap(), 1);
        assert_eq!(store.get(&c, "doc1").await.unwrap().unwrap().text, "Le ciel est bleu.");
    }

    #[tokio::test]
    async fn test_empty_inputs_rejected() {
        let store = store();
        let c = store.get_or_create("llm_knowledge").await.unwrap();
        assert!(matches!(store.add(&c, "", "text").await, Err(Error::Validation(_))));
        assert!(matches!(store.add(&c, "id", "  \n").await, Err(Error::Validation(_))));
        assert!(matches!(store.get_or_create(" ").await, Err(Error::Validation(_))));
        assert_eq!(store.count(&c).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let store = store();
        let c = store.get_or_create("llm_knowledge").await.unwrap();
        store.add(&c, "doc1", "Le ciel est bleu.").await.unwrap();
        store.add(&c, "doc2", "L'herbe est verte.").await.unwrap();
        store.add(&c, "doc3", "Paris est la capitale de la France.").await.unwrap();

        let result = store.query(&c, "Le ciel est bleu.", 3).await.unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result.ids()[0], "doc1");
        assert!(result.hits()[0].distance.abs() < 1e-5);
        assert!(result.hits().windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_query_edge_cases() {
        let store = store();
        let c = store.get_or_create("llm_knowledge").await.unwrap();
        assert!(store.query(&c, "anything", 2).await.unwrap().is_empty());

        store.add(&c, "doc1", "Le ciel est bleu.").await.unwrap();
        assert!(store.query(&c, "ciel", 0).await.unwrap().is_empty());
        assert_eq!(store.query(&c, "ciel", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_if_absent() {
        let store = store();
        let c = store.get_or_create("llm_knowledge").await.unwrap();
        assert!(store.add_if_absent(&c, "doc1", "alpha").await.unwrap());
        assert!(!store.add_if_absent(&c, "doc1", "beta").await.unwrap());
        assert_eq!(store.get(&c, "doc1").await.unwrap().unwrap().text, "alpha");
    }

    #[tokio::test]
    async fn test_ids_are_stored_trimmed() {
        let store = store();
        let c = store.get_or_create("llm_knowledge").await.unwrap();

        let document = store.add(&c, " doc1 ", "Le ciel est bleu.").await.unwrap();
        assert_eq!(document.id, "doc1");
        assert!(store.get(&c, "doc1").await.unwrap().is_some());

        let err = store.add(&c, "doc1", "autre texte").await.unwrap_err();
        assert!(matches!(err, Error::DuplicateId { ref id, .. } if id == "doc1"));
        assert!(!store.add_if_absent(&c, "\tdoc1", "encore").await.unwrap());
        assert_eq!(store.count(&c).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_writes_nothing() {
        let store = KnowledgeStore::in_memory(Arc::new(WrongSizeEmbedder), DistanceMetric::Cosine).unwrap();
        let c = store.get_or_create("llm_knowledge").await.unwrap();

        let err = store.add(&c, "doc1", "text").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(store.count(&c).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_foreign_collection_rejected() {
        let store = store();
        let foreign = Collection {
            embedding_model: "nomic-embed-text".to_string(),
            ..store.get_or_create("llm_knowledge").await.unwrap()
        };
        assert!(matches!(store.query(&foreign, "ciel", 2).await, Err(Error::Store(_))));
    }
}
