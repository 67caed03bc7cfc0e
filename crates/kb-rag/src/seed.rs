//! Default knowledge shipped with a fresh store

use crate::error::Result;
use crate::storage::KnowledgeStore;
use crate::types::Collection;

/// Seed documents as `(id, text)`
pub const DEFAULT_SEED_DOCUMENTS: [(&str, &str); 5] = [
    ("doc1", "Le ciel est bleu."),
    ("doc2", "L'herbe est verte."),
    ("doc3", "Paris est la capitale de la France."),
    ("doc4", "Les pommes sont généralement rouges ou vertes."),
    ("doc5", "Le soleil brille pendant la journée."),
];

/// Insert every seed document that is not already present. Returns how many were added.
pub async fn seed(store: &KnowledgeStore, collection: &Collection) -> Result<usize> {
    let mut added = 0;
    for (id, text) in DEFAULT_SEED_DOCUMENTS {
        if store.add_if_absent(collection, id, text).await? {
            added += 1;
        }
    }

    if added == 0 {
        tracing::info!("All seed documents already present in '{}'", collection.name);
    } else {
        tracing::info!("Seeded {} documents into '{}'", added, collection.name);
    }
    Ok(added)
}

/// Seed only when the collection holds no documents
pub async fn seed_if_empty(store: &KnowledgeStore, collection: &Collection) -> Result<usize> {
    if store.count(collection).await? > 0 {
        return Ok(0);
    }
    seed(store, collection).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use crate::retrieval::DistanceMetric;
    use std::sync::Arc;

    async fn setup() -> (KnowledgeStore, Collection) {
        let store =
            KnowledgeStore::in_memory(Arc::new(HashingEmbedder::new(384)), DistanceMetric::Cosine)
                .unwrap();
        let collection = store.get_or_create("llm_knowledge").await.unwrap();
        (store, collection)
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let (store, collection) = setup().await;
        assert_eq!(seed(&store, &collection).await.unwrap(), 5);
        assert_eq!(seed(&store, &collection).await.unwrap(), 0);
        assert_eq!(store.count(&collection).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_seed_if_empty_skips_populated_collection() {
        let (store, collection) = setup().await;
        store.add(&collection, "mine", "Mon propre document.").await.unwrap();

        assert_eq!(seed_if_empty(&store, &collection).await.unwrap(), 0);
        assert_eq!(store.count(&collection).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_text() {
        let (store, collection) = setup().await;
        store.add(&collection, "doc1", "Le ciel est gris.").await.unwrap();

        assert_eq!(seed(&store, &collection).await.unwrap(), 4);
        let doc1 = store.get(&collection, "doc1").await.unwrap().unwrap();
        assert_eq!(doc1.text, "Le ciel est gris.");
    }
}
