//! Retrieval results and answers

use serde::{Deserialize, Serialize};

use super::document::Document;

/// A retrieved document and its distance to the query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    /// The stored document
    pub document: Document,
    /// Distance under the collection's metric (lower is more similar)
    pub distance: f32,
}

/// Documents nearest to a query, most similar first.
///
/// Holds at most `k` entries ordered by non-decreasing distance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    hits: Vec<RetrievedDocument>,
}

impl RetrievalResult {
    /// Build a result from hits, sorting them by ascending distance.
    ///
    /// Ties are broken by document id so the order is stable across calls.
    pub fn from_hits(mut hits: Vec<RetrievedDocument>) -> Self {
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        Self { hits }
    }

    /// An empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keep only the `k` nearest hits
    pub fn truncate(&mut self, k: usize) {
        self.hits.truncate(k);
    }

    /// Number of retrieved documents
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether nothing was retrieved
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Iterate hits in rank order
    pub fn iter(&self) -> std::slice::Iter<'_, RetrievedDocument> {
        self.hits.iter()
    }

    /// Hits in rank order
    pub fn hits(&self) -> &[RetrievedDocument] {
        &self.hits
    }

    /// Ids of the retrieved documents in rank order
    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.document.id.as_str()).collect()
    }

    /// Consume into documents in rank order
    pub fn into_documents(self) -> Vec<Document> {
        self.hits.into_iter().map(|h| h.document).collect()
    }
}

impl IntoIterator for RetrievalResult {
    type Item = RetrievedDocument;
    type IntoIter = std::vec::IntoIter<RetrievedDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a RetrievedDocument;
    type IntoIter = std::slice::Iter<'a, RetrievedDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

/// Answer to a question together with the documents it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// The question as asked
    pub question: String,
    /// Generated answer
    pub answer: String,
    /// Documents passed to the generator, most similar first
    pub sources: Vec<Document>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl QueryAnswer {
    /// Ids of the source documents in rank order
    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|d| d.id.as_str()).collect()
    }
}
