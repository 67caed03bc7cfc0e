//! SQLite database for collections and their documents
//!
//! Every write is a single committed statement, so a successful return means
//! the document is durable and visible to the next read.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::retrieval::DistanceMetric;
use crate::types::{Collection, Document};

/// SQLite-backed knowledge database
#[derive(Clone)]
pub struct KnowledgeDb {
    conn: Arc<Mutex<Connection>>,
}

impl KnowledgeDb {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::store(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::store(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::store(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=FULL;
            PRAGMA busy_timeout=5000;
            PRAGMA foreign_keys=ON;
        "#,
        )
        .map_err(|e| Error::store(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT NOT NULL,
                embedding_model TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                distance TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (name, embedding_model)
            );

            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                embedding_model TEXT NOT NULL,
                id TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (collection, embedding_model, id),
                FOREIGN KEY (collection, embedding_model)
                    REFERENCES collections(name, embedding_model)
            );
        "#,
        )
        .map_err(|e| Error::store(format!("Failed to run migrations: {}", e)))?;

        tracing::debug!("Database migrations complete");
        Ok(())
    }

    // ==================== Collection Operations ====================

    /// Open the collection `(name, embedding_model)`, creating it if missing.
    ///
    /// An existing collection must agree on dimension and distance metric.
    pub fn get_or_create_collection(
        &self,
        name: &str,
        embedding_model: &str,
        dimensions: usize,
        distance: DistanceMetric,
    ) -> Result<Collection> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                "SELECT name, embedding_model, dimensions, distance, created_at
                 FROM collections WHERE name = ?1 AND embedding_model = ?2",
                params![name, embedding_model],
                row_to_collection_row,
            )
            .optional()?;

        let collection = match existing {
            Some(row) => {
                let collection = row.into_collection()?;
                if collection.dimensions != dimensions {
                    return Err(Error::store(format!(
                        "Collection '{}' stores {}-dimensional vectors, embedder produces {}",
                        collection.name, collection.dimensions, dimensions
                    )));
                }
                if collection.distance != distance {
                    return Err(Error::store(format!(
                        "Collection '{}' uses {} distance, requested {}",
                        collection.name, collection.distance, distance
                    )));
                }
                collection
            }
            None => {
                let collection = Collection {
                    name: name.to_string(),
                    embedding_model: embedding_model.to_string(),
                    dimensions,
                    distance,
                    created_at: Utc::now(),
                };
                tx.execute(
                    "INSERT INTO collections (name, embedding_model, dimensions, distance, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        collection.name,
                        collection.embedding_model,
                        collection.dimensions as i64,
                        collection.distance.as_str(),
                        collection.created_at,
                    ],
                )?;
                tracing::info!("Created collection {}", collection.label());
                collection
            }
        };

        tx.commit()?;
        Ok(collection)
    }

    /// List every collection
    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT name, embedding_model, dimensions, distance, created_at
             FROM collections ORDER BY name, embedding_model",
        )?;

        let rows = stmt
            .query_map([], row_to_collection_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(CollectionRow::into_collection).collect()
    }

    // ==================== Document Operations ====================

    /// Insert a document; an existing id yields [`Error::DuplicateId`]
    pub fn insert_document(&self, collection: &Collection, document: &Document) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO documents (collection, embedding_model, id, text, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                collection.name,
                collection.embedding_model,
                document.id,
                document.text,
                encode_embedding(&document.embedding),
                document.created_at,
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.code == ErrorCode::ConstraintViolation
                    && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Error::duplicate_id(&collection.name, &document.id)
            }
            other => Error::from(other),
        })?;

        Ok(())
    }

    /// Insert a document unless its id is already present. Returns whether it was inserted.
    pub fn insert_document_if_absent(
        &self,
        collection: &Collection,
        document: &Document,
    ) -> Result<bool> {
        let conn = self.conn.lock();

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO documents (collection, embedding_model, id, text, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                collection.name,
                collection.embedding_model,
                document.id,
                document.text,
                encode_embedding(&document.embedding),
                document.created_at,
            ],
        )?;

        Ok(inserted > 0)
    }

    /// Whether a document id exists in the collection
    pub fn contains(&self, collection: &Collection, id: &str) -> Result<bool> {
        let conn = self.conn.lock();

        let found = conn
            .query_row(
                "SELECT 1 FROM documents WHERE collection = ?1 AND embedding_model = ?2 AND id = ?3",
                params![collection.name, collection.embedding_model, id],
                |_| Ok(()),
            )
            .optional()?;

        Ok(found.is_some())
    }

    /// Get a document by id
    pub fn get_document(&self, collection: &Collection, id: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock();

        let row = conn
            .query_row(
                "SELECT id, text, embedding, created_at FROM documents
                 WHERE collection = ?1 AND embedding_model = ?2 AND id = ?3",
                params![collection.name, collection.embedding_model, id],
                row_to_document_row,
            )
            .optional()?;

        row.map(DocumentRow::into_document).transpose()
    }

    /// All documents of a collection with their embeddings
    pub fn documents(&self, collection: &Collection) -> Result<Vec<Document>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT id, text, embedding, created_at FROM documents
             WHERE collection = ?1 AND embedding_model = ?2",
        )?;

        let rows = stmt
            .query_map(
                params![collection.name, collection.embedding_model],
                row_to_document_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &Collection) -> Result<usize> {
        let conn = self.conn.lock();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1 AND embedding_model = ?2",
            params![collection.name, collection.embedding_model],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}

// ==================== Row Helpers ====================

struct CollectionRow {
    name: String,
    embedding_model: String,
    dimensions: i64,
    distance: String,
    created_at: DateTime<Utc>,
}

impl CollectionRow {
    fn into_collection(self) -> Result<Collection> {
        Ok(Collection {
            name: self.name,
            embedding_model: self.embedding_model,
            dimensions: self.dimensions as usize,
            distance: self.distance.parse()?,
            created_at: self.created_at,
        })
    }
}

fn row_to_collection_row(row: &rusqlite::Row) -> rusqlite::Result<CollectionRow> {
    Ok(CollectionRow {
        name: row.get(0)?,
        embedding_model: row.get(1)?,
        dimensions: row.get(2)?,
        distance: row.get(3)?,
        created_at: row.get(4)?,
    })
}

struct DocumentRow {
    id: String,
    text: String,
    embedding: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document> {
        let embedding = decode_embedding(&self.embedding).ok_or_else(|| {
            Error::store(format!("Corrupt embedding for document '{}'", self.id))
        })?;
        Ok(Document {
            id: self.id,
            text: self.text,
            embedding,
            created_at: self.created_at,
        })
    }
}

fn row_to_document_row(row: &rusqlite::Row) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        text: row.get(1)?,
        embedding: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Little-endian f32 encoding
fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(db: &KnowledgeDb) -> Collection {
        db.get_or_create_collection("llm_knowledge", "test-model", 3, DistanceMetric::Cosine)
            .unwrap()
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let db = KnowledgeDb::in_memory().unwrap();
        let first = collection(&db);
        let second = collection(&db);
        assert_eq!(first, second);
        assert_eq!(db.list_collections().unwrap().len(), 1);
    }

    #[test]
    fn test_same_name_different_model_is_distinct() {
        let db = KnowledgeDb::in_memory().unwrap();
        let a = collection(&db);
        let b = db
            .get_or_create_collection("llm_knowledge", "other-model", 5, DistanceMetric::L2)
            .unwrap();
        assert_ne!(a.embedding_model, b.embedding_model);

        db.insert_document(&a, &Document::new("doc1", "alpha", vec![1.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(db.count(&a).unwrap(), 1);
        assert_eq!(db.count(&b).unwrap(), 0);
    }

    #[test]
    fn test_dimension_mismatch_on_reopen() {
        let db = KnowledgeDb::in_memory().unwrap();
        collection(&db);
        let err = db
            .get_or_create_collection("llm_knowledge", "test-model", 4, DistanceMetric::Cosine)
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));

        let err = db
            .get_or_create_collection("llm_knowledge", "test-model", 3, DistanceMetric::L2)
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_insert_and_get() {
        let db = KnowledgeDb::in_memory().unwrap();
        let c = collection(&db);
        let doc = Document::new("doc1", "Le ciel est bleu.", vec![0.5, -1.25, 3.0]);
        db.insert_document(&c, &doc).unwrap();

        let stored = db.get_document(&c, "doc1").unwrap().unwrap();
        assert_eq!(stored.text, "Le ciel est bleu.");
        assert_eq!(stored.embedding, vec![0.5, -1.25, 3.0]);
        assert!(db.contains(&c, "doc1").unwrap());
        assert!(!db.contains(&c, "doc2").unwrap());
        assert!(db.get_document(&c, "doc2").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let db = KnowledgeDb::in_memory().unwrap();
        let c = collection(&db);
        db.insert_document(&c, &Document::new("doc1", "first", vec![1.0, 0.0, 0.0]))
            .unwrap();

        let err = db
            .insert_document(&c, &Document::new("doc1", "second", vec![0.0, 1.0, 0.0]))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId { .. }));
        assert_eq!(db.get_document(&c, "doc1").unwrap().unwrap().text, "first");
        assert_eq!(db.count(&c).unwrap(), 1);
    }

    #[test]
    fn test_insert_if_absent() {
        let db = KnowledgeDb::in_memory().unwrap();
        let c = collection(&db);
        let doc = Document::new("doc1", "alpha", vec![1.0, 0.0, 0.0]);
        assert!(db.insert_document_if_absent(&c, &doc).unwrap());
        assert!(!db.insert_document_if_absent(&c, &doc).unwrap());
        assert_eq!(db.count(&c).unwrap(), 1);
    }

    #[test]
    fn test_embedding_encoding() {
        assert_eq!(encode_embedding(&[1.0]), 1.0f32.to_le_bytes().to_vec());
        assert!(decode_embedding(&[0, 0, 0]).is_none());
        assert_eq!(decode_embedding(&[]).unwrap(), Vec::<f32>::new());
    }
}
