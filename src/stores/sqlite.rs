use std::mem::transmute;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::Once;

use rig::OneOrMany;
use rig::embeddings::{Embedding, EmbeddingModel};
use rig_sqlite::{Column, ColumnValue, SqliteVectorIndex, SqliteVectorStore, SqliteVectorStoreTable};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{Connection, ffi};

use super::{ChunkStore, IndexDump, IndexHit, StoredChunk, VectorIndex};
use crate::types::RagError;

/// Database file for a named collection inside `root`.
pub fn collection_path(root: impl AsRef<Path>, collection_name: &str) -> PathBuf {
    root.as_ref().join(format!("{collection_name}.sqlite"))
}

/// Row key: chunk ids are only unique within a document, so rows are keyed
/// by source and chunk id together.
fn scoped_id(source: &str, chunk_id: &str) -> String {
    format!("{source}::{chunk_id}")
}

/// Row shape of the `chunks` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkDocument {
    pub id: String,
    pub chunk_id: String,
    pub source: String,
    pub kind: String,
    #[serde(deserialize_with = "deserialize_page")]
    pub page: u32,
    pub section: String,
    pub content: String,
    #[serde(deserialize_with = "deserialize_metadata_field")]
    pub metadata: serde_json::Value,
}

impl SqliteVectorStoreTable for ChunkDocument {
    fn name() -> &'static str {
        "chunks"
    }

    fn schema() -> Vec<Column> {
        vec![
            Column::new("id", "TEXT PRIMARY KEY"),
            Column::new("chunk_id", "TEXT"),
            Column::new("source", "TEXT").indexed(),
            Column::new("kind", "TEXT"),
            Column::new("page", "TEXT"),
            Column::new("section", "TEXT"),
            Column::new("metadata", "TEXT"),
            Column::new("content", "TEXT"),
        ]
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn column_values(&self) -> Vec<(&'static str, Box<dyn ColumnValue>)> {
        vec![
            ("id", Box::new(self.id.clone())),
            ("chunk_id", Box::new(self.chunk_id.clone())),
            ("source", Box::new(self.source.clone())),
            ("kind", Box::new(self.kind.clone())),
            ("page", Box::new(self.page.to_string())),
            ("section", Box::new(self.section.clone())),
            ("metadata", Box::new(self.metadata.to_string())),
            ("content", Box::new(self.content.clone())),
        ]
    }
}

fn deserialize_page<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Num(value) => u32::try_from(value)
            .map_err(|_| de::Error::custom(format!("page {value} does not fit in u32"))),
        Repr::Text(text) => text
            .parse::<u32>()
            .map_err(|err| de::Error::custom(format!("unable to parse page '{text}': {err}"))),
    }
}

fn deserialize_metadata_field<'de, D>(deserializer: D) -> Result<serde_json::Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if let serde_json::Value::String(raw) = value {
        serde_json::from_str(&raw).map_or(Ok(serde_json::Value::String(raw)), Ok)
    } else {
        Ok(value)
    }
}

impl From<StoredChunk> for ChunkDocument {
    fn from(record: StoredChunk) -> Self {
        ChunkDocument {
            id: scoped_id(&record.source, &record.id),
            chunk_id: record.id,
            source: record.source,
            kind: record.kind,
            page: record.page,
            section: record.section,
            content: record.content,
            metadata: record.metadata,
        }
    }
}

impl From<ChunkDocument> for StoredChunk {
    fn from(doc: ChunkDocument) -> Self {
        StoredChunk {
            id: doc.chunk_id,
            source: doc.source,
            kind: doc.kind,
            page: doc.page,
            section: doc.section,
            content: doc.content,
            metadata: doc.metadata,
            embedding: None,
        }
    }
}

/// SQLite-backed chunk store with vector search via `sqlite-vec`.
#[derive(Clone)]
pub struct SqliteChunkStore<E>
where
    E: EmbeddingModel + 'static,
{
    inner: SqliteVectorStore<E, ChunkDocument>,
    /// Separate connection handle for direct queries not supported by
    /// rig-sqlite; a clone of the connection used by the inner store.
    conn: Connection,
}

impl<E> SqliteChunkStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    pub async fn open(path: impl AsRef<Path>, model: &E) -> Result<Self, RagError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        conn.call(|conn| {
            let result = conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0));
            match result {
                Ok(_) => Ok(()),
                Err(err) => Err(tokio_rusqlite::Error::Rusqlite(err)),
            }
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;
        // Clone connection for direct access before moving into the store.
        let conn_for_queries = conn.clone();
        let store = SqliteVectorStore::new(conn, model)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(Self {
            inner: store,
            conn: conn_for_queries,
        })
    }

    /// Persists documents with precomputed embeddings.
    pub async fn add_chunks(
        &self,
        documents: Vec<(ChunkDocument, Vec<f32>)>,
    ) -> Result<(), RagError> {
        if documents.is_empty() {
            return Ok(());
        }
        let mut rows = Vec::with_capacity(documents.len());
        for (doc, embedding) in documents {
            let converted: Vec<f64> = embedding.into_iter().map(f64::from).collect();
            let embed = Embedding {
                document: doc.content.clone(),
                vec: converted,
            };
            rows.push((doc, OneOrMany::one(embed)));
        }
        self.inner
            .add_rows(rows)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(())
    }

    fn register_sqlite_vec() -> Result<(), RagError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(RagError::Storage)
    }

    pub fn index(&self, model: E) -> SqliteVectorIndex<E, ChunkDocument> {
        self.inner.clone().index(model)
    }

    pub fn store(&self) -> SqliteVectorStore<E, ChunkDocument> {
        self.inner.clone()
    }

    /// Underlying connection for queries not covered by the trait surface.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

const DOCUMENT_COLUMNS: &str = "id, chunk_id, source, kind, page, section, content, metadata";

#[async_trait::async_trait]
impl<E> ChunkStore for SqliteChunkStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    async fn insert_chunks(&self, chunks: Vec<StoredChunk>) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let documents_with_embeddings: Vec<(ChunkDocument, Vec<f32>)> = chunks
            .into_iter()
            .filter_map(|record| {
                let embedding = record.embedding.clone()?;
                let doc = ChunkDocument::from(record);
                Some((doc, embedding))
            })
            .collect();

        self.add_chunks(documents_with_embeddings).await
    }

    async fn get_chunks_by_source(&self, source: &str) -> Result<Vec<StoredChunk>, RagError> {
        let source = source.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {DOCUMENT_COLUMNS} FROM chunks WHERE source = ?"
                    ))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([&source], |row| {
                        Ok(ChunkDocument {
                            id: row.get(0)?,
                            chunk_id: row.get(1)?,
                            source: row.get(2)?,
                            kind: row.get(3)?,
                            page: row.get::<_, String>(4)?.parse().unwrap_or(0),
                            section: row.get(5)?,
                            content: row.get(6)?,
                            metadata: row
                                .get::<_, String>(7)
                                .map(|s| serde_json::from_str(&s).unwrap_or_default())
                                .unwrap_or_default(),
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(StoredChunk::from(
                        row.map_err(tokio_rusqlite::Error::Rusqlite)?,
                    ));
                }
                Ok(results)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn delete_chunks_by_source(&self, source: &str) -> Result<usize, RagError> {
        let source = source.to_string();
        self.conn
            .call(move |conn| {
                let deleted = conn
                    .execute("DELETE FROM chunks WHERE source = ?", [&source])
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(deleted)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

#[async_trait::async_trait]
impl<E> VectorIndex for SqliteChunkStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    async fn query(&self, embedding: &[f32], n_results: usize) -> Result<Vec<IndexHit>, RagError> {
        let embedding_json = serde_json::to_string(embedding)
            .map_err(|err| RagError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| {
                // sqlite-vec cosine distance, nearest first.
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT c.content, c.metadata, \
                         vec_distance_cosine(e.embedding, vec_f32(?)) as distance \
                         FROM chunks c \
                         JOIN chunks_embeddings e ON c.id = e.id \
                         ORDER BY distance ASC \
                         LIMIT {}",
                        n_results
                    ))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([&embedding_json], |row| {
                        let content: String = row.get(0)?;
                        let metadata = row
                            .get::<_, String>(1)
                            .map(|s| serde_json::from_str(&s).unwrap_or_default())
                            .unwrap_or_default();
                        let distance: f32 = row.get(2)?;
                        Ok(IndexHit {
                            content,
                            metadata,
                            distance,
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn export_all(&self) -> Result<IndexDump, RagError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT c.content, c.metadata, vec_to_json(e.embedding) \
                         FROM chunks c \
                         JOIN chunks_embeddings e ON c.id = e.id",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([], |row| {
                        let content: String = row.get(0)?;
                        let metadata = row
                            .get::<_, String>(1)
                            .map(|s| serde_json::from_str(&s).unwrap_or_default())
                            .unwrap_or_default();
                        let embedding_json: String = row.get(2)?;
                        Ok((content, metadata, embedding_json))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut dump = IndexDump::default();
                for row in rows {
                    let (content, metadata, embedding_json) =
                        row.map_err(tokio_rusqlite::Error::Rusqlite)?;
                    let embedding: Vec<f32> =
                        serde_json::from_str(&embedding_json).unwrap_or_default();
                    dump.documents.push(content);
                    dump.metadatas.push(metadata);
                    dump.embeddings.push(embedding);
                }
                Ok(dump)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}
