//! SQLite-based storage implementation.
//!
//! One database backs both halves of the backend contract: the record
//! collection queried by the exact/metadata/fuzzy strategies and the chunk
//! index queried by the semantic strategy (embeddings stored as f32
//! little-endian BLOBs, scored by brute-force cosine weighted by chunk
//! priority).

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row};
use tracing::{debug, info};
use ulid::Ulid;

use inci_core::{
    Chunk, EngineError, RecordFilter, RecordStore, Result, SourceRecord, VectorFilter,
    VectorHit, VectorStore,
};

use crate::schema::SCHEMA;

const RECORD_COLUMNS: &str = "id, code, trade_name, inci_name, supplier, company, cost, \
                              benefits, details, category, function, source, extra, \
                              created_at, updated_at";

/// SQLite-backed record and vector store.
pub struct SqliteStore {
    /// Connection wrapped in a blocking Mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| EngineError::database(format!("Failed to open database: {}", e)))?;

        Self::init(conn, path)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EngineError::database(format!("Failed to open in-memory database: {}", e)))?;

        Self::init(conn, Path::new(":memory:"))
    }

    fn init(conn: Connection, path: &Path) -> Result<Self> {
        Self::configure_connection(&conn)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| EngineError::database(format!("Failed to initialize schema: {}", e)))?;

        info!("Database opened at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 30000;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
        )
        .map_err(|e| EngineError::database(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::database(e.to_string()))?;
        f(&conn)
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SourceRecord> {
        let id: String = row.get(0)?;
        let extra: String = row.get(12)?;

        Ok(SourceRecord {
            id: Ulid::from_string(&id).unwrap_or_else(|_| Ulid::nil()),
            code: row.get(1)?,
            trade_name: row.get(2)?,
            inci_name: row.get(3)?,
            supplier: row.get(4)?,
            company: row.get(5)?,
            cost: row.get(6)?,
            benefits: row.get(7)?,
            details: row.get(8)?,
            category: row.get(9)?,
            function: row.get(10)?,
            source: row.get(11)?,
            extra: serde_json::from_str(&extra).unwrap_or_default(),
            created_at: row.get::<_, i64>(13)? as u64,
            updated_at: row.get::<_, i64>(14)? as u64,
        })
    }
}

/// Encode an embedding as little-endian f32 bytes.
fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into an embedding.
fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity, clamped to [0, 1].
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn upsert_record(&self, record: SourceRecord) -> Result<()> {
        let extra = serde_json::to_string(&record.extra)?;

        self.with_conn(|conn| {
            // Replacing the row cascades away the previous index generation's
            // chunks.
            conn.execute("DELETE FROM records WHERE code = ?1", params![record.code])
                .map_err(|e| EngineError::database(e.to_string()))?;

            conn.execute(
                r#"
                INSERT INTO records (id, code, trade_name, inci_name, supplier, company, cost,
                                     benefits, details, category, function, source, extra,
                                     created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
                params![
                    record.id.to_string(),
                    record.code,
                    record.trade_name,
                    record.inci_name,
                    record.supplier,
                    record.company,
                    record.cost,
                    record.benefits,
                    record.details,
                    record.category,
                    record.function,
                    record.source,
                    extra,
                    record.created_at as i64,
                    record.updated_at as i64,
                ],
            )
            .map_err(|e| EngineError::database(format!("Failed to insert record: {}", e)))?;

            debug!("Upserted record: {}", record.code);
            Ok(())
        })
    }

    async fn get_record(&self, code: &str) -> Result<Option<SourceRecord>> {
        let code = code.to_string();
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM records WHERE code = ?1", RECORD_COLUMNS);
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| EngineError::database(e.to_string()))?;

            let result = stmt
                .query_row(params![code], |row| Self::row_to_record(row))
                .optional()
                .map_err(|e| EngineError::database(e.to_string()))?;

            Ok(result)
        })
    }

    async fn find(&self, filter: &RecordFilter, limit: usize) -> Result<Vec<SourceRecord>> {
        let filter = filter.clone();
        self.with_conn(|conn| {
            let mut clauses: Vec<String> = Vec::new();
            let mut sql_params: Vec<String> = Vec::new();

            // Identity predicates OR together into one group.
            let mut identity: Vec<String> = Vec::new();
            if !filter.codes.is_empty() {
                let placeholders = vec!["?"; filter.codes.len()].join(", ");
                identity.push(format!("LOWER(code) IN ({})", placeholders));
                sql_params.extend(filter.codes.iter().map(|c| c.to_lowercase()));
            }
            for name in &filter.names {
                identity.push("(LOWER(trade_name) LIKE ? OR LOWER(inci_name) LIKE ?)".to_string());
                let pattern = format!("%{}%", name.to_lowercase());
                sql_params.push(pattern.clone());
                sql_params.push(pattern);
            }
            if let Some(text) = &filter.text {
                identity.push(
                    "(LOWER(code) LIKE ? OR LOWER(trade_name) LIKE ? OR LOWER(inci_name) LIKE ?)"
                        .to_string(),
                );
                let pattern = format!("%{}%", text.to_lowercase());
                for _ in 0..3 {
                    sql_params.push(pattern.clone());
                }
            }
            if !identity.is_empty() {
                clauses.push(format!("({})", identity.join(" OR ")));
            }

            if let Some(category) = &filter.category {
                clauses.push("LOWER(category) = ?".to_string());
                sql_params.push(category.to_lowercase());
            }
            if let Some(source_tag) = &filter.source_tag {
                clauses.push("source = ?".to_string());
                sql_params.push(source_tag.clone());
            }

            let where_clause = if clauses.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", clauses.join(" AND "))
            };
            let sql = format!(
                "SELECT {} FROM records{} ORDER BY code LIMIT {}",
                RECORD_COLUMNS, where_clause, limit
            );

            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| EngineError::database(e.to_string()))?;

            let records = stmt
                .query_map(params_from_iter(sql_params.iter()), |row| {
                    Self::row_to_record(row)
                })
                .map_err(|e| EngineError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| EngineError::database(e.to_string()))?;

            Ok(records)
        })
    }

    async fn count_records(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
                .map_err(|e| EngineError::database(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(EngineError::config(format!(
                "chunk/embedding count mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let chunks = chunks.to_vec();
        let embeddings = embeddings.to_vec();

        self.with_conn(|conn| {
            // Chunks live for one index generation: drop the previous
            // generation for every record in the batch first.
            let codes: HashSet<&str> = chunks.iter().map(|c| c.record_code.as_str()).collect();
            for code in codes {
                conn.execute("DELETE FROM chunks WHERE record_code = ?1", params![code])
                    .map_err(|e| EngineError::database(e.to_string()))?;
            }

            for (chunk, embedding) in chunks.iter().zip(&embeddings) {
                let source_fields = serde_json::to_string(&chunk.source_fields)?;
                conn.execute(
                    r#"
                    INSERT INTO chunks (id, record_id, record_code, chunk_type, content,
                                        source_fields, priority, char_count, split_index, embedding)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    "#,
                    params![
                        chunk.id,
                        chunk.record_id.to_string(),
                        chunk.record_code,
                        chunk.chunk_type.to_string(),
                        chunk.text,
                        source_fields,
                        chunk.priority as f64,
                        chunk.char_count as i64,
                        chunk.split_index,
                        encode_embedding(embedding),
                    ],
                )
                .map_err(|e| EngineError::database(format!("Failed to insert chunk: {}", e)))?;
            }

            debug!("Upserted {} chunks", chunks.len());
            Ok(())
        })
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorHit>> {
        let query_embedding = embedding.to_vec();
        let filter = filter.clone();

        self.with_conn(|conn| {
            let mut clauses = vec!["c.embedding IS NOT NULL".to_string()];
            let mut sql_params: Vec<String> = Vec::new();

            if let Some(category) = &filter.category {
                clauses.push("LOWER(r.category) = ?".to_string());
                sql_params.push(category.to_lowercase());
            }
            if let Some(user) = &filter.exclude_user {
                clauses.push("(r.source IS NULL OR r.source != ?)".to_string());
                sql_params.push(format!("user:{}", user));
            }

            let sql = format!(
                r#"
                SELECT c.id, c.record_code, c.chunk_type, c.content, c.priority, c.embedding,
                       r.trade_name, r.category, r.source, r.extra
                FROM chunks c
                JOIN records r ON r.id = c.record_id
                WHERE {}
                "#,
                clauses.join(" AND ")
            );

            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| EngineError::database(e.to_string()))?;

            let rows = stmt
                .query_map(params_from_iter(sql_params.iter()), |row| {
                    let extra: String = row.get(9)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, Option<String>>(8)?,
                        extra,
                    ))
                })
                .map_err(|e| EngineError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| EngineError::database(e.to_string()))?;

            let mut hits = Vec::new();
            for (id, record_code, chunk_type, content, priority, blob, trade_name, category, source, extra) in
                rows
            {
                let chunk_embedding = decode_embedding(&blob);
                if chunk_embedding.len() != query_embedding.len() {
                    continue;
                }

                let score = cosine(&query_embedding, &chunk_embedding) * priority as f32;
                if score <= 0.0 {
                    continue;
                }

                let mut metadata: HashMap<String, serde_json::Value> =
                    serde_json::from_str(&extra).unwrap_or_default();
                metadata.insert("code".to_string(), serde_json::json!(record_code));
                metadata.insert("chunk_type".to_string(), serde_json::json!(chunk_type));
                if let Some(trade_name) = trade_name {
                    metadata.insert("trade_name".to_string(), serde_json::json!(trade_name));
                }
                if let Some(category) = category {
                    metadata.insert("category".to_string(), serde_json::json!(category));
                }
                if let Some(source) = source {
                    metadata.insert("source".to_string(), serde_json::json!(source));
                }

                hits.push(VectorHit {
                    id,
                    record_code,
                    score,
                    content,
                    metadata,
                });
            }

            hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            hits.truncate(top_k);

            Ok(hits)
        })
    }

    async fn count_chunks(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                .map_err(|e| EngineError::database(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use inci_core::ChunkType;

    fn record(code: &str, trade: &str, category: &str) -> SourceRecord {
        let mut r = SourceRecord::new(code);
        r.trade_name = Some(trade.to_string());
        r.inci_name = Some(format!("{} INCI", trade));
        r.category = Some(category.to_string());
        r
    }

    fn chunk_for(record: &SourceRecord, ordinal: u32) -> Chunk {
        Chunk::new(
            record,
            ChunkType::CombinedContext,
            format!("Code: {}", record.code),
            BTreeSet::new(),
            1.0,
            ordinal,
            None,
        )
    }

    #[tokio::test]
    async fn test_record_round_trip() {
        let store = SqliteStore::open_memory().unwrap();
        let r = record("RM000001", "Aqua Soothe", "humectant");
        store.upsert_record(r.clone()).await.unwrap();

        let fetched = store.get_record("rm000001").await.unwrap().unwrap();
        assert_eq!(fetched.code, "RM000001");
        assert_eq!(fetched.trade_name.as_deref(), Some("Aqua Soothe"));

        assert_eq!(store.count_records().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_code() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .upsert_record(record("RM000001", "Old Name", "humectant"))
            .await
            .unwrap();
        store
            .upsert_record(record("RM000001", "New Name", "humectant"))
            .await
            .unwrap();

        assert_eq!(store.count_records().await.unwrap(), 1);
        let fetched = store.get_record("RM000001").await.unwrap().unwrap();
        assert_eq!(fetched.trade_name.as_deref(), Some("New Name"));
    }

    #[tokio::test]
    async fn test_find_by_code_and_name() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .upsert_record(record("RM000001", "Aqua Soothe", "humectant"))
            .await
            .unwrap();
        store
            .upsert_record(record("RM000002", "Sun Shield", "uv_filter"))
            .await
            .unwrap();

        let filter = RecordFilter {
            codes: vec!["RM000001".to_string()],
            ..Default::default()
        };
        let found = store.find(&filter, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "RM000001");

        let filter = RecordFilter {
            names: vec!["soothe".to_string()],
            ..Default::default()
        };
        let found = store.find(&filter, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "RM000001");
    }

    #[tokio::test]
    async fn test_find_with_category_conjunction() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .upsert_record(record("RM000001", "Aqua Soothe", "humectant"))
            .await
            .unwrap();
        store
            .upsert_record(record("RM000002", "Aqua Shield", "uv_filter"))
            .await
            .unwrap();

        let filter = RecordFilter {
            text: Some("aqua".to_string()),
            category: Some("humectant".to_string()),
            ..Default::default()
        };
        let found = store.find(&filter, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "RM000001");
    }

    #[tokio::test]
    async fn test_vector_round_trip_and_ranking() {
        let store = SqliteStore::open_memory().unwrap();
        let a = record("RM000001", "Aqua Soothe", "humectant");
        let b = record("RM000002", "Sun Shield", "uv_filter");
        store.upsert_record(a.clone()).await.unwrap();
        store.upsert_record(b.clone()).await.unwrap();

        let chunks = vec![chunk_for(&a, 0), chunk_for(&b, 0)];
        let embeddings = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        store.upsert(&chunks, &embeddings).await.unwrap();
        assert_eq!(store.count_chunks().await.unwrap(), 2);

        let hits = store
            .query(&[1.0, 0.1, 0.0], 10, &VectorFilter::default())
            .await
            .unwrap();
        assert_eq!(hits[0].record_code, "RM000001");
        assert!(hits[0].score > hits.get(1).map(|h| h.score).unwrap_or(0.0));
    }

    #[tokio::test]
    async fn test_vector_category_filter() {
        let store = SqliteStore::open_memory().unwrap();
        let a = record("RM000001", "Aqua Soothe", "humectant");
        let b = record("RM000002", "Sun Shield", "uv_filter");
        store.upsert_record(a.clone()).await.unwrap();
        store.upsert_record(b.clone()).await.unwrap();

        let chunks = vec![chunk_for(&a, 0), chunk_for(&b, 0)];
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        store.upsert(&chunks, &embeddings).await.unwrap();

        let filter = VectorFilter {
            category: Some("uv_filter".to_string()),
            ..Default::default()
        };
        let hits = store.query(&[1.0, 0.0], 10, &filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record_code, "RM000002");
    }

    #[tokio::test]
    async fn test_vector_excluded_user_filter() {
        let store = SqliteStore::open_memory().unwrap();
        let mut a = record("RM000001", "Aqua Soothe", "humectant");
        a.source = Some("user:alice".to_string());
        let b = record("RM000002", "Sun Shield", "uv_filter");
        store.upsert_record(a.clone()).await.unwrap();
        store.upsert_record(b.clone()).await.unwrap();

        let chunks = vec![chunk_for(&a, 0), chunk_for(&b, 0)];
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        store.upsert(&chunks, &embeddings).await.unwrap();

        let filter = VectorFilter {
            exclude_user: Some("alice".to_string()),
            ..Default::default()
        };
        let hits = store.query(&[1.0, 0.0], 10, &filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record_code, "RM000002");
    }

    #[tokio::test]
    async fn test_reindex_replaces_chunks() {
        let store = SqliteStore::open_memory().unwrap();
        let a = record("RM000001", "Aqua Soothe", "humectant");
        store.upsert_record(a.clone()).await.unwrap();

        store
            .upsert(&[chunk_for(&a, 0), chunk_for(&a, 1)], &[vec![1.0], vec![1.0]])
            .await
            .unwrap();
        assert_eq!(store.count_chunks().await.unwrap(), 2);

        // A second generation replaces the first wholesale.
        store.upsert(&[chunk_for(&a, 0)], &[vec![1.0]]).await.unwrap();
        assert_eq!(store.count_chunks().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let store = SqliteStore::open(&path).unwrap();
        store
            .upsert_record(record("RM000001", "Aqua Soothe", "humectant"))
            .await
            .unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.count_records().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mismatched_embedding_count_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let a = record("RM000001", "Aqua Soothe", "humectant");
        store.upsert_record(a.clone()).await.unwrap();

        let result = store.upsert(&[chunk_for(&a, 0)], &[]).await;
        assert!(result.is_err());
    }
}
