//! In-memory store for tests and examples.
//!
//! Implements the same backend contracts as `SqliteStore` with the same
//! filter semantics, so engine tests can substitute it per strategy.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use inci_core::{
    Chunk, EngineError, RecordFilter, RecordStore, Result, SourceRecord, VectorFilter,
    VectorHit, VectorStore,
};

/// In-memory record and vector store.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<SourceRecord>>,
    chunks: RwLock<Vec<(Chunk, Vec<f32>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_by_code(records: &[SourceRecord], code: &str) -> Option<SourceRecord> {
        records
            .iter()
            .find(|r| r.code.eq_ignore_ascii_case(code))
            .cloned()
    }

    fn matches(record: &SourceRecord, filter: &RecordFilter) -> bool {
        let identity_given = !filter.has_no_predicate();
        let mut identity_hit = !identity_given;

        if filter
            .codes
            .iter()
            .any(|c| record.code.eq_ignore_ascii_case(c))
        {
            identity_hit = true;
        }
        if !identity_hit {
            for name in &filter.names {
                let name = name.to_lowercase();
                let trade_hit = record
                    .trade_name
                    .as_deref()
                    .map(|t| t.to_lowercase().contains(&name))
                    .unwrap_or(false);
                let inci_hit = record
                    .inci_name
                    .as_deref()
                    .map(|i| i.to_lowercase().contains(&name))
                    .unwrap_or(false);
                if trade_hit || inci_hit {
                    identity_hit = true;
                    break;
                }
            }
        }
        if !identity_hit {
            if let Some(text) = &filter.text {
                let text = text.to_lowercase();
                let fields = [
                    Some(record.code.as_str()),
                    record.trade_name.as_deref(),
                    record.inci_name.as_deref(),
                ];
                identity_hit = fields
                    .into_iter()
                    .flatten()
                    .any(|f| f.to_lowercase().contains(&text));
            }
        }
        if !identity_hit {
            return false;
        }

        if let Some(category) = &filter.category {
            let hit = record
                .category
                .as_deref()
                .map(|c| c.eq_ignore_ascii_case(category))
                .unwrap_or(false);
            if !hit {
                return false;
            }
        }
        if let Some(source_tag) = &filter.source_tag {
            if record.source.as_deref() != Some(source_tag.as_str()) {
                return false;
            }
        }

        true
    }

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
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert_record(&self, record: SourceRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| EngineError::database(e.to_string()))?;
        records.retain(|r| !r.code.eq_ignore_ascii_case(&record.code));
        records.push(record);
        Ok(())
    }

    async fn get_record(&self, code: &str) -> Result<Option<SourceRecord>> {
        let records = self
            .records
            .read()
            .map_err(|e| EngineError::database(e.to_string()))?;
        Ok(Self::record_by_code(&records, code))
    }

    async fn find(&self, filter: &RecordFilter, limit: usize) -> Result<Vec<SourceRecord>> {
        let records = self
            .records
            .read()
            .map_err(|e| EngineError::database(e.to_string()))?;
        let mut found: Vec<SourceRecord> = records
            .iter()
            .filter(|r| Self::matches(r, filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.code.cmp(&b.code));
        found.truncate(limit);
        Ok(found)
    }

    async fn count_records(&self) -> Result<u64> {
        let records = self
            .records
            .read()
            .map_err(|e| EngineError::database(e.to_string()))?;
        Ok(records.len() as u64)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(EngineError::config(format!(
                "chunk/embedding count mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut stored = self
            .chunks
            .write()
            .map_err(|e| EngineError::database(e.to_string()))?;
        for chunk in chunks {
            stored.retain(|(c, _)| !c.record_code.eq_ignore_ascii_case(&chunk.record_code));
        }
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            stored.push((chunk.clone(), embedding.clone()));
        }
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorHit>> {
        let records = self
            .records
            .read()
            .map_err(|e| EngineError::database(e.to_string()))?;
        let chunks = self
            .chunks
            .read()
            .map_err(|e| EngineError::database(e.to_string()))?;

        let mut hits = Vec::new();
        for (chunk, chunk_embedding) in chunks.iter() {
            let record = match Self::record_by_code(&records, &chunk.record_code) {
                Some(r) => r,
                None => continue,
            };

            if let Some(category) = &filter.category {
                let hit = record
                    .category
                    .as_deref()
                    .map(|c| c.eq_ignore_ascii_case(category))
                    .unwrap_or(false);
                if !hit {
                    continue;
                }
            }
            if let Some(user) = &filter.exclude_user {
                if record.source.as_deref() == Some(format!("user:{}", user).as_str()) {
                    continue;
                }
            }

            let score = Self::cosine(embedding, chunk_embedding) * chunk.priority;
            if score <= 0.0 {
                continue;
            }

            let mut metadata: HashMap<String, serde_json::Value> = record.extra.clone();
            metadata.insert("code".to_string(), serde_json::json!(record.code));
            metadata.insert(
                "chunk_type".to_string(),
                serde_json::json!(chunk.chunk_type.to_string()),
            );
            if let Some(trade_name) = &record.trade_name {
                metadata.insert("trade_name".to_string(), serde_json::json!(trade_name));
            }
            if let Some(category) = &record.category {
                metadata.insert("category".to_string(), serde_json::json!(category));
            }
            if let Some(source) = &record.source {
                metadata.insert("source".to_string(), serde_json::json!(source));
            }

            hits.push(VectorHit {
                id: chunk.id.clone(),
                record_code: chunk.record_code.clone(),
                score,
                content: chunk.text.clone(),
                metadata,
            });
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count_chunks(&self) -> Result<u64> {
        let chunks = self
            .chunks
            .read()
            .map_err(|e| EngineError::database(e.to_string()))?;
        Ok(chunks.len() as u64)
    }
}
