//! Backend contracts between the engine and its collaborators.
//!
//! All traits are object-safe so backends are injected as `Arc<dyn ...>`
//! at construction time; tests substitute in-memory fakes per strategy.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{Chunk, SourceRecord};

/// Structured filter for the record store's `find` contract.
///
/// Fields combine as: (codes OR names OR text) AND category AND source_tag.
/// An all-empty filter matches every record (bounded by the limit).
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Case-insensitive exact code matches.
    pub codes: Vec<String>,

    /// Case-insensitive containment against trade and INCI names.
    pub names: Vec<String>,

    /// Raw-text containment across the indexed identity fields (code,
    /// trade name, INCI name).
    pub text: Option<String>,

    /// Exact category match.
    pub category: Option<String>,

    /// Exact provenance-tag match.
    pub source_tag: Option<String>,
}

impl RecordFilter {
    /// Whether the filter carries no structured identity predicate
    /// (codes / names / text).
    pub fn has_no_predicate(&self) -> bool {
        self.codes.is_empty() && self.names.is_empty() && self.text.is_none()
    }
}

/// Record collection backend (exact / metadata / fuzzy store).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record, replacing any existing record with the same code.
    async fn upsert_record(&self, record: SourceRecord) -> Result<()>;

    /// Fetch a record by code (case-insensitive).
    async fn get_record(&self, code: &str) -> Result<Option<SourceRecord>>;

    /// Find records matching a structured filter.
    async fn find(&self, filter: &RecordFilter, limit: usize) -> Result<Vec<SourceRecord>>;

    /// Total record count.
    async fn count_records(&self) -> Result<u64>;
}

/// Metadata pre-filter for vector queries.
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    /// Restrict to records in this category.
    pub category: Option<String>,

    /// Exclude records authored by this user.
    pub exclude_user: Option<String>,
}

/// A scored hit from the vector backend.
#[derive(Debug, Clone)]
pub struct VectorHit {
    /// Chunk id.
    pub id: String,

    /// Parent record code.
    pub record_code: String,

    /// Similarity score in [0, 1].
    pub score: f32,

    /// Chunk text.
    pub content: String,

    /// Record metadata carried with the chunk.
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Vector / ANN backend over indexed chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Batch-upsert chunks with their embeddings. Replaces any prior chunks
    /// of the same records (chunk lifetime = index generation).
    async fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()>;

    /// Query by embedding with a metadata pre-filter.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorHit>>;

    /// Total indexed chunk count.
    async fn count_chunks(&self) -> Result<u64>;
}

/// Embedding service contract (black box; fixed dimensionality per
/// deployment).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimensionality.
    fn dimension(&self) -> usize;
}

/// Pluggable second-pass relevance scorer. The default implementation is a
/// term-overlap heuristic; a cross-encoder client satisfies the same
/// contract.
#[async_trait]
pub trait RerankScorer: Send + Sync {
    /// Relevance of `content` to `query`, bounded to [0, 1].
    async fn score(&self, query: &str, content: &str) -> Result<f32>;
}
