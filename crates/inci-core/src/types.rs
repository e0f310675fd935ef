//! Core domain types for the ingredient retrieval engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use ulid::Ulid;

/// Fields of a source record that chunking and scoring can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Code,
    TradeName,
    InciName,
    Supplier,
    Company,
    Cost,
    Benefits,
    Details,
    Category,
    Function,
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Code => "code",
            Self::TradeName => "trade_name",
            Self::InciName => "inci_name",
            Self::Supplier => "supplier",
            Self::Company => "company",
            Self::Cost => "cost",
            Self::Benefits => "benefits",
            Self::Details => "details",
            Self::Category => "category",
            Self::Function => "function",
        };
        write!(f, "{}", s)
    }
}

/// An ingredient record in the knowledge base.
///
/// `code` is the unique primary identifier (raw-material code such as
/// `RM000001`). Records are immutable once chunked for an index generation;
/// re-ingestion replaces their chunks wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Row identifier (ULID), assigned at ingestion.
    pub id: Ulid,

    /// Unique raw-material code (case-insensitive unique).
    pub code: String,

    /// Commercial trade name.
    pub trade_name: Option<String>,

    /// INCI (International Nomenclature of Cosmetic Ingredients) name.
    pub inci_name: Option<String>,

    /// Supplier name.
    pub supplier: Option<String>,

    /// Manufacturer / company name.
    pub company: Option<String>,

    /// Unit cost.
    pub cost: Option<f64>,

    /// Free-text benefits description.
    pub benefits: Option<String>,

    /// Free-text technical details.
    pub details: Option<String>,

    /// Ingredient category (e.g. "humectant").
    pub category: Option<String>,

    /// Functional role (e.g. "emulsifier").
    pub function: Option<String>,

    /// Provenance tag (e.g. "catalog", "user:alice").
    pub source: Option<String>,

    /// Open extension map for vendor-specific fields.
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,

    /// Last update timestamp (Unix millis).
    pub updated_at: u64,
}

impl SourceRecord {
    /// Create a new record with the given code.
    pub fn new(code: &str) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            id: Ulid::new(),
            code: code.to_string(),
            trade_name: None,
            inci_name: None,
            supplier: None,
            company: None,
            cost: None,
            benefits: None,
            details: None,
            category: None,
            function: None,
            source: None,
            extra: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether any field carries Thai script content.
    pub fn has_thai_content(&self) -> bool {
        let fields = [
            Some(self.code.as_str()),
            self.trade_name.as_deref(),
            self.inci_name.as_deref(),
            self.benefits.as_deref(),
            self.details.as_deref(),
            self.category.as_deref(),
            self.function.as_deref(),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|s| s.chars().any(is_thai_char))
    }
}

/// Check whether a character is in the Thai Unicode block.
pub fn is_thai_char(c: char) -> bool {
    ('\u{0E00}'..='\u{0E7F}').contains(&c)
}

/// Chunk type, determines what the chunk is optimized to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    PrimaryIdentifier,
    CodeExact,
    TechnicalSpecs,
    CommercialInfo,
    Descriptive,
    CombinedContext,
    Locale,
}

impl ChunkType {
    /// All chunk types, in emission order.
    pub fn all() -> [ChunkType; 7] {
        [
            Self::PrimaryIdentifier,
            Self::CodeExact,
            Self::TechnicalSpecs,
            Self::CommercialInfo,
            Self::Descriptive,
            Self::CombinedContext,
            Self::Locale,
        ]
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PrimaryIdentifier => "primary_identifier",
            Self::CodeExact => "code_exact",
            Self::TechnicalSpecs => "technical_specs",
            Self::CommercialInfo => "commercial_info",
            Self::Descriptive => "descriptive",
            Self::CombinedContext => "combined_context",
            Self::Locale => "locale",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ChunkType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "primary_identifier" => Ok(Self::PrimaryIdentifier),
            "code_exact" => Ok(Self::CodeExact),
            "technical_specs" => Ok(Self::TechnicalSpecs),
            "commercial_info" => Ok(Self::CommercialInfo),
            "descriptive" => Ok(Self::Descriptive),
            "combined_context" => Ok(Self::CombinedContext),
            "locale" => Ok(Self::Locale),
            other => Err(format!("unknown chunk type: {}", other)),
        }
    }
}

/// An indexable text unit derived from a source record.
///
/// Chunk ids are a blake3 hash of `code|type|ordinal`, so chunking the same
/// record twice yields identical chunk sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic identifier (blake3 hex).
    pub id: String,

    /// Parent record row id.
    pub record_id: Ulid,

    /// Parent record code.
    pub record_code: String,

    /// What this chunk is optimized to match.
    pub chunk_type: ChunkType,

    /// Chunk text. Invariant: non-empty, within the configured max length.
    pub text: String,

    /// Which record fields the text covers.
    pub source_fields: BTreeSet<FieldName>,

    /// Retrieval priority weight in [0, 1].
    pub priority: f32,

    /// Character count of `text`.
    pub char_count: usize,

    /// Index within a split sequence (details windowing).
    pub split_index: Option<u32>,

    /// Whether this chunk came from splitting an over-long field.
    pub is_split: bool,
}

impl Chunk {
    /// Build a chunk with a deterministic id derived from its identity.
    /// `ordinal` is the chunk's position in the record's emission sequence.
    pub fn new(
        record: &SourceRecord,
        chunk_type: ChunkType,
        text: String,
        source_fields: BTreeSet<FieldName>,
        priority: f32,
        ordinal: u32,
        split_index: Option<u32>,
    ) -> Self {
        let seed = format!("{}|{}|{}", record.code.to_lowercase(), chunk_type, ordinal);
        let id = hex::encode(blake3::hash(seed.as_bytes()).as_bytes());
        let char_count = text.chars().count();

        Self {
            id,
            record_id: record.id,
            record_code: record.code.clone(),
            chunk_type,
            text,
            source_fields,
            priority,
            char_count,
            split_index,
            is_split: split_index.is_some(),
        }
    }
}

/// One independent retrieval technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Exact,
    Metadata,
    Fuzzy,
    Semantic,
}

impl Strategy {
    /// Tie-break priority in final ranking (lower wins).
    pub fn rank_priority(&self) -> u8 {
        match self {
            Self::Exact => 0,
            Self::Metadata => 1,
            Self::Fuzzy => 2,
            Self::Semantic => 3,
        }
    }

    /// All strategies in rank-priority order.
    pub fn all() -> [Strategy; 4] {
        [Self::Exact, Self::Metadata, Self::Fuzzy, Self::Semantic]
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Metadata => "metadata",
            Self::Fuzzy => "fuzzy",
            Self::Semantic => "semantic",
        };
        write!(f, "{}", s)
    }
}

/// Primary query type decided by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    ExactCode,
    NaturalLanguage,
    Mixed,
}

/// Recommended routing for a classified query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchRoute {
    ExactFirst,
    SemanticFirst,
    Hybrid,
}

/// Identifiers extracted from a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    /// Code-like tokens, uppercased.
    pub codes: Vec<String>,

    /// Capitalized multi-word name candidates.
    pub names: Vec<String>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.names.is_empty()
    }
}

/// Per-request classification of a raw query. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryClassification {
    /// The original query text.
    pub query: String,

    /// Primary query type.
    pub query_type: QueryType,

    /// Extracted identifiers.
    pub entities: ExtractedEntities,

    /// Recommended routing.
    pub route: SearchRoute,

    /// Query expansions for semantic recall (first entry = original query).
    pub expanded_queries: Vec<String>,

    /// Classification confidence in [0, 1].
    pub confidence: f32,
}

impl QueryClassification {
    /// Safe default used when classification fails.
    pub fn fallback(query: &str) -> Self {
        Self {
            query: query.to_string(),
            query_type: QueryType::NaturalLanguage,
            entities: ExtractedEntities::default(),
            route: SearchRoute::SemanticFirst,
            expanded_queries: vec![query.to_string()],
            confidence: 0.1,
        }
    }
}

/// A scored match produced by a strategy, merged across strategies by
/// stable document identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable document identity (record code).
    pub document_id: String,

    /// Matched content shown to the caller.
    pub content: String,

    /// Record metadata (category, names, provenance).
    pub metadata: HashMap<String, serde_json::Value>,

    /// Relevance score. In [0, 1] after final ranking.
    pub score: f32,

    /// Strategies that found this document.
    pub strategies: BTreeSet<Strategy>,

    /// Second-pass relevance score, when reranking ran.
    pub rerank_score: Option<f32>,

    /// Rerank-stage blend (0.3 x original + 0.7 x rerank).
    pub combined_score: Option<f32>,
}

impl Candidate {
    /// Create a candidate from a single strategy hit.
    pub fn new(document_id: &str, content: &str, score: f32, strategy: Strategy) -> Self {
        let mut strategies = BTreeSet::new();
        strategies.insert(strategy);

        Self {
            document_id: document_id.to_string(),
            content: content.to_string(),
            metadata: HashMap::new(),
            score,
            strategies,
            rerank_score: None,
            combined_score: None,
        }
    }

    /// Whether more than one strategy found this document.
    pub fn is_hybrid(&self) -> bool {
        self.strategies.len() > 1
    }

    /// Stable merge key: document id, else metadata code, else content hash.
    pub fn merge_key(&self) -> String {
        if !self.document_id.is_empty() {
            return self.document_id.to_lowercase();
        }
        if let Some(code) = self.metadata.get("code").and_then(|v| v.as_str()) {
            if !code.is_empty() {
                return code.to_lowercase();
            }
        }
        hex::encode(blake3::hash(self.content.as_bytes()).as_bytes())
    }
}

/// Complexity level a user prefers in result content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Basic,
    Intermediate,
    Advanced,
}

impl Complexity {
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

/// Caller-supplied user preference signals for personalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Categories the user gravitates toward.
    #[serde(default)]
    pub preferred_categories: Vec<String>,

    /// Interest keywords.
    #[serde(default)]
    pub interests: Vec<String>,

    /// Preferred content complexity.
    #[serde(default)]
    pub complexity: Option<Complexity>,
}

/// Final output of a search: ordered results plus the counts needed to
/// tell "filtered out" apart from "no matches".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// The original query.
    pub query: String,

    /// Ordered results, highest score first.
    pub results: Vec<Candidate>,

    /// Candidate count before threshold/top-k filtering.
    pub pre_filter_count: usize,

    /// How many candidates the score threshold removed.
    pub filtered_out: usize,

    /// Strategies that failed and were degraded to empty results.
    pub degraded_strategies: Vec<Strategy>,

    /// Search latency in milliseconds.
    pub latency_ms: u64,
}

impl SearchOutcome {
    /// True when nothing matched at all (as opposed to everything being
    /// filtered out by the score threshold).
    pub fn no_matches(&self) -> bool {
        self.pre_filter_count == 0
    }
}
