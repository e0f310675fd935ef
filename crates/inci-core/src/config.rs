//! Configuration types for the retrieval engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::ChunkType;

/// Main configuration for the retrieval engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Search defaults.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding dimensionality (fixed per deployment).
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
        }
    }
}

/// Chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Character overlap between split windows.
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Cap on split chunks produced from the details field. Keeps the total
    /// chunk count per record bounded regardless of field length.
    #[serde(default = "default_max_detail_chunks")]
    pub max_detail_chunks: usize,

    /// Priority table keyed by chunk type.
    #[serde(default)]
    pub priorities: ChunkPriorities,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            overlap: default_overlap(),
            max_detail_chunks: default_max_detail_chunks(),
            priorities: ChunkPriorities::default(),
        }
    }
}

/// Per-chunk-type priority weights in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPriorities {
    #[serde(default = "p_1_00")]
    pub primary_identifier: f32,
    #[serde(default = "p_1_00")]
    pub code_exact: f32,
    #[serde(default = "p_0_90")]
    pub technical_specs: f32,
    #[serde(default = "p_0_88")]
    pub combined_context: f32,
    #[serde(default = "p_0_80")]
    pub commercial_info: f32,
    #[serde(default = "p_0_75")]
    pub locale: f32,
    #[serde(default = "p_0_70")]
    pub descriptive: f32,
}

impl Default for ChunkPriorities {
    fn default() -> Self {
        Self {
            primary_identifier: 1.0,
            code_exact: 1.0,
            technical_specs: 0.9,
            combined_context: 0.88,
            commercial_info: 0.8,
            locale: 0.75,
            descriptive: 0.7,
        }
    }
}

impl ChunkPriorities {
    /// Priority for a chunk type.
    pub fn for_type(&self, chunk_type: ChunkType) -> f32 {
        match chunk_type {
            ChunkType::PrimaryIdentifier => self.primary_identifier,
            ChunkType::CodeExact => self.code_exact,
            ChunkType::TechnicalSpecs => self.technical_specs,
            ChunkType::CombinedContext => self.combined_context,
            ChunkType::CommercialInfo => self.commercial_info,
            ChunkType::Locale => self.locale,
            ChunkType::Descriptive => self.descriptive,
        }
    }
}

/// Search defaults applied when the caller does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of results.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Default minimum score.
    #[serde(default = "default_threshold")]
    pub score_threshold: f32,

    /// Default weight for semantic-tagged results.
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Default weight for keyword-tagged results.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Default fuzzy acceptance threshold.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f32,

    /// Rerank by default.
    #[serde(default = "default_true")]
    pub rerank: bool,

    /// Short-circuit on high-confidence exact matches by default.
    #[serde(default = "default_true")]
    pub exact_short_circuit: bool,

    /// Identifier of the rerank model when an external scorer is configured.
    #[serde(default)]
    pub rerank_model: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            score_threshold: default_threshold(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            fuzzy_threshold: default_fuzzy_threshold(),
            rerank: true,
            exact_short_circuit: true,
            rerank_model: None,
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_busy_timeout() -> u32 {
    30000
}

fn default_dimension() -> usize {
    384
}

fn default_max_chunk_size() -> usize {
    600
}

fn default_overlap() -> usize {
    80
}

fn default_max_detail_chunks() -> usize {
    3
}

fn default_top_k() -> usize {
    10
}

fn default_threshold() -> f32 {
    0.3
}

fn default_semantic_weight() -> f32 {
    0.6
}

fn default_keyword_weight() -> f32 {
    0.4
}

fn default_fuzzy_threshold() -> f32 {
    0.6
}

fn p_1_00() -> f32 {
    1.0
}

fn p_0_90() -> f32 {
    0.9
}

fn p_0_88() -> f32 {
    0.88
}

fn p_0_80() -> f32 {
    0.8
}

fn p_0_75() -> f32 {
    0.75
}

fn p_0_70() -> f32 {
    0.7
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("inci-search")
        .join("ingredients.db")
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::EngineError::config(format!("Failed to parse config: {}", e))
        })?;
        Ok(config)
    }

    /// Load configuration from default paths, falling back to defaults.
    pub fn load_default() -> crate::error::Result<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("inci-search").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        let local_config = PathBuf::from("inci-search.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }
}
