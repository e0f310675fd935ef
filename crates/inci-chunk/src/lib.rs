//! inci-chunk - Index-time chunking
//!
//! Turns ingredient records into overlapping, purpose-tagged chunks for the
//! semantic backend. Each chunk carries the fields it covers and a priority
//! weight from the configured table.
//!
//! # Example
//!
//! ```rust
//! use inci_chunk::ChunkBuilder;
//! use inci_core::{ChunkingConfig, SourceRecord};
//!
//! let builder = ChunkBuilder::new(ChunkingConfig::default()).unwrap();
//! let mut record = SourceRecord::new("RM000001");
//! record.trade_name = Some("Aqua Soothe".to_string());
//! let chunks = builder.chunk_record(&record).unwrap();
//! assert!(!chunks.is_empty());
//! ```

mod builder;
mod window;

pub use builder::ChunkBuilder;
pub use window::{fixed_windows, truncate_with_marker};

// Re-export types for convenience
pub use inci_core::{Chunk, ChunkType, ChunkingConfig};
