//! inci-embed - Embedding implementations
//!
//! The production embedding service is an external black box reached over
//! the `Embedder` trait. This crate ships the deterministic local
//! implementation used for offline indexing, examples and tests.

mod trigram;

pub use trigram::TrigramEmbedder;

// Re-export the Embedder trait for convenience
pub use inci_core::Embedder;
