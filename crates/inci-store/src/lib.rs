//! inci-store - Reference storage backend
//!
//! SQLite implementation of the two backend contracts the engine depends
//! on: the record collection (exact/metadata/fuzzy strategies) and the
//! chunk index with embeddings (semantic strategy). A `MemoryStore` with
//! identical filter semantics backs tests and examples.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use schema::{SCHEMA, SCHEMA_VERSION};
pub use sqlite::SqliteStore;

// Re-export the backend traits for convenience
pub use inci_core::{RecordFilter, RecordStore, VectorFilter, VectorHit, VectorStore};
