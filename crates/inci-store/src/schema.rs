//! Database schema definitions.

/// Main schema SQL for initializing the database.
pub const SCHEMA: &str = r#"
-- Ingredient records
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE COLLATE NOCASE,
    trade_name TEXT,
    inci_name TEXT,
    supplier TEXT,
    company TEXT,
    cost REAL,
    benefits TEXT,
    details TEXT,
    category TEXT,
    function TEXT,
    source TEXT,
    extra TEXT DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_code ON records(code);
CREATE INDEX IF NOT EXISTS idx_records_category ON records(category);
CREATE INDEX IF NOT EXISTS idx_records_trade_name ON records(trade_name);
CREATE INDEX IF NOT EXISTS idx_records_inci_name ON records(inci_name);

-- Indexed chunks with embeddings (f32 little-endian BLOB)
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    record_id TEXT NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    record_code TEXT NOT NULL,
    chunk_type TEXT NOT NULL,
    content TEXT NOT NULL,
    source_fields TEXT NOT NULL,
    priority REAL NOT NULL,
    char_count INTEGER NOT NULL,
    split_index INTEGER,
    embedding BLOB
);

CREATE INDEX IF NOT EXISTS idx_chunks_record_id ON chunks(record_id);
CREATE INDEX IF NOT EXISTS idx_chunks_record_code ON chunks(record_code);
"#;

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;
