//! Record chunking.
//!
//! Turns one `SourceRecord` into the set of indexable chunks the semantic
//! backend consumes. Each chunk strategy targets a different retrieval
//! purpose; priorities come from the configured table.

use std::collections::BTreeSet;

use tracing::debug;

use inci_core::{
    Chunk, ChunkType, ChunkingConfig, EngineError, FieldName, Result, SourceRecord,
};

use crate::window::{fixed_windows, truncate_with_marker};

/// Builds chunks from source records at index time.
pub struct ChunkBuilder {
    config: ChunkingConfig,
}

impl ChunkBuilder {
    /// Create a builder with the given chunking configuration.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.max_chunk_size == 0 {
            return Err(EngineError::config("max_chunk_size must be positive"));
        }
        if config.overlap >= config.max_chunk_size {
            return Err(EngineError::config(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                config.overlap, config.max_chunk_size
            )));
        }
        Ok(Self { config })
    }

    /// Chunk a record. Deterministic: the same record yields the same chunk
    /// set, so re-chunking is idempotent.
    pub fn chunk_record(&self, record: &SourceRecord) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut ordinal = 0u32;

        let mut push = |chunks: &mut Vec<Chunk>,
                        chunk_type: ChunkType,
                        text: String,
                        fields: BTreeSet<FieldName>,
                        split_index: Option<u32>| {
            if text.trim().is_empty() {
                return;
            }
            let priority = self.config.priorities.for_type(chunk_type);
            chunks.push(Chunk::new(
                record,
                chunk_type,
                text,
                fields,
                priority,
                ordinal,
                split_index,
            ));
            ordinal += 1;
        };

        if let Some((text, fields)) = self.primary_identifier(record) {
            push(
                &mut chunks,
                ChunkType::PrimaryIdentifier,
                self.clamp(&text),
                fields,
                None,
            );
        }

        if let Some((text, fields)) = self.code_exact(record) {
            push(&mut chunks, ChunkType::CodeExact, self.clamp(&text), fields, None);
        }

        if let Some((text, fields)) = self.technical_specs(record) {
            push(
                &mut chunks,
                ChunkType::TechnicalSpecs,
                self.clamp(&text),
                fields,
                None,
            );
        }

        if let Some((text, fields)) = self.commercial_info(record) {
            push(
                &mut chunks,
                ChunkType::CommercialInfo,
                self.clamp(&text),
                fields,
                None,
            );
        }

        if let Some(benefits) = record.benefits.as_deref() {
            let mut fields = BTreeSet::new();
            fields.insert(FieldName::Benefits);
            push(
                &mut chunks,
                ChunkType::Descriptive,
                self.clamp(benefits),
                fields,
                None,
            );
        }

        if let Some(details) = record.details.as_deref() {
            let windows = fixed_windows(
                details,
                self.config.max_chunk_size,
                self.config.overlap,
                self.config.max_detail_chunks,
            );
            let split = windows.len() > 1;
            for (i, text) in windows.into_iter().enumerate() {
                let mut fields = BTreeSet::new();
                fields.insert(FieldName::Details);
                let split_index = if split { Some(i as u32) } else { None };
                push(&mut chunks, ChunkType::Descriptive, text, fields, split_index);
            }
        }

        {
            let (text, fields) = self.combined_context(record);
            push(&mut chunks, ChunkType::CombinedContext, text, fields, None);
        }

        if record.has_thai_content() {
            if let Some((text, fields)) = self.locale(record) {
                push(&mut chunks, ChunkType::Locale, self.clamp(&text), fields, None);
            }
        }

        debug!(
            code = %record.code,
            count = chunks.len(),
            "chunked record"
        );

        Ok(chunks)
    }

    /// Enforce the max-length invariant on non-windowed chunk text.
    fn clamp(&self, text: &str) -> String {
        truncate_with_marker(text, self.config.max_chunk_size)
    }

    /// Code, trade name and INCI name, each in labeled and raw form so both
    /// structured and loose queries can match.
    fn primary_identifier(&self, r: &SourceRecord) -> Option<(String, BTreeSet<FieldName>)> {
        let mut lines = Vec::new();
        let mut fields = BTreeSet::new();

        lines.push(format!("Code: {}", r.code));
        lines.push(r.code.clone());
        fields.insert(FieldName::Code);

        if let Some(trade) = r.trade_name.as_deref() {
            lines.push(format!("Trade name: {}", trade));
            lines.push(trade.to_string());
            fields.insert(FieldName::TradeName);
        }
        if let Some(inci) = r.inci_name.as_deref() {
            lines.push(format!("INCI: {}", inci));
            lines.push(inci.to_string());
            fields.insert(FieldName::InciName);
        }

        Some((lines.join("\n"), fields))
    }

    /// Minimal chunk of code plus trade name, optimized for exact lookups.
    fn code_exact(&self, r: &SourceRecord) -> Option<(String, BTreeSet<FieldName>)> {
        let mut fields = BTreeSet::new();
        fields.insert(FieldName::Code);

        let text = match r.trade_name.as_deref() {
            Some(trade) => {
                fields.insert(FieldName::TradeName);
                format!("{} {}", r.code, trade)
            }
            None => r.code.clone(),
        };

        Some((text, fields))
    }

    /// INCI name, category, function and trade name.
    fn technical_specs(&self, r: &SourceRecord) -> Option<(String, BTreeSet<FieldName>)> {
        if r.inci_name.is_none() && r.category.is_none() && r.function.is_none() {
            return None;
        }

        let mut lines = Vec::new();
        let mut fields = BTreeSet::new();

        if let Some(inci) = r.inci_name.as_deref() {
            lines.push(format!("INCI: {}", inci));
            fields.insert(FieldName::InciName);
        }
        if let Some(category) = r.category.as_deref() {
            lines.push(format!("Category: {}", category));
            fields.insert(FieldName::Category);
        }
        if let Some(function) = r.function.as_deref() {
            lines.push(format!("Function: {}", function));
            fields.insert(FieldName::Function);
        }
        if let Some(trade) = r.trade_name.as_deref() {
            lines.push(format!("Trade name: {}", trade));
            fields.insert(FieldName::TradeName);
        }

        Some((lines.join("\n"), fields))
    }

    /// Code, supplier, company and cost. Emitted only when at least two of
    /// these fields are present; the code alone is not commercial content.
    fn commercial_info(&self, r: &SourceRecord) -> Option<(String, BTreeSet<FieldName>)> {
        let present = 1 // code
            + r.supplier.is_some() as usize
            + r.company.is_some() as usize
            + r.cost.is_some() as usize;
        if present < 2 {
            return None;
        }

        let mut lines = vec![format!("Code: {}", r.code)];
        let mut fields = BTreeSet::new();
        fields.insert(FieldName::Code);

        if let Some(supplier) = r.supplier.as_deref() {
            lines.push(format!("Supplier: {}", supplier));
            fields.insert(FieldName::Supplier);
        }
        if let Some(company) = r.company.as_deref() {
            lines.push(format!("Company: {}", company));
            fields.insert(FieldName::Company);
        }
        if let Some(cost) = r.cost {
            lines.push(format!("Cost: {}", cost));
            fields.insert(FieldName::Cost);
        }

        Some((lines.join("\n"), fields))
    }

    /// All present fields in fixed priority order, truncated to the chunk
    /// size limit. The single chunk optimized for broad semantic recall.
    fn combined_context(&self, r: &SourceRecord) -> (String, BTreeSet<FieldName>) {
        let mut parts = Vec::new();
        let mut fields = BTreeSet::new();

        parts.push(format!("Code: {}", r.code));
        fields.insert(FieldName::Code);

        let labeled: [(&str, Option<&str>, FieldName); 8] = [
            ("Trade name", r.trade_name.as_deref(), FieldName::TradeName),
            ("INCI", r.inci_name.as_deref(), FieldName::InciName),
            ("Category", r.category.as_deref(), FieldName::Category),
            ("Function", r.function.as_deref(), FieldName::Function),
            ("Supplier", r.supplier.as_deref(), FieldName::Supplier),
            ("Company", r.company.as_deref(), FieldName::Company),
            ("Benefits", r.benefits.as_deref(), FieldName::Benefits),
            ("Details", r.details.as_deref(), FieldName::Details),
        ];
        for (label, value, field) in labeled {
            if let Some(value) = value {
                parts.push(format!("{}: {}", label, value));
                fields.insert(field);
            }
        }
        if let Some(cost) = r.cost {
            parts.push(format!("Cost: {}", cost));
            fields.insert(FieldName::Cost);
        }

        let text = truncate_with_marker(&parts.join(" | "), self.config.max_chunk_size);
        (text, fields)
    }

    /// Thai-labeled rendering of the primary fields.
    fn locale(&self, r: &SourceRecord) -> Option<(String, BTreeSet<FieldName>)> {
        let mut lines = vec![format!("รหัสวัตถุดิบ: {}", r.code)];
        let mut fields = BTreeSet::new();
        fields.insert(FieldName::Code);

        if let Some(trade) = r.trade_name.as_deref() {
            lines.push(format!("ชื่อการค้า: {}", trade));
            fields.insert(FieldName::TradeName);
        }
        if let Some(inci) = r.inci_name.as_deref() {
            lines.push(format!("ชื่อ INCI: {}", inci));
            fields.insert(FieldName::InciName);
        }
        if let Some(category) = r.category.as_deref() {
            lines.push(format!("หมวดหมู่: {}", category));
            fields.insert(FieldName::Category);
        }
        if let Some(benefits) = r.benefits.as_deref() {
            lines.push(format!("คุณประโยชน์: {}", benefits));
            fields.insert(FieldName::Benefits);
        }

        Some((lines.join("\n"), fields))
    }
}
