//! Query classification and entity extraction.
//!
//! Parses the raw query, pulls out code-like and name-like identifiers,
//! decides a primary query type and produces deterministic expansions for
//! semantic recall. Classification never fails: any internal error degrades
//! to a safe natural-language classification.

use regex::Regex;
use tracing::warn;

use inci_core::{
    EngineError, ExtractedEntities, QueryClassification, QueryType, Result, SearchRoute,
};

/// Keywords shorter than this are not expanded.
const MIN_KEYWORD_LEN: usize = 4;

/// Maximum synonym variants generated per keyword.
const MAX_SYNONYMS_PER_KEYWORD: usize = 3;

/// Deterministic synonym table (English + Thai cosmetic vocabulary).
/// Entries are matched by containment so Thai phrases expand without
/// whitespace tokenization.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("moisturizing", &["hydrating", "humectant", "moisture retention"]),
    ("moisturizer", &["humectant", "hydrator"]),
    ("hydrating", &["moisturizing", "humectant"]),
    ("hydration", &["moisture", "humectant"]),
    ("whitening", &["brightening", "lightening"]),
    ("brightening", &["whitening", "radiance"]),
    ("soothing", &["calming", "anti-irritant"]),
    ("cleansing", &["purifying", "washing"]),
    ("sunscreen", &["uv filter", "sun protection"]),
    ("anti-aging", &["antiwrinkle", "firming"]),
    ("thickener", &["viscosity modifier", "rheology modifier"]),
    ("preservative", &["antimicrobial", "broad spectrum preservation"]),
    ("emulsifier", &["surfactant", "oil-in-water stabilizer"]),
    ("fragrance", &["parfum", "scent"]),
    ("ชุ่มชื่น", &["เพิ่มความชุ่มชื้น", "มอยส์เจอไรเซอร์"]),
    ("กระจ่างใส", &["ไวท์เทนนิ่ง", "ผิวขาว"]),
    ("กันแดด", &["ป้องกันรังสียูวี"]),
    ("ลดริ้วรอย", &["ต่อต้านริ้วรอย"]),
];

/// Classifies raw queries into a routing decision plus extracted entities.
pub struct QueryClassifier {
    /// Whole-query strict identifier: fixed alpha prefix plus digits.
    code_strict: Regex,

    /// Code-like token anywhere in the query.
    code_token: Regex,

    /// Capitalized multi-word name.
    name_token: Regex,
}

impl QueryClassifier {
    /// Build a classifier. Fails only on pattern-compilation errors.
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| EngineError::classification(format!("bad pattern: {}", e)))
        };

        Ok(Self {
            code_strict: compile(r"^[A-Za-z]{2,4}[-_]?\d{4,}$")?,
            code_token: compile(r"\b[A-Za-z]{2,4}[-_]?\d{3,}\b")?,
            name_token: compile(r"\b[A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)+\b")?,
        })
    }

    /// Classify a query. Never raises; extraction errors fall back to a
    /// natural-language classification covering the raw query.
    pub fn classify(&self, query: &str) -> QueryClassification {
        match self.classify_inner(query) {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, "classification failed, using fallback");
                QueryClassification::fallback(query)
            }
        }
    }

    fn classify_inner(&self, query: &str) -> Result<QueryClassification> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(QueryClassification::fallback(query));
        }

        let entities = self.extract_entities(trimmed);
        let query_type = self.decide_type(trimmed, &entities);

        let (route, confidence) = match query_type {
            QueryType::ExactCode => (SearchRoute::ExactFirst, 0.95),
            QueryType::Mixed => (SearchRoute::Hybrid, 0.75),
            QueryType::NaturalLanguage if !entities.is_empty() => (SearchRoute::Hybrid, 0.7),
            QueryType::NaturalLanguage => (SearchRoute::SemanticFirst, 0.6),
        };

        Ok(QueryClassification {
            query: trimmed.to_string(),
            query_type,
            entities,
            route,
            expanded_queries: self.expand(trimmed),
            confidence,
        })
    }

    fn extract_entities(&self, query: &str) -> ExtractedEntities {
        let mut codes: Vec<String> = Vec::new();
        for m in self.code_token.find_iter(query) {
            let code = m.as_str().to_uppercase();
            if !codes.contains(&code) {
                codes.push(code);
            }
        }

        let mut names: Vec<String> = Vec::new();
        for m in self.name_token.find_iter(query) {
            let name = m.as_str().to_string();
            // A token run that is itself a code is not a name.
            if self.code_strict.is_match(&name) {
                continue;
            }
            if !names.contains(&name) {
                names.push(name);
            }
        }

        ExtractedEntities { codes, names }
    }

    fn decide_type(&self, query: &str, entities: &ExtractedEntities) -> QueryType {
        if self.code_strict.is_match(query) {
            return QueryType::ExactCode;
        }

        // Strip extracted entities; whatever survives is free text.
        let mut residue = query.to_string();
        for m in self.code_token.find_iter(query) {
            residue = residue.replace(m.as_str(), " ");
        }
        let residue_after_codes = residue.clone();
        for name in &entities.names {
            residue = residue.replace(name.as_str(), " ");
        }
        let has_free_text = residue.chars().any(|c| c.is_alphanumeric());

        if !entities.codes.is_empty()
            && !residue_after_codes.chars().any(|c| c.is_alphanumeric())
        {
            // Nothing but code tokens.
            return QueryType::ExactCode;
        }
        if !entities.is_empty() && has_free_text {
            return QueryType::Mixed;
        }

        QueryType::NaturalLanguage
    }

    /// Generate query expansions from the synonym table. Deterministic:
    /// table order drives variant order; duplicates are dropped.
    fn expand(&self, query: &str) -> Vec<String> {
        let query_lower = query.to_lowercase();
        let mut expanded = vec![query.to_string()];

        for (keyword, synonyms) in SYNONYMS {
            if keyword.chars().count() < MIN_KEYWORD_LEN {
                continue;
            }
            if !query_lower.contains(keyword) {
                continue;
            }
            for synonym in synonyms.iter().take(MAX_SYNONYMS_PER_KEYWORD) {
                let variant = query_lower.replace(keyword, synonym);
                if !expanded.contains(&variant) {
                    expanded.push(variant);
                }
            }
        }

        expanded
    }
}
