//! Error taxonomy for the retrieval engine.

use thiserror::Error;

/// Result type alias using EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the retrieval engine.
///
/// Only `Config` and `SearchUnavailable` reach callers of the search
/// entrypoint; every other variant is recovered locally (degraded strategy,
/// fallback classification, unmodified rerank scores).
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid or missing options, rejected before any backend call.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A single strategy's backend is down.
    #[error("Backend unavailable for {strategy} strategy: {message}")]
    BackendUnavailable { strategy: String, message: String },

    /// Query classification failed (always degraded, never propagated).
    #[error("Classification failure: {message}")]
    Classification { message: String },

    /// Rerank scoring failed (recovered with unmodified scores).
    #[error("Rerank failure: {message}")]
    Rerank { message: String },

    /// Embedding call failed.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Database error.
    #[error("Database error: {message}")]
    Database { message: String },

    /// Record not found.
    #[error("Record not found: {code}")]
    RecordNotFound { code: String },

    /// Every enabled strategy failed; distinct from "no matches found".
    #[error("Search unavailable: {message}")]
    SearchUnavailable { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a backend-unavailable error for a strategy.
    pub fn backend(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            strategy: strategy.into(),
            message: message.into(),
        }
    }

    /// Create a classification error.
    pub fn classification(message: impl Into<String>) -> Self {
        Self::Classification {
            message: message.into(),
        }
    }

    /// Create a rerank error.
    pub fn rerank(message: impl Into<String>) -> Self {
        Self::Rerank {
            message: message.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create a search-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::SearchUnavailable {
            message: message.into(),
        }
    }

    /// Stable code for HTTP/UI callers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            Self::Classification { .. } => "CLASSIFICATION_FAILURE",
            Self::Rerank { .. } => "RERANK_FAILURE",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            Self::SearchUnavailable { .. } => "SEARCH_UNAVAILABLE",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::backend("semantic", "connection refused");
        assert!(err.to_string().contains("semantic"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(EngineError::config("x").error_code(), "CONFIG_ERROR");
        assert_eq!(
            EngineError::unavailable("all strategies failed").error_code(),
            "SEARCH_UNAVAILABLE"
        );
    }
}
