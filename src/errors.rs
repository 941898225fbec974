//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the statute search engine, providing the error
//! taxonomy shared by the pipeline, the retrieval service and the API layer.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from various system components
//! - **Output**: Structured error types with context and HTTP status mapping
//! - **Error Categories**: Dataset, Chunking, Retrieval, Encoder, Configuration
//!
//! ## Key Features
//! - Distinct variants for the caller-visible conditions: invalid chunking
//!   arguments, missing inputs, unmatched documents and searches against an
//!   unbuilt index
//! - Automatic conversion from I/O, JSON, binary-serialization and HTTP errors
//! - Status-code mapping consumed by the API handlers
//! - Structured logging integration via `category()`

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, SearchError>;

/// Comprehensive error types for the statute search engine
#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed chunking parameters (non-positive size, overlap >= size)
    #[error("Invalid chunking parameters: {reason}")]
    InvalidChunking { reason: String },

    /// Missing input: document directory, dataset file, or index artifacts
    #[error("{what} not found at {path}")]
    NotFound { what: String, path: String },

    /// A document's filename matches no entry in the statute allow-list
    #[error("File {file} does not match allowed statutes. Allowed: {allowed}")]
    UnmatchedDocument { file: String, allowed: String },

    /// `search` called before any successful `build_index`
    #[error("Retrieval index not built yet. Call build_index first.")]
    IndexNotBuilt,

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Embedding sidecar failures
    #[error("Encoder '{encoder}' failed: {details}")]
    Encoder { encoder: String, details: String },

    /// Generation sidecar failures
    #[error("Generation request failed: {details}")]
    Generation { details: String },

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(serde_json::Error),

    /// Binary serialization errors for the embedding artifact
    #[error("Serialization error: {0}")]
    Serialization(bincode::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(toml::de::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SearchError {
    /// HTTP status code the API layer should surface for this error
    pub fn status_code(&self) -> u16 {
        match self {
            SearchError::NotFound { .. } => 404,
            SearchError::InvalidChunking { .. }
            | SearchError::UnmatchedDocument { .. }
            | SearchError::IndexNotBuilt => 400,
            _ => 500,
        }
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            SearchError::InvalidChunking { .. } => "chunking",
            SearchError::NotFound { .. } | SearchError::UnmatchedDocument { .. } => "dataset",
            SearchError::IndexNotBuilt => "retrieval",
            SearchError::Config { .. } | SearchError::Toml(_) => "configuration",
            SearchError::Encoder { .. } => "encoder",
            SearchError::Generation { .. } => "generation",
            SearchError::Io(_) | SearchError::Serialization(_) => "storage",
            SearchError::Json(_) => "serialization",
            SearchError::Http(_) => "network",
            SearchError::Internal { .. } => "generic",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Io(err)
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Json(err)
    }
}

impl From<bincode::Error> for SearchError {
    fn from(err: bincode::Error) -> Self {
        SearchError::Serialization(err)
    }
}

impl From<toml::de::Error> for SearchError {
    fn from(err: toml::de::Error) -> Self {
        SearchError::Toml(err)
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_classes() {
        let not_found = SearchError::NotFound {
            what: "Dataset".to_string(),
            path: "data/missing.json".to_string(),
        };
        assert_eq!(not_found.status_code(), 404);
        assert_eq!(SearchError::IndexNotBuilt.status_code(), 400);

        let invalid = SearchError::InvalidChunking {
            reason: "overlap must be < chunk_size".to_string(),
        };
        assert_eq!(invalid.status_code(), 400);

        let internal = SearchError::Internal {
            message: "boom".to_string(),
        };
        assert_eq!(internal.status_code(), 500);
    }

    #[test]
    fn categories_cover_pipeline_stages() {
        let unmatched = SearchError::UnmatchedDocument {
            file: "random.txt".to_string(),
            allowed: "contract act, 1872".to_string(),
        };
        assert_eq!(unmatched.category(), "dataset");
        assert_eq!(SearchError::IndexNotBuilt.category(), "retrieval");
    }
}
