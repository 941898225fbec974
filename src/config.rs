//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the statute search engine, covering
//! the dataset pipeline, the retrieval service, the sidecar endpoints and the
//! HTTP server, with validation and type-safe access to all settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation, dependency verification
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration files
//! 3. Default values (lowest priority)
//!
//! ## Usage
//! ```rust,no_run
//! use statute_semantic_search::config::Config;
//!
//! # fn main() -> statute_semantic_search::errors::Result<()> {
//! let config = Config::from_file("config.toml")?;
//! println!("Server port: {}", config.server.port);
//! # Ok(())
//! # }
//! ```

use crate::errors::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Dataset construction settings
    pub dataset: DatasetConfig,
    /// Retrieval index settings
    pub retrieval: RetrievalConfig,
    /// Generation sidecar settings
    pub generation: GenerationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Number of HTTP worker threads
    pub workers: usize,
}

/// Dataset construction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory containing the statute .txt files
    pub input_dir: PathBuf,
    /// Output path for the lossless dataset
    pub dataset_path: PathBuf,
    /// Output path for the cleaned dataset
    pub clean_dataset_path: PathBuf,
    /// Sliding-window chunk size in characters (lossless pass)
    pub chunk_size: usize,
    /// Sliding-window overlap in characters (lossless pass)
    pub overlap: usize,
    /// Minimum estimated tokens per chunk (cleanup pass)
    pub min_tokens: usize,
    /// Maximum estimated tokens per chunk (cleanup pass)
    pub max_tokens: usize,
}

/// Retrieval index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Dataset file the index is built from
    pub dataset_path: PathBuf,
    /// Compressed embedding-array artifact path
    pub index_path: PathBuf,
    /// Metadata artifact path, positionally aligned with the index
    pub metadata_path: PathBuf,
    /// Embedding encoder configuration
    pub encoder: EncoderConfig,
    /// Default number of results when the caller does not specify top_k
    pub default_top_k: usize,
}

/// Embedding encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder identifier; "hashing" selects the deterministic local
    /// encoder, anything else is sent to the embedding sidecar
    pub id: String,
    /// Embedding sidecar endpoint
    pub endpoint: String,
    /// Request the quantized/low-precision encoder variant
    pub quantized: bool,
    /// Compute-device placement hint forwarded to the sidecar
    pub device: String,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Embedding dimension (must match the encoder output)
    pub dimension: usize,
}

/// Generation sidecar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Generation sidecar endpoint
    pub endpoint: String,
    /// Generation model identifier
    pub model: String,
    /// Default output-length budget in tokens
    pub default_max_new_tokens: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| SearchError::Config {
                message: format!("Failed to read config file {:?}: {}", path, e),
            })?;
            toml::from_str(&content).map_err(|e| SearchError::Config {
                message: format!("Failed to parse config file {:?}: {}", path, e),
            })?
        } else {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("STATUTE_SEARCH_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("STATUTE_SEARCH_PORT") {
            self.server.port = port.parse().map_err(|_| SearchError::Config {
                message: "Invalid port number in STATUTE_SEARCH_PORT".to_string(),
            })?;
        }
        if let Ok(dataset_path) = std::env::var("STATUTE_SEARCH_DATASET_PATH") {
            self.retrieval.dataset_path = PathBuf::from(dataset_path);
        }
        if let Ok(index_path) = std::env::var("STATUTE_SEARCH_INDEX_PATH") {
            self.retrieval.index_path = PathBuf::from(index_path);
        }
        if let Ok(metadata_path) = std::env::var("STATUTE_SEARCH_METADATA_PATH") {
            self.retrieval.metadata_path = PathBuf::from(metadata_path);
        }
        if let Ok(encoder_id) = std::env::var("STATUTE_SEARCH_EMBEDDING_MODEL") {
            self.retrieval.encoder.id = encoder_id;
        }
        if let Ok(endpoint) = std::env::var("STATUTE_SEARCH_ENCODER_ENDPOINT") {
            self.retrieval.encoder.endpoint = endpoint;
        }
        if let Ok(endpoint) = std::env::var("STATUTE_SEARCH_GENERATION_ENDPOINT") {
            self.generation.endpoint = endpoint;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SearchError::Config {
                message: "server.port cannot be zero".to_string(),
            });
        }

        if self.dataset.chunk_size == 0 {
            return Err(SearchError::Config {
                message: "dataset.chunk_size must be greater than zero".to_string(),
            });
        }

        if self.dataset.overlap >= self.dataset.chunk_size {
            return Err(SearchError::Config {
                message: "dataset.overlap must be smaller than dataset.chunk_size".to_string(),
            });
        }

        if self.dataset.min_tokens > self.dataset.max_tokens {
            return Err(SearchError::Config {
                message: "dataset.min_tokens cannot exceed dataset.max_tokens".to_string(),
            });
        }

        if self.retrieval.encoder.dimension == 0 {
            return Err(SearchError::Config {
                message: "retrieval.encoder.dimension must be greater than zero".to_string(),
            });
        }

        if self.retrieval.encoder.batch_size == 0 {
            return Err(SearchError::Config {
                message: "retrieval.encoder.batch_size must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            dataset: DatasetConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            enable_cors: true,
            workers: num_cpus::get(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./data/statutes"),
            dataset_path: PathBuf::from("./data/statute_rag_dataset.json"),
            clean_dataset_path: PathBuf::from("./data/statute_rag_dataset_clean.json"),
            chunk_size: 1200,
            overlap: 200,
            min_tokens: 300,
            max_tokens: 500,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("./data/statute_rag_dataset_clean.json"),
            index_path: PathBuf::from("./data/rag_index.bin.gz"),
            metadata_path: PathBuf::from("./data/rag_metadata.json"),
            encoder: EncoderConfig::default(),
            default_top_k: 5,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            id: "intfloat/multilingual-e5-small".to_string(),
            endpoint: "http://127.0.0.1:8090/embed".to_string(),
            quantized: false,
            device: "auto".to_string(),
            batch_size: 32,
            dimension: 384,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8091/generate".to_string(),
            model: "Qwen/Qwen2.5-3B-Instruct".to_string(),
            default_max_new_tokens: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_pass_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[dataset]\nchunk_size = 800\noverlap = 100\n\n[retrieval.encoder]\nid = \"hashing\"\ndimension = 64\n"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.dataset.chunk_size, 800);
        assert_eq!(config.dataset.overlap, 100);
        assert_eq!(config.retrieval.encoder.id, "hashing");
        assert_eq!(config.retrieval.encoder.dimension, 64);
        // Untouched sections keep their defaults
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.dataset.max_tokens, 500);
    }

    #[test]
    fn invalid_overlap_is_rejected() {
        let mut config = Config::default();
        config.dataset.overlap = config.dataset.chunk_size;
        assert!(config.validate().is_err());
    }
}
