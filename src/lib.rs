//! # Statute Semantic Search Engine
//!
//! ## Overview
//! This library turns raw statute text into a queryable semantic index. It
//! normalizes noisy OCR/plaintext legal documents, segments them into
//! legally meaningful sections, filters out non-substantive content, splits
//! sections into bounded-size chunks and builds/searches a vector index over
//! those chunks.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `normalize`: Text cleanup and language detection
//! - `segment`: Heading detection and section boundary extraction
//! - `noise`: Table-of-contents and non-substantive content classification
//! - `chunk`: Sliding-window and token-budget chunking strategies
//! - `dataset`: Typed chunk records, statute allow-list, dataset builder
//! - `encoder`: Contract to the external embedding capability
//! - `artifacts`: Persisted embedding/metadata artifact pair
//! - `retrieval`: Vector index build and top-k cosine search
//! - `generation`: Grounded prompt construction and generation contract
//! - `api`: REST API endpoints
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Statute documents (plain text), search queries (text)
//! - **Output**: Ranked chunk records with statutory source metadata
//! - **Guarantees**: Deterministic pipeline, byte-identical re-runs,
//!   atomically replaced index artifacts
//!
//! ## Usage
//! ```rust,no_run
//! use statute_semantic_search::config::Config;
//! use statute_semantic_search::encoder;
//! use statute_semantic_search::retrieval::RetrievalService;
//! use std::sync::Arc;
//!
//! # async fn run() -> statute_semantic_search::errors::Result<()> {
//! let config = Config::from_file("config.toml")?;
//! let encoder = encoder::from_config(&config.retrieval.encoder);
//! let retrieval = RetrievalService::initialize(config.retrieval.clone(), encoder);
//! let summary = retrieval.build_index().await?;
//! println!("Indexed {} chunks", summary.indexed_chunks);
//! let hits = retrieval.search("consideration", 5).await?;
//! println!("Found {} chunks", hits.len());
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod artifacts;
pub mod chunk;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod errors;
pub mod generation;
pub mod noise;
pub mod normalize;
pub mod retrieval;
pub mod segment;

// Surfaces
pub mod api;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{Result, SearchError};
pub use retrieval::{BuildSummary, RetrievalService, ScoredChunk};
pub use segment::Section;

use generation::GenerationClient;
use std::sync::Arc;

/// Application state shared across components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub retrieval: Arc<retrieval::RetrievalService>,
    pub generator: Arc<dyn GenerationClient>,
}
