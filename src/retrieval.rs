//! # Retrieval Service Module
//!
//! ## Purpose
//! The vector index over dataset chunks: encodes chunk texts into normalized
//! embeddings, persists them aligned with metadata, and serves top-k
//! cosine-similarity search over query vectors.
//!
//! ## Input/Output Specification
//! - **Input**: Dataset records, free-text queries
//! - **Output**: Build summaries; ranked `ScoredChunk` sequences
//! - **Lifecycle**: `EMPTY -> BUILT`; rebuild replaces the state wholesale
//!
//! ## Key Features
//! - Explicit service object constructed once by the owning process and
//!   threaded through shared state, with any existing artifact pair loaded at
//!   construction
//! - Batched encoding preserving record order, with the encoder-specific
//!   passage/query formatting convention applied on both sides
//! - The embeddings/metadata pair is built fully off to the side and swapped
//!   under one write lock, so a concurrent reader sees either the fully-old
//!   or fully-new pair, never a mix
//! - Similarity is the plain dot product, valid as cosine similarity because
//!   both sides are unit-normalized; ties break by ascending original index

use crate::artifacts::{self, EmbeddingArtifact, IndexedChunk};
use crate::config::RetrievalConfig;
use crate::dataset;
use crate::encoder::{format_passage, format_query, TextEncoder};
use crate::errors::{Result, SearchError};
use crate::utils::{TextUtils, Timer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory index pair; embeddings are row-major `rows x dim`
struct IndexState {
    embeddings: Vec<f32>,
    rows: usize,
    dim: usize,
    metadata: Vec<IndexedChunk>,
}

/// Result of a successful index build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSummary {
    pub indexed_chunks: usize,
    pub embedding_model: String,
    pub index_path: String,
    pub built_at: DateTime<Utc>,
}

/// Stored chunk metadata plus its similarity to the query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub record: IndexedChunk,
    pub score: f32,
}

/// Vector index service with an explicit `EMPTY -> BUILT` lifecycle
pub struct RetrievalService {
    config: RetrievalConfig,
    encoder: Arc<dyn TextEncoder>,
    state: RwLock<Option<Arc<IndexState>>>,
}

impl RetrievalService {
    /// Construct the service, loading the persisted artifact pair when both
    /// files exist and agree. A partially present or inconsistent pair is
    /// treated as "no index" and requires a full rebuild.
    pub fn initialize(config: RetrievalConfig, encoder: Arc<dyn TextEncoder>) -> Self {
        let state = Self::load_existing(&config).map(Arc::new);
        Self {
            config,
            encoder,
            state: RwLock::new(state),
        }
    }

    fn load_existing(config: &RetrievalConfig) -> Option<IndexState> {
        if !config.index_path.exists() || !config.metadata_path.exists() {
            return None;
        }

        let artifact = match artifacts::read_embeddings(&config.index_path) {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable embedding artifact");
                return None;
            }
        };
        let metadata = match artifacts::read_metadata(&config.metadata_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable metadata artifact");
                return None;
            }
        };
        if artifact.rows != metadata.len() {
            tracing::warn!(
                embedding_rows = artifact.rows,
                metadata_rows = metadata.len(),
                "artifact pair is misaligned, ignoring persisted index"
            );
            return None;
        }

        tracing::info!(
            indexed_chunks = artifact.rows,
            encoder = %artifact.encoder_id,
            "loaded retrieval index from disk"
        );
        Some(IndexState {
            rows: artifact.rows,
            dim: artifact.dim,
            embeddings: artifact.data,
            metadata,
        })
    }

    /// Whether a successful build (or load) has happened
    pub async fn is_built(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Number of chunks in the current index, zero when not built
    pub async fn indexed_chunks(&self) -> usize {
        self.state
            .read()
            .await
            .as_ref()
            .map(|state| state.rows)
            .unwrap_or(0)
    }

    /// Encode every dataset chunk, persist the artifact pair and swap the
    /// in-memory state.
    ///
    /// Fails with a not-found error when the dataset file is missing. The new
    /// arrays are built completely before anything is published: both
    /// artifacts are written (each atomically) and only then does the shared
    /// state reference move to the new pair.
    pub async fn build_index(&self) -> Result<BuildSummary> {
        let timer = Timer::new("build_index");
        let records = dataset::load_records(&self.config.dataset_path)?;
        tracing::info!(records = records.len(), "building retrieval index");

        let passages: Vec<String> = records
            .iter()
            .map(|r| format_passage(self.encoder.id(), &r.text))
            .collect();

        let mut embeddings: Vec<f32> = Vec::new();
        let mut rows = 0usize;
        let mut dim = 0usize;
        for batch in passages.chunks(self.config.encoder.batch_size.max(1)) {
            let vectors = self.encoder.encode(batch).await?;
            if vectors.len() != batch.len() {
                return Err(SearchError::Encoder {
                    encoder: self.encoder.id().to_string(),
                    details: format!(
                        "batch of {} texts produced {} vectors",
                        batch.len(),
                        vectors.len()
                    ),
                });
            }
            for vector in vectors {
                if dim == 0 {
                    dim = vector.len();
                }
                if vector.is_empty() || vector.len() != dim {
                    return Err(SearchError::Encoder {
                        encoder: self.encoder.id().to_string(),
                        details: "inconsistent embedding dimensions across batches".to_string(),
                    });
                }
                embeddings.extend_from_slice(&vector);
                rows += 1;
            }
        }

        let metadata: Vec<IndexedChunk> = records.iter().map(IndexedChunk::from).collect();

        let artifact = EmbeddingArtifact::new(
            rows,
            dim,
            self.encoder.id().to_string(),
            embeddings.clone(),
        );
        artifacts::write_embeddings(&self.config.index_path, &artifact)?;
        artifacts::write_metadata(&self.config.metadata_path, &metadata)?;

        let new_state = Arc::new(IndexState {
            embeddings,
            rows,
            dim,
            metadata,
        });
        *self.state.write().await = Some(new_state);

        let summary = BuildSummary {
            indexed_chunks: rows,
            embedding_model: self.encoder.id().to_string(),
            index_path: self.config.index_path.display().to_string(),
            built_at: Utc::now(),
        };
        tracing::info!(
            indexed_chunks = summary.indexed_chunks,
            encoder = %summary.embedding_model,
            elapsed_ms = timer.elapsed_ms(),
            "index build completed"
        );
        Ok(summary)
    }

    /// Top-k cosine-similarity search over the built index.
    ///
    /// Fails with an invalid-state error when the index is not built. `top_k`
    /// is clamped to at least 1 and at most the number of indexed chunks;
    /// results come back sorted by descending score, ties broken by ascending
    /// original index.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        let state = self
            .state
            .read()
            .await
            .clone()
            .ok_or(SearchError::IndexNotBuilt)?;
        if state.rows == 0 {
            return Ok(Vec::new());
        }

        let timer = Timer::new("search");
        let query_text = format_query(self.encoder.id(), query);
        let query_vector = self
            .encoder
            .encode(std::slice::from_ref(&query_text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Encoder {
                encoder: self.encoder.id().to_string(),
                details: "no vector returned for query".to_string(),
            })?;
        if query_vector.len() != state.dim {
            return Err(SearchError::Encoder {
                encoder: self.encoder.id().to_string(),
                details: format!(
                    "query dimension {} does not match index dimension {}",
                    query_vector.len(),
                    state.dim
                ),
            });
        }

        let mut scored: Vec<(usize, f32)> = (0..state.rows)
            .map(|i| {
                let row = &state.embeddings[i * state.dim..(i + 1) * state.dim];
                let score: f32 = row.iter().zip(&query_vector).map(|(a, b)| a * b).sum();
                (i, score)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let k = top_k.max(1).min(scored.len());
        let results: Vec<ScoredChunk> = scored[..k]
            .iter()
            .map(|(idx, score)| ScoredChunk {
                record: state.metadata[*idx].clone(),
                score: *score,
            })
            .collect();

        tracing::debug!(
            query = %TextUtils::truncate(query, 80),
            top_k = k,
            elapsed_ms = timer.elapsed_ms(),
            "search completed"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderConfig;
    use crate::dataset::{chunk_id, write_records, ChunkRecord};
    use crate::encoder::HashingEncoder;
    use crate::normalize::Language;
    use std::path::Path;

    fn record(index: usize, text: &str) -> ChunkRecord {
        ChunkRecord {
            doc_id: "Contract Act, 1872".to_string(),
            law_name: "Contract Act, 1872".to_string(),
            domain: "Contract Law".to_string(),
            jurisdiction: "Pakistan".to_string(),
            source: "Statute".to_string(),
            language: Language::En,
            section_id: format!("{}", index + 1),
            section_title: Some(format!("Section heading {}", index + 1)),
            chunk_id: chunk_id("Contract Act, 1872", &format!("{}", index + 1), 0),
            chunk_index: 0,
            chunk_char_start: None,
            chunk_char_end: None,
            text: text.to_string(),
        }
    }

    fn service_config(dir: &Path) -> RetrievalConfig {
        RetrievalConfig {
            dataset_path: dir.join("dataset.json"),
            index_path: dir.join("rag_index.bin.gz"),
            metadata_path: dir.join("rag_metadata.json"),
            encoder: EncoderConfig {
                id: "hashing".to_string(),
                endpoint: String::new(),
                quantized: false,
                device: "cpu".to_string(),
                batch_size: 4,
                dimension: 32,
            },
            default_top_k: 5,
        }
    }

    fn service(dir: &Path) -> RetrievalService {
        let config = service_config(dir);
        RetrievalService::initialize(config, Arc::new(HashingEncoder::new(32)))
    }

    fn sample_records() -> Vec<ChunkRecord> {
        let texts = [
            "consideration for a promise must be lawful",
            "free consent of parties competent to contract",
            "agreements without consideration are void",
            "a proposal may be revoked before acceptance",
            "every person of the age of majority may contract",
            "compensation for loss caused by breach of contract",
            "contingent contracts depend on collateral events",
            "an agreement in restraint of trade is void",
            "reciprocal promises must be performed in order",
            "time is of the essence when the parties intend it",
        ];
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| record(i, text))
            .collect()
    }

    #[tokio::test]
    async fn search_before_build_is_invalid_state() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        assert!(!service.is_built().await);
        let err = service.search("consideration", 3).await.unwrap_err();
        assert!(matches!(err, SearchError::IndexNotBuilt));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn build_without_dataset_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let err = service.build_index().await.unwrap_err();
        assert!(matches!(err, SearchError::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn build_then_search_returns_ranked_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_config(dir.path());
        write_records(&config.dataset_path, &sample_records()).unwrap();

        let service = service(dir.path());
        let summary = service.build_index().await.unwrap();
        assert_eq!(summary.indexed_chunks, 10);
        assert_eq!(summary.embedding_model, "hashing");
        assert!(service.is_built().await);

        let results = service.search("consideration", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn artifacts_stay_positionally_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_config(dir.path());
        let records = sample_records();
        write_records(&config.dataset_path, &records).unwrap();

        let service = service(dir.path());
        service.build_index().await.unwrap();

        let artifact = artifacts::read_embeddings(&config.index_path).unwrap();
        let metadata = artifacts::read_metadata(&config.metadata_path).unwrap();
        assert_eq!(artifact.rows, metadata.len());
        assert_eq!(artifact.data.len(), artifact.rows * artifact.dim);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(metadata[i].chunk_id, record.chunk_id);
        }
    }

    #[tokio::test]
    async fn oversized_top_k_returns_all_chunks_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_config(dir.path());
        write_records(&config.dataset_path, &sample_records()).unwrap();

        let service = service(dir.path());
        service.build_index().await.unwrap();

        let results = service.search("contract", 100).await.unwrap();
        assert_eq!(results.len(), 10);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn zero_top_k_clamps_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_config(dir.path());
        write_records(&config.dataset_path, &sample_records()).unwrap();

        let service = service(dir.path());
        service.build_index().await.unwrap();

        let results = service.search("contract", 0).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn equal_scores_keep_ascending_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_config(dir.path());
        let records: Vec<ChunkRecord> = (0..5)
            .map(|i| record(i, "identical chunk text for every record"))
            .collect();
        write_records(&config.dataset_path, &records).unwrap();

        let service = service(dir.path());
        service.build_index().await.unwrap();

        let results = service.search("identical", 5).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.record.chunk_id.as_str()).collect();
        let expected: Vec<&str> = records.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn persisted_pair_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_config(dir.path());
        write_records(&config.dataset_path, &sample_records()).unwrap();

        service(dir.path()).build_index().await.unwrap();

        let restarted = service(dir.path());
        assert!(restarted.is_built().await);
        assert_eq!(restarted.indexed_chunks().await, 10);
        let results = restarted.search("consideration", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn partial_artifact_pair_is_no_index() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_config(dir.path());
        write_records(&config.dataset_path, &sample_records()).unwrap();

        service(dir.path()).build_index().await.unwrap();
        std::fs::remove_file(&config.metadata_path).unwrap();

        let restarted = service(dir.path());
        assert!(!restarted.is_built().await);
        let err = restarted.search("consideration", 2).await.unwrap_err();
        assert!(matches!(err, SearchError::IndexNotBuilt));
    }

    #[tokio::test]
    async fn rebuild_replaces_the_whole_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_config(dir.path());
        write_records(&config.dataset_path, &sample_records()).unwrap();

        let service = service(dir.path());
        service.build_index().await.unwrap();
        assert_eq!(service.indexed_chunks().await, 10);

        let smaller: Vec<ChunkRecord> = sample_records().into_iter().take(3).collect();
        write_records(&config.dataset_path, &smaller).unwrap();
        let summary = service.build_index().await.unwrap();
        assert_eq!(summary.indexed_chunks, 3);
        assert_eq!(service.indexed_chunks().await, 3);

        let results = service.search("contract", 100).await.unwrap();
        assert_eq!(results.len(), 3);
    }
}
