//! # Index Artifacts Module
//!
//! ## Purpose
//! Persistence of the retrieval index as two files that are only meaningful
//! together: a compressed numeric-array container holding the `embeddings`
//! matrix, and a metadata JSON array positionally aligned with it.
//!
//! ## Input/Output Specification
//! - **Input**: Embedding matrix `(n_chunks, dim)` f32 + minimal chunk records
//! - **Output**: Gzip-compressed bincode container; pretty UTF-8 JSON metadata
//! - **Invariant**: Position `i` in both artifacts refers to the same chunk;
//!   this alignment is the sole linkage
//!
//! ## Key Features
//! - Atomic replace-on-success writes via temp files in the target directory
//! - Shape validation on read: a container whose data length disagrees with
//!   `rows * dim` is rejected
//! - Reading either artifact without the other is treated as "no index" by
//!   the retrieval service

use crate::dataset::ChunkRecord;
use crate::errors::{Result, SearchError};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// Name of the single array stored in the embedding container
pub const EMBEDDINGS_ARRAY_NAME: &str = "embeddings";

/// Compressed container holding one named embedding matrix, row-major f32
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingArtifact {
    pub array_name: String,
    pub rows: usize,
    pub dim: usize,
    pub encoder_id: String,
    pub created_at: DateTime<Utc>,
    pub data: Vec<f32>,
}

impl EmbeddingArtifact {
    pub fn new(rows: usize, dim: usize, encoder_id: String, data: Vec<f32>) -> Self {
        Self {
            array_name: EMBEDDINGS_ARRAY_NAME.to_string(),
            rows,
            dim,
            encoder_id,
            created_at: Utc::now(),
            data,
        }
    }

    /// Row `i` of the matrix
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }
}

/// Minimal chunk metadata stored alongside the embedding matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk_id: String,
    pub law_name: String,
    pub domain: String,
    pub jurisdiction: String,
    pub section_id: String,
    pub section_title: Option<String>,
    pub text: String,
}

impl From<&ChunkRecord> for IndexedChunk {
    fn from(record: &ChunkRecord) -> Self {
        Self {
            chunk_id: record.chunk_id.clone(),
            law_name: record.law_name.clone(),
            domain: record.domain.clone(),
            jurisdiction: record.jurisdiction.clone(),
            section_id: record.section_id.clone(),
            section_title: record.section_title.clone(),
            text: record.text.clone(),
        }
    }
}

/// Write the embedding container, replacing any previous file only on success
pub fn write_embeddings<P: AsRef<Path>>(path: P, artifact: &EmbeddingArtifact) -> Result<()> {
    let bytes = bincode::serialize(artifact)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&bytes)?;
    let compressed = encoder.finish()?;
    atomic_write(path.as_ref(), &compressed)
}

/// Read and shape-validate the embedding container
pub fn read_embeddings<P: AsRef<Path>>(path: P) -> Result<EmbeddingArtifact> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SearchError::NotFound {
            what: "Embedding artifact".to_string(),
            path: path.display().to_string(),
        });
    }

    let file = std::fs::File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;
    let artifact: EmbeddingArtifact = bincode::deserialize(&bytes)?;

    if artifact.data.len() != artifact.rows * artifact.dim {
        return Err(SearchError::Internal {
            message: format!(
                "embedding artifact shape mismatch: {} values for {}x{}",
                artifact.data.len(),
                artifact.rows,
                artifact.dim
            ),
        });
    }
    Ok(artifact)
}

/// Write the metadata artifact, replacing any previous file only on success
pub fn write_metadata<P: AsRef<Path>>(path: P, metadata: &[IndexedChunk]) -> Result<()> {
    let json = serde_json::to_string_pretty(metadata)?;
    atomic_write(path.as_ref(), json.as_bytes())
}

/// Read the metadata artifact
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<Vec<IndexedChunk>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SearchError::NotFound {
            what: "Metadata artifact".to_string(),
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| SearchError::Io(e.error))?;
    Ok(())
}
