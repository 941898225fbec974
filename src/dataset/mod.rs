//! # Dataset Module
//!
//! ## Purpose
//! Typed chunk records, the closed statute allow-list and the dataset file
//! format shared by the builder and the retrieval index.
//!
//! ## Input/Output Specification
//! - **Input**: Statute filenames, pipeline products
//! - **Output**: `ChunkRecord` sequences persisted as pretty UTF-8 JSON
//! - **Identity**: `chunk_id = "{doc_id}::sec-{section_id}::chunk-{chunk_index}"`
//!
//! ## Architecture
//! - `ChunkRecord`: one embedded/retrieved unit with full statute metadata
//! - `StatuteRegistry`: filename-pattern allow-list resolving law name and
//!   legal domain; an unmatched document aborts the whole build
//! - `builder`: the orchestration pass producing and cleaning datasets

pub mod builder;

use crate::errors::{Result, SearchError};
use crate::normalize::Language;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use builder::{BuildReport, DatasetBuilder};

/// Jurisdiction tag applied to every record of the corpus
pub const JURISDICTION: &str = "Pakistan";

/// Source tag applied to every record of the corpus
pub const SOURCE: &str = "Statute";

/// One bounded-size slice of a section's text, the unit embedded and retrieved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Document identifier, the statute file stem
    pub doc_id: String,
    /// Canonical statute name from the allow-list
    pub law_name: String,
    /// Legal domain from the allow-list
    pub domain: String,
    pub jurisdiction: String,
    pub source: String,
    /// Detected document language
    pub language: Language,
    /// Statute section number the chunk came from
    pub section_id: String,
    /// Cleaned section heading; absent when no trustworthy title survived
    pub section_title: Option<String>,
    /// Deterministic identifier, unique within one dataset
    pub chunk_id: String,
    /// Zero-based position within the `(doc_id, section_id)` pair
    pub chunk_index: usize,
    /// Char span in the normalized section text (lossless pass only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_char_start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_char_end: Option<usize>,
    pub text: String,
}

/// Derive the deterministic chunk identifier
pub fn chunk_id(doc_id: &str, section_id: &str, chunk_index: usize) -> String {
    format!("{}::sec-{}::chunk-{}", doc_id, section_id, chunk_index)
}

/// Statute metadata resolved from the allow-list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatuteMeta {
    pub law_name: &'static str,
    pub domain: &'static str,
}

/// Closed allow-list of statutes, keyed by lowercase filename substring
pub struct StatuteRegistry {
    entries: Vec<(&'static str, StatuteMeta)>,
}

impl Default for StatuteRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StatuteRegistry {
    /// The four statutes of the corpus
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                (
                    "contract act, 1872",
                    StatuteMeta {
                        law_name: "Contract Act, 1872",
                        domain: "Contract Law",
                    },
                ),
                (
                    "companies act, 2017",
                    StatuteMeta {
                        law_name: "Companies Act, 2017",
                        domain: "Business / Corporate Law",
                    },
                ),
                (
                    "income tax ordinance, 2001",
                    StatuteMeta {
                        law_name: "Income Tax Ordinance, 2001",
                        domain: "Tax Law",
                    },
                ),
                (
                    "industrial relations act, 2012",
                    StatuteMeta {
                        law_name: "Industrial Relations Act, 2012",
                        domain: "Employment / Labour Law",
                    },
                ),
            ],
        }
    }

    /// Resolve a document's statute metadata from its file stem.
    ///
    /// Matching is a case-insensitive substring test against the allow-list
    /// keys. A stem matching no key is a validation failure that aborts the
    /// whole build.
    pub fn resolve(&self, file_stem: &str) -> Result<&StatuteMeta> {
        let lowered = file_stem.to_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| lowered.contains(key))
            .map(|(_, meta)| meta)
            .ok_or_else(|| SearchError::UnmatchedDocument {
                file: file_stem.to_string(),
                allowed: self.allowed_keys(),
            })
    }

    fn allowed_keys(&self) -> String {
        self.entries
            .iter()
            .map(|(key, _)| *key)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Load a dataset file, surfacing a missing file as a not-found condition
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<ChunkRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SearchError::NotFound {
            what: "Dataset".to_string(),
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a dataset file as pretty UTF-8 JSON, creating parent directories
pub fn write_records<P: AsRef<Path>>(path: P, records: &[ChunkRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_statutes_by_filename_substring() {
        let registry = StatuteRegistry::builtin();
        let meta = registry.resolve("Contract Act, 1872").unwrap();
        assert_eq!(meta.law_name, "Contract Act, 1872");
        assert_eq!(meta.domain, "Contract Law");

        let meta = registry.resolve("income tax ordinance, 2001 (amended)").unwrap();
        assert_eq!(meta.domain, "Tax Law");
    }

    #[test]
    fn unmatched_filenames_are_rejected() {
        let registry = StatuteRegistry::builtin();
        let err = registry.resolve("penal code, 1860").unwrap_err();
        assert!(matches!(err, SearchError::UnmatchedDocument { .. }));
        assert!(err.to_string().contains("contract act, 1872"));
    }

    #[test]
    fn chunk_id_is_deterministic() {
        assert_eq!(
            chunk_id("Contract Act, 1872", "10", 0),
            "Contract Act, 1872::sec-10::chunk-0"
        );
    }

    #[test]
    fn records_round_trip_through_json() {
        let record = ChunkRecord {
            doc_id: "Contract Act, 1872".to_string(),
            law_name: "Contract Act, 1872".to_string(),
            domain: "Contract Law".to_string(),
            jurisdiction: JURISDICTION.to_string(),
            source: SOURCE.to_string(),
            language: Language::En,
            section_id: "10".to_string(),
            section_title: Some("What agreements are contracts".to_string()),
            chunk_id: chunk_id("Contract Act, 1872", "10", 0),
            chunk_index: 0,
            chunk_char_start: Some(0),
            chunk_char_end: Some(42),
            text: "All agreements are contracts".to_string(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        write_records(&path, std::slice::from_ref(&record)).unwrap();
        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded, vec![record]);
    }

    #[test]
    fn missing_dataset_is_not_found() {
        let err = load_records("/nonexistent/dataset.json").unwrap_err();
        assert!(matches!(err, SearchError::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }
}
