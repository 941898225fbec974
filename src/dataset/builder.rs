//! # Dataset Builder
//!
//! ## Purpose
//! Orchestrates the pipeline across a document collection: statute metadata
//! resolution, normalization, language detection, segmentation, noise
//! filtering and chunking, emitting the flat ordered dataset.
//!
//! ## Input/Output Specification
//! - **Input**: Directory of statute `.txt` files; dataset configuration
//! - **Output**: Lossless and cleaned dataset files (pretty UTF-8 JSON)
//! - **Workflow**: Resolve → Normalize → Segment → Filter → Chunk → Emit
//!
//! ## Key Features
//! - Stable, reproducible ordering: sorted filenames, then section appearance
//!   order, then chunk emission order; re-running against unchanged input
//!   yields byte-identical output
//! - All-or-nothing ingestion: one unmatched document aborts the run before
//!   anything is written
//! - Lossless pass keeps every document (implicit section fallback); the
//!   cleanup pass is allowed to drop documents entirely

use crate::chunk::{pack_by_tokens, sliding_window};
use crate::config::DatasetConfig;
use crate::dataset::{chunk_id, load_records, write_records, ChunkRecord, StatuteRegistry};
use crate::errors::{Result, SearchError};
use crate::noise::{clean_section_title, is_non_substantive, remove_toc_blocks};
use crate::normalize::{detect_language, normalize};
use crate::segment::SectionSegmenter;
use crate::utils::Timer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Summary of one dataset pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Documents that contributed records
    pub documents: usize,
    /// Sections that survived into the output
    pub sections: usize,
    /// Chunk records emitted
    pub chunks: usize,
    /// Where the dataset was written
    pub output_path: PathBuf,
}

/// Dataset construction pipeline
pub struct DatasetBuilder {
    config: DatasetConfig,
    registry: StatuteRegistry,
    segmenter: SectionSegmenter,
}

impl DatasetBuilder {
    pub fn new(config: DatasetConfig) -> Self {
        Self {
            config,
            registry: StatuteRegistry::builtin(),
            segmenter: SectionSegmenter::new(),
        }
    }

    /// Run the lossless pass: every document in the input directory becomes
    /// sliding-window chunk records, written to `dataset_path`.
    pub fn build(&self) -> Result<BuildReport> {
        let timer = Timer::new("build_dataset");
        let records = self.build_records()?;

        let report = self.report(&records, self.config.dataset_path.clone());
        write_records(&self.config.dataset_path, &records)?;

        tracing::info!(
            documents = report.documents,
            sections = report.sections,
            chunks = report.chunks,
            elapsed_ms = timer.elapsed_ms(),
            "dataset build completed"
        );
        Ok(report)
    }

    /// Run the cleanup pass over an existing dataset: regroup per document,
    /// strip embedded tables of contents, re-segment strictly, drop
    /// non-substantive sections and re-chunk by token budget, written to
    /// `clean_dataset_path`.
    pub fn clean(&self) -> Result<BuildReport> {
        let timer = Timer::new("clean_dataset");
        let records = load_records(&self.config.dataset_path)?;
        let cleaned = self.clean_records(&records);

        let report = self.report(&cleaned, self.config.clean_dataset_path.clone());
        write_records(&self.config.clean_dataset_path, &cleaned)?;

        tracing::info!(
            documents = report.documents,
            sections = report.sections,
            chunks = report.chunks,
            elapsed_ms = timer.elapsed_ms(),
            "dataset cleanup completed"
        );
        Ok(report)
    }

    /// Produce the lossless records without writing anything.
    pub fn build_records(&self) -> Result<Vec<ChunkRecord>> {
        let files = self.list_statute_files()?;
        let mut records = Vec::new();

        for path in &files {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let meta = self.registry.resolve(&stem)?;

            let raw = std::fs::read(path)?;
            let normalized = normalize(&String::from_utf8_lossy(&raw));
            let language = detect_language(&normalized);
            let sections = self.segmenter.extract_sections_lossless(&normalized);

            tracing::debug!(
                doc_id = %stem,
                sections = sections.len(),
                language = language.as_str(),
                "segmented document"
            );

            // Chunk numbering continues across sections that share a
            // section_id, keeping chunk_id unique when a stray heading
            // duplicates a real one.
            let mut counters: HashMap<String, usize> = HashMap::new();
            for section in &sections {
                for span in sliding_window(
                    &section.text,
                    self.config.chunk_size,
                    self.config.overlap,
                )? {
                    let counter = counters.entry(section.section_id.clone()).or_insert(0);
                    let idx = *counter;
                    *counter += 1;
                    records.push(ChunkRecord {
                        doc_id: stem.clone(),
                        law_name: meta.law_name.to_string(),
                        domain: meta.domain.to_string(),
                        jurisdiction: super::JURISDICTION.to_string(),
                        source: super::SOURCE.to_string(),
                        language,
                        section_id: section.section_id.clone(),
                        section_title: Some(section.title.clone()),
                        chunk_id: chunk_id(&stem, &section.section_id, idx),
                        chunk_index: idx,
                        chunk_char_start: Some(span.start),
                        chunk_char_end: Some(span.end),
                        text: span.text,
                    });
                }
            }
        }

        Ok(records)
    }

    /// Produce cleaned records from lossless ones without writing anything.
    pub fn clean_records(&self, records: &[ChunkRecord]) -> Vec<ChunkRecord> {
        let mut doc_order: Vec<&str> = Vec::new();
        let mut grouped: HashMap<&str, Vec<&ChunkRecord>> = HashMap::new();
        for record in records {
            if !grouped.contains_key(record.doc_id.as_str()) {
                doc_order.push(&record.doc_id);
            }
            grouped.entry(&record.doc_id).or_default().push(record);
        }

        let mut cleaned = Vec::new();
        for doc_id in doc_order {
            let doc_records = &grouped[doc_id];
            let sample = doc_records[0];

            let rebuilt = doc_records
                .iter()
                .map(|r| r.text.as_str())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n");
            let normalized = remove_toc_blocks(&normalize(&rebuilt));
            let sections = self.segmenter.extract_sections(&normalized);

            let mut kept = 0usize;
            let mut counters: HashMap<String, usize> = HashMap::new();
            for section in &sections {
                if is_non_substantive(section) {
                    continue;
                }
                kept += 1;
                let section_title = clean_section_title(&section.title);
                let chunks = pack_by_tokens(
                    &section.text,
                    self.config.min_tokens,
                    self.config.max_tokens,
                );
                for text in chunks {
                    let counter = counters.entry(section.section_id.clone()).or_insert(0);
                    let idx = *counter;
                    *counter += 1;
                    cleaned.push(ChunkRecord {
                        doc_id: sample.doc_id.clone(),
                        law_name: sample.law_name.clone(),
                        domain: sample.domain.clone(),
                        jurisdiction: sample.jurisdiction.clone(),
                        source: sample.source.clone(),
                        language: sample.language,
                        section_id: section.section_id.clone(),
                        section_title: section_title.clone(),
                        chunk_id: chunk_id(&sample.doc_id, &section.section_id, idx),
                        chunk_index: idx,
                        chunk_char_start: None,
                        chunk_char_end: None,
                        text,
                    });
                }
            }

            tracing::debug!(
                doc_id = %sample.doc_id,
                sections_detected = sections.len(),
                sections_kept = kept,
                "cleaned document"
            );
        }

        cleaned
    }

    fn list_statute_files(&self) -> Result<Vec<PathBuf>> {
        let dir: &Path = &self.config.input_dir;
        if !dir.is_dir() {
            return Err(SearchError::NotFound {
                what: "Input directory".to_string(),
                path: dir.display().to_string(),
            });
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("txt"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(SearchError::NotFound {
                what: "Statute text files".to_string(),
                path: dir.display().to_string(),
            });
        }
        Ok(files)
    }

    fn report(&self, records: &[ChunkRecord], output_path: PathBuf) -> BuildReport {
        let mut documents: Vec<&str> = records.iter().map(|r| r.doc_id.as_str()).collect();
        documents.dedup();
        let mut sections: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.doc_id.as_str(), r.section_id.as_str()))
            .collect();
        sections.dedup();

        BuildReport {
            documents: documents.len(),
            sections: sections.len(),
            chunks: records.len(),
            output_path,
        }
    }
}
