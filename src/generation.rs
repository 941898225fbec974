//! # Generation Client Module
//!
//! ## Purpose
//! Narrow contract to the external text-generation capability: a prompt plus
//! a maximum output-length budget in, generated text out. This module builds
//! the grounded prompt from retrieved chunks and forwards it; generation
//! itself happens behind a sidecar endpoint.
//!
//! ## Input/Output Specification
//! - **Input**: Ranked `ScoredChunk` records and the user question
//! - **Output**: Generated answer text
//! - **Prompt Contract**: One context block per record, formatted as
//!   `"[{rank}] {text}\nSource: {law_name} §{section_id} ({chunk_id})"`
//!
//! ## Key Features
//! - The generation service is instructed to answer only from the supplied
//!   context and to refuse when the context is insufficient
//! - Model id and sampling parameters forwarded from configuration

use crate::config::GenerationConfig;
use crate::errors::{Result, SearchError};
use crate::retrieval::ScoredChunk;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// System role given to the generation service
pub const SYSTEM_PROMPT: &str =
    "You are a bilingual (Urdu + English) legal assistant for Pakistan.";

/// Contract for the external generation capability
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate text for a prompt within a maximum output-length budget
    async fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String>;
}

/// Build the grounded prompt from retrieved chunks.
///
/// Each record becomes a numbered context block carrying its statutory
/// source, and the instruction restricts the answer to that context.
pub fn build_context_prompt(query: &str, matches: &[ScoredChunk]) -> String {
    let context = matches
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            format!(
                "[{}] {}\nSource: {} \u{00A7}{} ({})",
                idx + 1,
                item.record.text,
                item.record.law_name,
                item.record.section_id,
                item.record.chunk_id
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Answer the question using ONLY the context below. \
         If the context does not contain the answer, say you don't have enough information. \
         Do not provide legal advice.\n\nQuestion: {}\n\nContext:\n{}",
        query, context
    )
}

/// HTTP client for the generation sidecar
pub struct RemoteGenerator {
    client: reqwest::Client,
    config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    max_new_tokens: usize,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

impl RemoteGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl GenerationClient for RemoteGenerator {
    async fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.model,
            system: SYSTEM_PROMPT,
            prompt,
            max_new_tokens,
            temperature: 0.2,
            top_p: 0.9,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| SearchError::Generation {
                details: e.to_string(),
            })?;
        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::IndexedChunk;

    fn scored(rank_text: &str, law: &str, section: &str, chunk: &str) -> ScoredChunk {
        ScoredChunk {
            record: IndexedChunk {
                chunk_id: chunk.to_string(),
                law_name: law.to_string(),
                domain: "Contract Law".to_string(),
                jurisdiction: "Pakistan".to_string(),
                section_id: section.to_string(),
                section_title: None,
                text: rank_text.to_string(),
            },
            score: 0.9,
        }
    }

    #[test]
    fn context_blocks_carry_rank_and_source() {
        let matches = vec![
            scored(
                "All agreements are contracts",
                "Contract Act, 1872",
                "10",
                "Contract Act, 1872::sec-10::chunk-0",
            ),
            scored(
                "Every person is competent to contract",
                "Contract Act, 1872",
                "11",
                "Contract Act, 1872::sec-11::chunk-0",
            ),
        ];

        let prompt = build_context_prompt("who may contract?", &matches);
        assert!(prompt.contains(
            "[1] All agreements are contracts\nSource: Contract Act, 1872 \u{00A7}10 (Contract Act, 1872::sec-10::chunk-0)"
        ));
        assert!(prompt.contains(
            "[2] Every person is competent to contract\nSource: Contract Act, 1872 \u{00A7}11 (Contract Act, 1872::sec-11::chunk-0)"
        ));
        assert!(prompt.contains("Question: who may contract?"));
        assert!(prompt.starts_with("Answer the question using ONLY the context below."));
        assert!(prompt.contains("Do not provide legal advice."));
    }
}
