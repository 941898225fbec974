//! # Embedding Encoder Module
//!
//! ## Purpose
//! Narrow contract to the external embedding capability: given a list of
//! strings, return a list of fixed-length L2-normalized vectors. The neural
//! encoder itself lives behind a sidecar endpoint; this module only speaks
//! its wire contract and applies the encoder-specific input-formatting
//! convention.
//!
//! ## Input/Output Specification
//! - **Input**: Batches of passage or query texts
//! - **Output**: Unit-length embedding vectors, one per input, order preserved
//! - **Implementations**: `RemoteEncoder` (HTTP sidecar), `HashingEncoder`
//!   (deterministic offline fallback)
//!
//! ## Key Features
//! - e5-style `query:` / `passage:` prefixing derived from the encoder id, so
//!   query and passage vectors stay in the alignment the encoder was trained
//!   for
//! - Quantized-variant and device-placement hints forwarded to the sidecar
//! - Strict response validation: one vector per input, consistent dimension

use crate::config::EncoderConfig;
use crate::errors::{Result, SearchError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Contract for the external embedding capability
#[async_trait]
pub trait TextEncoder: Send + Sync {
    /// Encoder identifier, used for the prefix convention and build summaries
    fn id(&self) -> &str;

    /// Encode a batch of texts into L2-normalized fixed-length vectors,
    /// preserving input order.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Apply the encoder-specific passage-formatting convention
pub fn format_passage(encoder_id: &str, passage: &str) -> String {
    if encoder_id.to_lowercase().contains("e5") {
        format!("passage: {}", passage)
    } else {
        passage.to_string()
    }
}

/// Apply the encoder-specific query-formatting convention
pub fn format_query(encoder_id: &str, query: &str) -> String {
    if encoder_id.to_lowercase().contains("e5") {
        format!("query: {}", query)
    } else {
        query.to_string()
    }
}

/// Scale a vector to unit L2 length; zero vectors are left untouched
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Build the encoder selected by configuration
pub fn from_config(config: &EncoderConfig) -> Arc<dyn TextEncoder> {
    if config.id == "hashing" {
        Arc::new(HashingEncoder::new(config.dimension))
    } else {
        Arc::new(RemoteEncoder::new(config.clone()))
    }
}

/// HTTP client for the embedding sidecar
pub struct RemoteEncoder {
    client: reqwest::Client,
    config: EncoderConfig,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    normalize: bool,
    quantized: bool,
    device: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl RemoteEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl TextEncoder for RemoteEncoder {
    fn id(&self) -> &str {
        &self.config.id
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.config.id,
            texts,
            normalize: true,
            quantized: self.config.quantized,
            device: &self.config.device,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let parsed: EmbedResponse = response.json().await?;

        if parsed.embeddings.len() != texts.len() {
            return Err(SearchError::Encoder {
                encoder: self.config.id.clone(),
                details: format!(
                    "expected {} embeddings, received {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            });
        }
        if let Some(first) = parsed.embeddings.first() {
            let dim = first.len();
            if dim == 0 || parsed.embeddings.iter().any(|v| v.len() != dim) {
                return Err(SearchError::Encoder {
                    encoder: self.config.id.clone(),
                    details: "inconsistent embedding dimensions in response".to_string(),
                });
            }
        }

        Ok(parsed.embeddings)
    }
}

/// Deterministic token-hash encoder for offline runs and tests.
///
/// Not a semantic model: tokens are hashed into a fixed number of buckets
/// with a sign bit, then the vector is L2-normalized. Identical text always
/// encodes to the identical vector.
pub struct HashingEncoder {
    dimension: usize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let hash = hasher.finish();
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash & (1u64 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl TextEncoder for HashingEncoder {
    fn id(&self) -> &str {
        "hashing"
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.encode_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn e5_encoders_get_prefixed_inputs() {
        let id = "intfloat/multilingual-e5-small";
        assert_eq!(format_query(id, "consideration"), "query: consideration");
        assert_eq!(
            format_passage(id, "All agreements are contracts"),
            "passage: All agreements are contracts"
        );
    }

    #[test]
    fn other_encoders_pass_inputs_through() {
        let id = "sentence-transformers/all-MiniLM-L6-v2";
        assert_eq!(format_query(id, "consideration"), "consideration");
        assert_eq!(format_passage(id, "text"), "text");
    }

    #[tokio::test]
    async fn hashing_encoder_is_deterministic_and_normalized() {
        let encoder = HashingEncoder::new(64);
        let texts = vec![
            "free consent of parties".to_string(),
            "lawful consideration".to_string(),
        ];
        let first = encoder.encode(&texts).await.unwrap();
        let second = encoder.encode(&texts).await.unwrap();
        assert_eq!(first, second);

        for vector in &first {
            assert_eq!(vector.len(), 64);
            let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn hashing_encoder_handles_empty_text() {
        let encoder = HashingEncoder::new(16);
        let vectors = encoder.encode(&["".to_string()]).await.unwrap();
        assert!(vectors[0].iter().all(|v| *v == 0.0));
    }

    fn remote_config(endpoint: String) -> EncoderConfig {
        EncoderConfig {
            id: "intfloat/multilingual-e5-small".to_string(),
            endpoint,
            quantized: true,
            device: "cpu".to_string(),
            batch_size: 8,
            dimension: 3,
        }
    }

    #[tokio::test]
    async fn remote_encoder_returns_sidecar_vectors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
            })))
            .mount(&server)
            .await;

        let encoder = RemoteEncoder::new(remote_config(format!("{}/embed", server.uri())));
        let vectors = encoder
            .encode(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[tokio::test]
    async fn remote_encoder_rejects_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[1.0, 0.0, 0.0]]
            })))
            .mount(&server)
            .await;

        let encoder = RemoteEncoder::new(remote_config(format!("{}/embed", server.uri())));
        let err = encoder
            .encode(&["first".to_string(), "second".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Encoder { .. }));
    }
}
