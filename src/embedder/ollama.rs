/// Embedding client for an Ollama-compatible `/api/embed` endpoint.
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, EmbedderError};
use crate::config::OllamaConfig;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Build a client for `{base_url}/api/embed` with a request timeout.
    pub fn new(
        base_url: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, EmbedderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbedderError::Unreachable(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimensions,
        })
    }

    pub fn from_config(config: &OllamaConfig) -> Result<Self, EmbedderError> {
        Self::new(
            &config.base_url,
            &config.embedding_model,
            config.dimensions,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn check_vectors(
        &self,
        expected_count: usize,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if vectors.len() != expected_count {
            return Err(EmbedderError::Malformed(format!(
                "expected {expected_count} embeddings, got {}",
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(EmbedderError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| EmbedderError::Malformed("empty embeddings array".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Calling embeddings API: {} ({} inputs)",
            self.endpoint,
            texts.len()
        );

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| EmbedderError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbedderError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| EmbedderError::Malformed(format!("failed to parse response: {e}")))?;

        self.check_vectors(texts.len(), parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(dimensions: usize) -> OllamaEmbedder {
        OllamaEmbedder::new(
            "http://localhost:11434/",
            "nomic-embed-text",
            dimensions,
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(embedder(3).endpoint, "http://localhost:11434/api/embed");
    }

    #[test]
    fn test_request_body_shape() {
        let input = ["a", "b"];
        let body = serde_json::to_value(EmbedRequest {
            model: "nomic-embed-text",
            input: &input,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"model": "nomic-embed-text", "input": ["a", "b"]})
        );
    }

    #[test]
    fn test_check_vectors_rejects_wrong_dimension() {
        let err = embedder(3)
            .check_vectors(1, vec![vec![0.1, 0.2]])
            .unwrap_err();
        assert!(matches!(
            err,
            EmbedderError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_check_vectors_rejects_wrong_count() {
        let err = embedder(2).check_vectors(2, vec![vec![0.1, 0.2]]).unwrap_err();
        assert!(matches!(err, EmbedderError::Malformed(_)));
    }

    #[test]
    fn test_empty_batch_makes_no_request() {
        // Port 9 (discard) is never an Ollama server; an empty batch must not try.
        let e = OllamaEmbedder::new("http://127.0.0.1:9", "m", 3, Duration::from_millis(50))
            .unwrap();
        assert!(e.embed_batch(&[]).unwrap().is_empty());
    }
}
