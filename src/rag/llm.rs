//! Language-model client for an Ollama-compatible `/api/generate` endpoint.
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{GenerationConfig, OllamaConfig};

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("language model unreachable: {0}")]
    Unreachable(String),

    #[error("language model returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("malformed language model response: {0}")]
    Malformed(String),
}

/// Anything that turns a prompt into generated text.
pub trait LanguageModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    top_p: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaLlm {
    client: Client,
    endpoint: String,
    model: String,
    options: GenerateOptions,
}

impl OllamaLlm {
    pub fn new(
        base_url: &str,
        model: &str,
        generation: &GenerationConfig,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Unreachable(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.to_string(),
            options: GenerateOptions {
                temperature: generation.temperature,
                num_predict: generation.num_predict,
                top_p: generation.top_p,
            },
        })
    }

    pub fn from_config(ollama: &OllamaConfig, generation: &GenerationConfig) -> Result<Self, LlmError> {
        Self::new(
            &ollama.base_url,
            &ollama.llm_model,
            generation,
            Duration::from_secs(ollama.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LanguageModel for OllamaLlm {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        debug!("Calling generate API: {} ({} prompt chars)", self.endpoint, prompt.len());

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: &self.options,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| LlmError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| LlmError::Malformed(format!("failed to parse response: {e}")))?;

        Ok(parsed.response.trim().to_string())
    }
}
