/// Configuration module for DocQA.
///
/// Handles loading, validating, and providing default configuration values.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::rag::generator::Language;

// ── Default value functions ──────────────────────────────────────────

fn default_docs_dir() -> PathBuf {
    PathBuf::from("./docs")
}

fn default_persist_dir() -> PathBuf {
    PathBuf::from("./data/index")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("./dataset/catalog.csv")
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_separator() -> String {
    "\n".to_string()
}

fn default_top_k() -> usize {
    3
}

fn default_language() -> Language {
    Language::French
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_dimensions() -> usize {
    768
}

fn default_llm_model() -> String {
    "orca-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.1
}

fn default_num_predict() -> u32 {
    200
}

fn default_top_p() -> f32 {
    0.5
}

fn default_max_context_chunks() -> usize {
    2
}

fn default_max_chunk_chars() -> usize {
    300
}

fn default_max_sources_shown() -> usize {
    2
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7860
}

fn default_max_features() -> usize {
    5000
}

fn default_top_n() -> usize {
    3
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Corpus folder used by `build-index`.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    /// Directory holding the persisted vector index.
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,

    #[serde(default)]
    pub splitter: SplitterConfig,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_language")]
    pub language: Language,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub recommend: RecommendConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SplitterConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_separator")]
    pub separator: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Expected embedding dimension; responses of any other length are rejected.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Sampling parameters sent with every generation request.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_num_predict")]
    pub num_predict: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    /// Only the first N retrieved chunks reach the prompt.
    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,

    /// Each context chunk is cut to this many characters.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Number of source excerpts rendered next to an answer.
    #[serde(default = "default_max_sources_shown")]
    pub max_sources_shown: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecommendConfig {
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    #[serde(default = "default_max_features")]
    pub max_features: usize,

    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            persist_dir: default_persist_dir(),
            splitter: SplitterConfig::default(),
            top_k: default_top_k(),
            language: default_language(),
            ollama: OllamaConfig::default(),
            generation: GenerationConfig::default(),
            prompt: PromptConfig::default(),
            server: ServerConfig::default(),
            recommend: RecommendConfig::default(),
        }
    }
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separator: default_separator(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            embedding_model: default_embedding_model(),
            dimensions: default_dimensions(),
            llm_model: default_llm_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            num_predict: default_num_predict(),
            top_p: default_top_p(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_context_chunks: default_max_context_chunks(),
            max_chunk_chars: default_max_chunk_chars(),
            max_sources_shown: default_max_sources_shown(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            max_features: default_max_features(),
            default_top_n: default_top_n(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and generates a
    /// template file when the default path is used.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.splitter.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            self.splitter.chunk_overlap < self.splitter.chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            self.splitter.chunk_overlap,
            self.splitter.chunk_size
        );
        anyhow::ensure!(
            !self.splitter.separator.is_empty(),
            "splitter.separator must not be empty"
        );
        anyhow::ensure!(self.top_k > 0, "top_k must be positive");
        anyhow::ensure!(
            self.ollama.dimensions > 0,
            "ollama.dimensions must be positive"
        );
        anyhow::ensure!(
            self.ollama.timeout_secs > 0,
            "ollama.timeout_secs must be positive"
        );
        anyhow::ensure!(
            self.recommend.max_features > 0,
            "recommend.max_features must be positive"
        );
        Ok(())
    }

    /// Socket address string the web UI binds to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.splitter.chunk_size, 1000);
        assert_eq!(config.splitter.chunk_overlap, 200);
        assert_eq!(config.splitter.separator, "\n");
        assert_eq!(config.top_k, 3);
        assert_eq!(config.language, Language::French);
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
        assert_eq!(config.ollama.llm_model, "orca-mini");
        assert_eq!(config.prompt.max_context_chunks, 2);
        assert_eq!(config.prompt.max_chunk_chars, 300);
        assert_eq!(config.bind_addr(), "127.0.0.1:7860");
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"top_k": 5, "splitter": {"chunk_size": 400}, "language": "en"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.splitter.chunk_size, 400);
        assert_eq!(config.language, Language::English);
        // Other fields should have defaults
        assert_eq!(config.splitter.chunk_overlap, 200);
        assert_eq!(config.ollama.dimensions, 768);
    }

    #[test]
    fn test_validate_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_overlap_not_smaller_than_size() {
        let mut config = Config::default();
        config.splitter.chunk_overlap = config.splitter.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_top_k() {
        let mut config = Config::default();
        config.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_custom_path_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("absent.json");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.top_k, 3);
        assert!(!path.exists(), "template is only written for the default path");
    }

    #[test]
    fn test_load_invalid_json_falls_back() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.splitter.chunk_size, 1000);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.splitter.chunk_size, config.splitter.chunk_size);
        assert_eq!(parsed.persist_dir, config.persist_dir);
        assert_eq!(parsed.ollama.llm_model, config.ollama.llm_model);
    }
}
