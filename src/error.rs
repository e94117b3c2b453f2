//! Error taxonomy shared by the orchestration layer.
use thiserror::Error;

use crate::db::IndexError;
use crate::embedder::EmbedderError;
use crate::indexer::loader::LoadError;
use crate::indexer::splitter::SplitterError;
use crate::rag::llm::LlmError;

#[derive(Error, Debug)]
pub enum RagError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Splitter(#[from] SplitterError),

    #[error(transparent)]
    Embedding(#[from] EmbedderError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// Nothing usable came out of the input files.
    #[error("no content: {0}")]
    NoContent(String),

    /// Blank question or missing file, rejected before any network call.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
}

impl RagError {
    /// True when the failure came from the embedding or language-model service.
    pub fn is_service_error(&self) -> bool {
        matches!(self, RagError::Embedding(_) | RagError::Llm(_))
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
