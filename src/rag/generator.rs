//! Prompt construction and answer generation.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::llm::LanguageModel;
use crate::config::PromptConfig;

/// Language the prompt templates are phrased in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "en")]
    English,
}

/// Result of one generation call.
///
/// An empty answer and a failed call are different outcomes: the first means
/// the service answered with nothing, the second that it could not answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Answer(String),
    Empty,
    Failed(String),
}

impl Generation {
    pub fn text(&self) -> Option<&str> {
        match self {
            Generation::Answer(text) => Some(text),
            _ => None,
        }
    }
}

/// Builds the two prompt templates.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    pub max_context_chunks: usize,
    pub max_chunk_chars: usize,
}

impl PromptBuilder {
    pub fn from_config(config: &PromptConfig) -> Self {
        Self {
            max_context_chunks: config.max_context_chunks,
            max_chunk_chars: config.max_chunk_chars,
        }
    }

    /// RAG prompt when context is present, short-answer prompt otherwise.
    pub fn build<S: AsRef<str>>(&self, query: &str, context: Option<&[S]>, language: Language) -> String {
        match context {
            Some(chunks) if !chunks.is_empty() => self.rag_prompt(query, chunks, language),
            _ => Self::simple_prompt(query, language),
        }
    }

    fn rag_prompt<S: AsRef<str>>(&self, query: &str, context: &[S], language: Language) -> String {
        let context_text = context
            .iter()
            .take(self.max_context_chunks)
            .map(|chunk| truncate_chars(chunk.as_ref(), self.max_chunk_chars))
            .collect::<Vec<_>>()
            .join("\n");

        match language {
            Language::French => format!("Contexte: {context_text}\n\nQ: {query}\nR:"),
            Language::English => format!("Context: {context_text}\n\nQ: {query}\nA:"),
        }
    }

    fn simple_prompt(query: &str, language: Language) -> String {
        match language {
            Language::French => format!("Réponds brièvement:\n\n{query}"),
            Language::English => format!("Answer briefly:\n\n{query}"),
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

/// First `max_chars` characters of `text`, never splitting a code point.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub struct AnswerGenerator {
    llm: Arc<dyn LanguageModel>,
    prompts: PromptBuilder,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>, prompts: PromptBuilder) -> Self {
        Self { llm, prompts }
    }

    /// Generates an answer. Service failures are logged and reported as
    /// [`Generation::Failed`], never propagated.
    pub fn generate<S: AsRef<str>>(
        &self,
        query: &str,
        context: Option<&[S]>,
        language: Language,
    ) -> Generation {
        let prompt = self.prompts.build(query, context, language);

        match self.llm.complete(&prompt) {
            Ok(text) if text.trim().is_empty() => {
                warn!("Language model returned an empty answer");
                Generation::Empty
            }
            Ok(text) => Generation::Answer(text.trim().to_string()),
            Err(e) => {
                error!("Generation failed: {e}");
                Generation::Failed(e.to_string())
            }
        }
    }
}
