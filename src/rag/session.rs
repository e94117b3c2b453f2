//! Single-document session: at most one loaded index, replaced by each load.
//!
//! Every entry point here turns failures into short status strings; nothing
//! is propagated to the presentation layer.
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use super::generator::Generation;
use super::pipeline::{IndexHandle, Pipeline};
use crate::db::SearchHit;

pub const NO_FILE_MESSAGE: &str = "[!] Veuillez sélectionner un PDF";
pub const NO_INDEX_MESSAGE: &str = "[!] Chargez d'abord un PDF";
pub const EMPTY_QUESTION_MESSAGE: &str = "[!] Entrez une question";
pub const EMPTY_ANSWER_MESSAGE: &str = "[!] Le modèle n'a renvoyé aucune réponse";

/// What the UI renders after a question.
#[derive(Debug, Clone, Default)]
pub struct AskOutcome {
    pub answer: String,
    /// Source excerpts separated by a blank line.
    pub sources: String,
    pub hits: Vec<SearchHit>,
}

impl AskOutcome {
    fn status(message: impl Into<String>) -> Self {
        Self {
            answer: message.into(),
            ..Self::default()
        }
    }
}

pub struct Session {
    pipeline: Arc<Pipeline>,
    current: Option<IndexHandle>,
    max_sources_shown: usize,
}

impl Session {
    pub fn new(pipeline: Arc<Pipeline>, max_sources_shown: usize) -> Self {
        Self {
            pipeline,
            current: None,
            max_sources_shown,
        }
    }

    pub fn has_index(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_label(&self) -> Option<&str> {
        self.current.as_ref().map(|h| h.label.as_str())
    }

    /// Indexes `path` and makes it the active document. A failed load keeps
    /// the previously loaded document.
    pub fn load_pdf(&mut self, path: Option<&Path>) -> String {
        let Some(path) = path else {
            return NO_FILE_MESSAGE.to_string();
        };

        match self.pipeline.load_document(path) {
            Ok(handle) => {
                let message = match &handle.report {
                    Some(r) => format!(
                        "[✓] {} chunks créés à partir de {} pages",
                        r.chunks, r.documents
                    ),
                    None => "[✓] PDF chargé avec succès".to_string(),
                };
                info!("Active document is now {}", handle.label);
                self.current = Some(handle);
                message
            }
            Err(e) => {
                error!("Failed to load {}: {e}", path.display());
                format!("❌ Erreur: {e}")
            }
        }
    }

    /// Answers against the active document.
    pub fn ask(&self, question: &str) -> AskOutcome {
        let Some(handle) = &self.current else {
            return AskOutcome::status(NO_INDEX_MESSAGE);
        };
        if question.trim().is_empty() {
            return AskOutcome::status(EMPTY_QUESTION_MESSAGE);
        }

        match self.pipeline.answer(handle, question, self.pipeline.top_k) {
            Ok(answer) => {
                let sources = answer
                    .sources
                    .iter()
                    .take(self.max_sources_shown)
                    .map(|hit| hit.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                let text = match answer.generation {
                    Generation::Answer(text) => text,
                    Generation::Empty => EMPTY_ANSWER_MESSAGE.to_string(),
                    Generation::Failed(reason) => format!("[X] Erreur: {reason}"),
                };
                AskOutcome {
                    answer: text,
                    sources,
                    hits: answer.sources,
                }
            }
            Err(e) if e.is_service_error() => {
                error!("Question failed, service unavailable: {e}");
                AskOutcome::status(format!("[X] Service Ollama indisponible: {e}"))
            }
            Err(e) => {
                error!("Question failed: {e}");
                AskOutcome::status(format!("[X] Erreur: {e}"))
            }
        }
    }
}
