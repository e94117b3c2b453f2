use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use super::generator::{AnswerGenerator, Generation, Language, PromptBuilder};
use super::llm::{LanguageModel, OllamaLlm};
use super::retriever;
use crate::config::Config;
use crate::db::{Db, IndexFingerprint, SearchHit};
use crate::embedder::Embedder;
use crate::embedder::ollama::OllamaEmbedder;
use crate::error::{RagError, Result};
use crate::indexer::core::{BuildReport, Indexer};
use crate::indexer::loader::FailurePolicy;
use crate::indexer::splitter::TextSplitter;

/// An index ready to answer questions, with where it came from.
pub struct IndexHandle {
    db: Db,
    pub label: String,
    pub report: Option<BuildReport>,
}

impl IndexHandle {
    pub fn index(&self) -> &Db {
        &self.db
    }
}

/// Answer text plus the chunks it was conditioned on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub generation: Generation,
    pub sources: Vec<SearchHit>,
    pub retrieval_time: Duration,
    pub generation_time: Duration,
}

/// Wires loader, splitter, embedder, index, retriever and generator together.
pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    generator: AnswerGenerator,
    splitter: TextSplitter,
    language: Language,
    pub top_k: usize,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            embedder,
            generator: AnswerGenerator::new(llm, PromptBuilder::from_config(&config.prompt)),
            splitter: TextSplitter::from_config(&config.splitter)?,
            language: config.language,
            top_k: config.top_k,
        })
    }

    /// Pipeline talking to the Ollama server named in the config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = OllamaEmbedder::from_config(&config.ollama)?;
        let llm = OllamaLlm::from_config(&config.ollama, &config.generation)?;
        info!(
            "Using embedder {} and language model {} at {}",
            config.ollama.embedding_model, config.ollama.llm_model, config.ollama.base_url
        );
        Self::new(Arc::new(embedder), Arc::new(llm), config)
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    fn fingerprint(&self) -> IndexFingerprint {
        IndexFingerprint::new(self.embedder.model_name(), self.embedder.dimensions())
    }

    fn indexer(&self) -> Indexer<'_, dyn Embedder> {
        Indexer::new(self.embedder.as_ref(), self.splitter.clone())
    }

    /// Static corpus mode: folder → persisted index.
    pub fn build_index(
        &self,
        folder: &Path,
        persist_dir: &Path,
        policy: FailurePolicy,
        show_progress: bool,
    ) -> Result<BuildReport> {
        let (_, report) = self
            .indexer()
            .with_policy(policy)
            .with_progress(show_progress)
            .build_index(folder, persist_dir)?;
        Ok(report)
    }

    /// Reopens a persisted index built with the same embedder.
    pub fn open_index(&self, persist_dir: &Path) -> Result<IndexHandle> {
        let db = Db::load(persist_dir, &self.fingerprint())?;
        Ok(IndexHandle {
            db,
            label: persist_dir.display().to_string(),
            report: None,
        })
    }

    /// Dynamic mode: one file → in-memory index.
    pub fn load_document(&self, path: &Path) -> Result<IndexHandle> {
        let (db, report) = self.indexer().index_file(path)?;
        info!(
            "{} chunks created from {} pages of {}",
            report.chunks,
            report.documents,
            path.display()
        );
        Ok(IndexHandle {
            db,
            label: path.display().to_string(),
            report: Some(report),
        })
    }

    /// Nearest chunks for a query, with scores and provenance.
    pub fn search(&self, handle: &IndexHandle, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyInput("query"));
        }
        retriever::retrieve_hits(self.embedder.as_ref(), handle.index(), query, k)
    }

    /// Retrieves `k` chunks and asks the language model with them as context.
    pub fn answer(&self, handle: &IndexHandle, question: &str, k: usize) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(RagError::EmptyInput("question"));
        }

        let start = Instant::now();
        let sources = retriever::retrieve_hits(self.embedder.as_ref(), handle.index(), question, k)?;
        let retrieval_time = start.elapsed();
        info!("{} chunks retrieved in {:.2?}", sources.len(), retrieval_time);

        let context: Vec<&str> = sources.iter().map(|hit| hit.text.as_str()).collect();
        let start = Instant::now();
        let generation = self
            .generator
            .generate(question, Some(context.as_slice()), self.language);
        let generation_time = start.elapsed();
        info!("Answer generated in {:.2?}", generation_time);

        Ok(Answer {
            generation,
            sources,
            retrieval_time,
            generation_time,
        })
    }
}
