use crate::db::{Db, IndexFingerprint, IndexStorage};
use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::indexer::loader::{self, FailurePolicy};
use crate::indexer::splitter::TextSplitter;
use crate::indexer::{Chunk, Document};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Chunks sent to the embedding service per request.
const EMBED_BATCH_SIZE: usize = 32;

/// Outcome of a corpus or single-file indexing run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub dimensions: usize,
    pub persist_dir: Option<PathBuf>,
    pub load_time: Duration,
    pub split_time: Duration,
    pub embed_time: Duration,
}

impl BuildReport {
    pub fn total_time(&self) -> Duration {
        self.load_time + self.split_time + self.embed_time
    }
}

pub struct Indexer<'a, E: Embedder + ?Sized> {
    pub embedder: &'a E,
    pub splitter: TextSplitter,
    pub policy: FailurePolicy,
    pub show_progress: bool,
}

impl<'a, E: Embedder + ?Sized> Indexer<'a, E> {
    pub fn new(embedder: &'a E, splitter: TextSplitter) -> Self {
        Self {
            embedder,
            splitter,
            policy: FailurePolicy::default(),
            show_progress: false,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn fingerprint(&self) -> IndexFingerprint {
        IndexFingerprint::new(self.embedder.model_name(), self.embedder.dimensions())
    }

    /// Loads a corpus folder, splits it, embeds every chunk and persists the
    /// resulting index under `persist_dir`.
    pub fn build_index<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        folder: P,
        persist_dir: Q,
    ) -> Result<(Db, BuildReport)> {
        let folder = folder.as_ref();
        let persist_dir = persist_dir.as_ref();

        info!("Loading documents from {}", folder.display());
        let start = Instant::now();
        let documents = loader::load_folder(folder, self.policy)?;
        let load_time = start.elapsed();
        info!("{} documents loaded in {:.2?}", documents.len(), load_time);

        self.index_documents(
            &documents,
            &IndexStorage::Persistent(persist_dir.to_path_buf()),
            load_time,
        )
    }

    /// Loads one file into an in-memory index.
    pub fn index_file<P: AsRef<Path>>(&self, path: P) -> Result<(Db, BuildReport)> {
        let path = path.as_ref();
        info!("Loading {}", path.display());
        let start = Instant::now();
        let documents = loader::load_file(path)?;
        let load_time = start.elapsed();
        info!("{} pages loaded", documents.len());

        self.index_documents(&documents, &IndexStorage::InMemory, load_time)
    }

    /// Splits, embeds and stores already-loaded documents.
    pub fn index_documents(
        &self,
        documents: &[Document],
        storage: &IndexStorage,
        load_time: Duration,
    ) -> Result<(Db, BuildReport)> {
        if documents.is_empty() {
            return Err(RagError::NoContent("no documents found".to_string()));
        }

        let start = Instant::now();
        let chunks = self.splitter.split_documents(documents);
        let split_time = start.elapsed();
        info!("{} chunks created in {:.2?}", chunks.len(), split_time);

        if chunks.is_empty() {
            return Err(RagError::NoContent(
                "documents contain no extractable text".to_string(),
            ));
        }

        let start = Instant::now();
        let vectors = self.embed_chunks(&chunks)?;
        let db = Db::build(storage, self.fingerprint(), &chunks, &vectors)?;
        let embed_time = start.elapsed();
        info!("Index built in {:.2?}", embed_time);

        let persist_dir = match storage {
            IndexStorage::Persistent(dir) => Some(dir.clone()),
            IndexStorage::InMemory => None,
        };

        let report = BuildReport {
            documents: documents.len(),
            chunks: chunks.len(),
            dimensions: self.embedder.dimensions(),
            persist_dir,
            load_time,
            split_time,
            embed_time,
        };

        Ok((db, report))
    }

    fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new(chunks.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {pos}/{len} chunks embedded {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓░"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let text_refs: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            vectors.extend(self.embedder.embed_batch(&text_refs)?);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        Ok(vectors)
    }
}
