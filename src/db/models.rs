use serde::Serialize;

use crate::indexer::DocumentMetadata;

/// One nearest-neighbour result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Cosine similarity, higher is closer.
    pub score: f64,
}

/// A stored chunk as listed by index inspection.
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    pub start: usize,
}

/// Per-source chunk count.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub chunks: usize,
}
