//! Corpus ingestion: loading files, splitting them into chunks and building
//! a vector index from a folder.
pub mod core;
pub mod loader;
pub mod splitter;

use serde::Serialize;

/// Provenance carried from a loaded file down to every chunk cut from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    /// Path of the file the text came from.
    pub source: String,
    /// 1-based page number for paged formats (PDF), `None` for plain text.
    pub page: Option<u32>,
}

impl DocumentMetadata {
    /// Short citation label, e.g. `notes.pdf p.3`.
    #[must_use]
    pub fn citation(&self) -> String {
        match self.page {
            Some(page) => format!("{} p.{page}", self.source),
            None => self.source.clone(),
        }
    }
}

/// Text of one file or one page of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// A bounded slice of a document's text, the unit of storage and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Byte offset of `text` within the source document's text.
    pub start: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_with_and_without_page() {
        let paged = DocumentMetadata {
            source: "docs/a.pdf".to_string(),
            page: Some(3),
        };
        let plain = DocumentMetadata {
            source: "docs/b.txt".to_string(),
            page: None,
        };
        assert_eq!(paged.citation(), "docs/a.pdf p.3");
        assert_eq!(plain.citation(), "docs/b.txt");
    }
}
