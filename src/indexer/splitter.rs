//! Separator-based text splitting with overlapping windows.
use thiserror::Error;
use tracing::warn;

use super::{Chunk, Document};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SplitterError {
    #[error("chunk_size must be positive")]
    InvalidChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    InvalidOverlap { overlap: usize, size: usize },

    #[error("separator must not be empty")]
    EmptySeparator,
}

/// A run of text between two separators, in byte and char coordinates.
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: usize,
    end: usize,
    start_char: usize,
    end_char: usize,
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl TextSplitter {
    /// Sizes are measured in characters.
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        separator: impl Into<String>,
    ) -> Result<Self, SplitterError> {
        let separator = separator.into();
        if chunk_size == 0 {
            return Err(SplitterError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(SplitterError::InvalidOverlap {
                overlap: chunk_overlap,
                size: chunk_size,
            });
        }
        if separator.is_empty() {
            return Err(SplitterError::EmptySeparator);
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separator,
        })
    }

    pub fn from_config(config: &crate::config::SplitterConfig) -> Result<Self, SplitterError> {
        Self::new(config.chunk_size, config.chunk_overlap, config.separator.clone())
    }

    /// Splits every document; chunk ids run across the whole batch.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in documents {
            for (start, end) in self.chunk_spans(&doc.text) {
                let text = &doc.text[start..end];
                chunks.push(Chunk {
                    id: format!("chunk_{}", chunks.len()),
                    text: text.to_string(),
                    metadata: doc.metadata.clone(),
                    start,
                });
            }
        }
        chunks
    }

    /// Splits a single text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.chunk_spans(text)
            .into_iter()
            .map(|(start, end)| text[start..end].to_string())
            .collect()
    }

    /// Spans worth embedding: a window holding only whitespace is dropped,
    /// so the text between two kept chunks is separators or whitespace.
    fn chunk_spans(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans = self.split_spans(text);
        spans.retain(|&(start, end)| !text[start..end].trim().is_empty());
        spans
    }

    fn segments(&self, text: &str) -> Vec<Segment> {
        let sep_chars = self.separator.chars().count();
        let mut segments = Vec::new();
        let mut byte = 0;
        let mut chars = 0;

        for piece in text.split(self.separator.as_str()) {
            let piece_chars = piece.chars().count();
            if !piece.is_empty() {
                segments.push(Segment {
                    start: byte,
                    end: byte + piece.len(),
                    start_char: chars,
                    end_char: chars + piece_chars,
                });
            }
            byte += piece.len() + self.separator.len();
            chars += piece_chars + sep_chars;
        }

        segments
    }

    /// Byte ranges of each chunk. Every range starts and ends on a segment
    /// boundary, so it is an exact slice of `text`.
    fn split_spans(&self, text: &str) -> Vec<(usize, usize)> {
        let segments = self.segments(text);
        let span = |lo: usize, hi: usize| segments[hi].end_char - segments[lo].start_char;

        let mut spans = Vec::new();
        let mut emit = |lo: usize, hi: usize| {
            let len = span(lo, hi);
            if len > self.chunk_size {
                warn!(
                    "Created a chunk of size {len}, which is longer than the specified {}",
                    self.chunk_size
                );
            }
            spans.push((segments[lo].start, segments[hi].end));
        };

        // The current window is segments[lo..i].
        let mut lo = 0;
        for i in 0..segments.len() {
            if lo < i && span(lo, i) > self.chunk_size {
                emit(lo, i - 1);
                while lo < i && (span(lo, i - 1) > self.chunk_overlap || span(lo, i) > self.chunk_size)
                {
                    lo += 1;
                }
            }
        }
        if lo < segments.len() {
            emit(lo, segments.len() - 1);
        }

        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::DocumentMetadata;

    fn doc(text: &str, page: Option<u32>) -> Document {
        Document {
            text: text.to_string(),
            metadata: DocumentMetadata {
                source: "course.pdf".to_string(),
                page,
            },
        }
    }

    /// Rebuilds the text from the non-overlapping part of each chunk. Gaps
    /// between chunks may only hold separators and whitespace.
    fn stitch(text: &str, chunks: &[Chunk], sep: &str) -> String {
        let mut out = String::new();
        let mut covered = 0;
        let fill_gap = |out: &mut String, from: usize, to: usize| {
            let gap = &text[from..to];
            assert!(
                gap.replace(sep, "").trim().is_empty(),
                "gap must only hold separators and whitespace: {gap:?}"
            );
            out.push_str(gap);
        };

        for c in chunks {
            let end = c.start + c.text.len();
            if c.start > covered {
                fill_gap(&mut out, covered, c.start);
                covered = c.start;
            }
            if end > covered {
                out.push_str(&c.text[covered - c.start..]);
                covered = end;
            }
        }
        fill_gap(&mut out, covered, text.len());
        out
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert_eq!(
            TextSplitter::new(100, 100, "\n").unwrap_err(),
            SplitterError::InvalidOverlap {
                overlap: 100,
                size: 100
            }
        );
        assert!(TextSplitter::new(100, 150, "\n").is_err());
        assert_eq!(
            TextSplitter::new(0, 0, "\n").unwrap_err(),
            SplitterError::InvalidChunkSize
        );
        assert_eq!(
            TextSplitter::new(10, 2, "").unwrap_err(),
            SplitterError::EmptySeparator
        );
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TextSplitter::new(1000, 200, "\n").unwrap();
        let chunks = splitter.split_text("line one\nline two");
        assert_eq!(chunks, vec!["line one\nline two"]);
    }

    #[test]
    fn test_empty_and_blank_text() {
        let splitter = TextSplitter::new(10, 2, "\n").unwrap();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("\n\n\n").is_empty());
        assert!(splitter.split_text("   ").is_empty());
    }

    #[test]
    fn test_windows_overlap() {
        let splitter = TextSplitter::new(11, 5, "\n").unwrap();
        let chunks = splitter.split_text("aaaa\nbbbb\ncccc\ndddd");
        assert_eq!(chunks, vec!["aaaa\nbbbb", "bbbb\ncccc", "cccc\ndddd"]);
    }

    #[test]
    fn test_no_overlap_when_zero() {
        let splitter = TextSplitter::new(9, 0, "\n").unwrap();
        let chunks = splitter.split_text("aaaa\nbbbb\ncccc\ndddd");
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc\ndddd"]);
    }

    #[test]
    fn test_oversized_segment_is_its_own_chunk() {
        let splitter = TextSplitter::new(5, 1, "\n").unwrap();
        let chunks = splitter.split_text("ab\nthis-line-is-long\ncd");
        assert_eq!(chunks, vec!["ab", "this-line-is-long", "cd"]);
    }

    #[test]
    fn test_chunks_respect_size_unless_single_segment() {
        let text = "Le sharding répartit les données.\nChaque shard est un replica set.\nLe mongos route les requêtes.\nLes config servers gardent les métadonnées.";
        let splitter = TextSplitter::new(70, 35, "\n").unwrap();
        for chunk in splitter.split_text(text) {
            let n = chunk.chars().count();
            assert!(n <= 70 || !chunk.contains('\n'), "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn test_metadata_copied_and_ids_sequential() {
        let splitter = TextSplitter::new(9, 0, "\n").unwrap();
        let docs = vec![doc("aaaa\nbbbb\ncccc", Some(1)), doc("dddd", Some(2))];
        let chunks = splitter.split_documents(&docs);

        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["chunk_0", "chunk_1", "chunk_2"]);
        assert_eq!(chunks[0].metadata, docs[0].metadata);
        assert_eq!(chunks[1].metadata, docs[0].metadata);
        assert_eq!(chunks[2].metadata, docs[1].metadata);
    }

    #[test]
    fn test_chunks_are_substrings_at_their_offset() {
        let text = "é1\nβ22\n\nγ333\nδ4444\nε55555";
        let splitter = TextSplitter::new(8, 3, "\n").unwrap();
        let chunks = splitter.split_documents(&[doc(text, None)]);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert_eq!(&text[c.start..c.start + c.text.len()], c.text);
        }
    }

    #[test]
    fn test_whitespace_only_window_is_dropped_not_misplaced() {
        let text = "alpha\n   \nbeta";
        let splitter = TextSplitter::new(5, 0, "\n").unwrap();
        let chunks = splitter.split_documents(&[doc(text, Some(1))]);

        let spans: Vec<(usize, &str)> = chunks.iter().map(|c| (c.start, c.text.as_str())).collect();
        assert_eq!(spans, vec![(0, "alpha"), (10, "beta")]);
        assert_eq!(stitch(text, &chunks, "\n"), text);
    }

    #[test]
    fn test_unique_spans_reconstruct_text() {
        let texts = [
            "alpha\nbeta\ngamma\ndelta\nepsilon\nzeta\neta\ntheta",
            "\nleading and trailing separators\n\nwith a blank line\n",
            "one line without any separator at all",
            "réseau\nnœud\nclé primaire\nindex composé\nréplication",
            "a\nb\nc\nd\ne\nf\ng\nh\ni\nj\nk",
            "alpha\n   \nbeta",
            "page header\n \t \n\n  \nbody text. more text\n   ",
        ];
        let separators = ["\n", ". "];

        for text in texts {
            for sep in separators {
                for size in [3, 5, 8, 13, 40, 200] {
                    for overlap in [0, 1, size / 2, size - 1] {
                        let splitter = TextSplitter::new(size, overlap, sep).unwrap();
                        let chunks = splitter.split_documents(&[doc(text, None)]);
                        assert_eq!(
                            stitch(text, &chunks, sep),
                            text,
                            "size={size} overlap={overlap} sep={sep:?}"
                        );
                    }
                }
            }
        }
    }
}
