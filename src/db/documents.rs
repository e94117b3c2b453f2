use super::{Db, IndexError, models::*, serialize_vector};
use crate::indexer::{Chunk, DocumentMetadata};
use rusqlite::params;

impl Db {
    /// Inserts chunks and their embeddings in a single transaction.
    pub fn insert_chunks(&mut self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), IndexError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                vectors: embeddings.len(),
            });
        }

        let expected = self.fingerprint.dimensions;
        if let Some(bad) = embeddings.iter().find(|v| v.len() != expected) {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        let tx = self.conn.transaction()?;

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            tx.execute(
                "INSERT INTO chunks (chunk_key, source, page, start_offset, content) VALUES (?, ?, ?, ?, ?)",
                params![
                    chunk.id,
                    chunk.metadata.source,
                    chunk.metadata.page,
                    chunk.start as i64,
                    chunk.text
                ],
            )?;
            let chunk_id = tx.last_insert_rowid();

            let vector_blob = serialize_vector(embedding);
            tx.execute(
                "INSERT INTO vec_chunks (rowid, embedding) VALUES (?, ?)",
                params![chunk_id, vector_blob],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Number of stored chunks.
    pub fn count_chunks(&self) -> Result<usize, IndexError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Stored chunks in insertion order, at most `limit` of them.
    pub fn list_entries(&self, limit: usize) -> Result<Vec<IndexEntry>, IndexError> {
        let mut stmt = self.conn.prepare(
            "SELECT chunk_key, content, source, page, start_offset FROM chunks ORDER BY id LIMIT ?",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(IndexEntry {
                id: row.get(0)?,
                text: row.get(1)?,
                metadata: DocumentMetadata {
                    source: row.get(2)?,
                    page: row.get(3)?,
                },
                start: row.get::<_, i64>(4)? as usize,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Chunk count per source file, sorted by source.
    pub fn sources(&self) -> Result<Vec<SourceSummary>, IndexError> {
        let mut stmt = self
            .conn
            .prepare("SELECT source, COUNT(*) FROM chunks GROUP BY source ORDER BY source")?;
        let rows = stmt.query_map([], |row| {
            Ok(SourceSummary {
                source: row.get(0)?,
                chunks: row.get::<_, i64>(1)? as usize,
            })
        })?;

        let mut sources = Vec::new();
        for row in rows {
            sources.push(row?);
        }
        Ok(sources)
    }
}
