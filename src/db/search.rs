use super::{Db, IndexError, VectorIndex, models::SearchHit, serialize_vector};
use crate::indexer::{Chunk, DocumentMetadata};
use rusqlite::params;

fn map_search_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchHit> {
    let distance: f64 = row.get(4)?;

    Ok(SearchHit {
        id: row.get(0)?,
        text: row.get(1)?,
        metadata: DocumentMetadata {
            source: row.get(2)?,
            page: row.get(3)?,
        },
        score: 1.0 - distance,
    })
}

impl Db {
    /// Perform vector similarity search using cosine distance.
    ///
    /// Equal distances keep insertion order.
    pub fn search_similar(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let expected = self.fingerprint.dimensions;
        if query_vector.len() != expected {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: query_vector.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                c.chunk_key,
                c.content,
                c.source,
                c.page,
                vec_distance_cosine(v.embedding, ?) as distance
            FROM vec_chunks v
            JOIN chunks c ON v.rowid = c.id
            ORDER BY distance ASC, c.id ASC
            LIMIT ?
            "#,
        )?;
        let rows = stmt.query_map(
            params![serialize_vector(query_vector), top_k as i64],
            map_search_row,
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }
}

impl VectorIndex for Db {
    fn insert(&mut self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        self.insert_chunks(chunks, vectors)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.search_similar(query, k)
    }

    fn count(&self) -> Result<usize, IndexError> {
        self.count_chunks()
    }

    fn dimensions(&self) -> usize {
        self.fingerprint.dimensions
    }
}
