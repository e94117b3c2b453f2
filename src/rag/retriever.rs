use crate::db::{SearchHit, VectorIndex};
use crate::embedder::Embedder;
use crate::error::Result;

/// Embeds the query and returns the `k` nearest hits, closest first.
pub fn retrieve_hits<E, I>(embedder: &E, index: &I, query: &str, k: usize) -> Result<Vec<SearchHit>>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    let query_vector = embedder.embed(query)?;
    Ok(index.search(&query_vector, k)?)
}

/// Same as [`retrieve_hits`], keeping only the chunk texts.
pub fn retrieve<E, I>(embedder: &E, index: &I, query: &str, k: usize) -> Result<Vec<String>>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    Ok(retrieve_hits(embedder, index, query, k)?
        .into_iter()
        .map(|hit| hit.text)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Db, IndexFingerprint, IndexStorage};
    use crate::embedder::mock::MockEmbedder;
    use crate::indexer::{Chunk, DocumentMetadata};

    fn indexed(embedder: &MockEmbedder, texts: &[&str]) -> Db {
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk {
                id: format!("chunk_{i}"),
                text: t.to_string(),
                metadata: DocumentMetadata {
                    source: "cours.pdf".to_string(),
                    page: Some(1),
                },
                start: 0,
            })
            .collect();
        let vectors = embedder.embed_batch(texts).unwrap();
        Db::build(
            &IndexStorage::InMemory,
            IndexFingerprint::new(embedder.model_name(), embedder.dimensions()),
            &chunks,
            &vectors,
        )
        .unwrap()
    }

    #[test]
    fn test_retrieve_matches_search_texts() {
        let embedder = MockEmbedder::new(32);
        let texts = ["alpha", "beta", "gamma", "delta", "epsilon"];
        let db = indexed(&embedder, &texts);

        for k in [1, 3, 5] {
            let query_vector = embedder.embed("gamma").unwrap();
            let expected: Vec<String> = db
                .search(&query_vector, k)
                .unwrap()
                .into_iter()
                .map(|h| h.text)
                .collect();
            let got = retrieve(&embedder, &db, "gamma", k).unwrap();
            assert_eq!(got, expected);
            assert_eq!(got.len(), k);
        }
    }

    #[test]
    fn test_retrieve_exact_text_ranks_first() {
        let embedder = MockEmbedder::new(32);
        let db = indexed(&embedder, &["alpha", "beta", "gamma"]);
        let got = retrieve(&embedder, &db, "beta", 1).unwrap();
        assert_eq!(got, vec!["beta"]);
    }

    #[test]
    fn test_retrieve_fewer_when_index_smaller() {
        let embedder = MockEmbedder::new(32);
        let db = indexed(&embedder, &["only one"]);
        assert_eq!(retrieve(&embedder, &db, "anything", 3).unwrap().len(), 1);
    }
}
