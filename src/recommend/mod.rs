//! Learning-resource recommendation by TF-IDF keyword similarity.
//!
//! Independent of the RAG pipeline: the catalog is vectorised once at
//! startup and queries are scored against it with cosine similarity.
pub mod catalog;
pub mod stopwords;
pub mod tfidf;

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use catalog::{CatalogEntry, load_catalog};
use tfidf::{SparseVector, TfIdfVectorizer, cosine};

/// One row of a recommendation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub title: String,
    pub url: String,
    pub platform: String,
}

pub struct Recommender {
    entries: Vec<CatalogEntry>,
    rows: Vec<SparseVector>,
    vectorizer: Option<TfIdfVectorizer>,
}

impl Recommender {
    pub fn new(entries: Vec<CatalogEntry>, max_features: usize) -> Self {
        if entries.is_empty() {
            return Self::empty();
        }
        let texts: Vec<String> = entries.iter().map(CatalogEntry::combined_text).collect();
        let (vectorizer, rows) = TfIdfVectorizer::fit_transform(&texts, max_features);
        info!(
            "Recommendation model ready: {} resources, {} terms",
            entries.len(),
            vectorizer.vocabulary_len()
        );
        Self {
            entries,
            rows,
            vectorizer: Some(vectorizer),
        }
    }

    /// A recommender that always answers with no results.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            rows: Vec::new(),
            vectorizer: None,
        }
    }

    /// Loads and fits the catalog. A catalog that cannot be read yields an
    /// empty recommender instead of an error.
    pub fn from_catalog(path: &Path, max_features: usize) -> Self {
        match load_catalog(path) {
            Ok(entries) => Self::new(entries, max_features),
            Err(e) => {
                warn!("Recommendations disabled: {e}");
                Self::empty()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The `top_n` catalog rows most similar to `query`, best first. Equal
    /// scores keep catalog order.
    pub fn search(&self, query: &str, top_n: usize) -> Vec<Recommendation> {
        let Some(vectorizer) = &self.vectorizer else {
            return Vec::new();
        };
        if query.trim().is_empty() || top_n == 0 {
            return Vec::new();
        }

        let query_vec = vectorizer.transform(query);
        let mut scored: Vec<(usize, f32)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i, cosine(&query_vec, row)))
            .collect();
        // sort_by is stable, so ties stay in catalog order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(top_n)
            .map(|(i, _)| {
                let entry = &self.entries[i];
                Recommendation {
                    title: entry.title.clone(),
                    url: entry.url.clone(),
                    platform: entry.platform.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, description: &str) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            description: description.to_string(),
            url: format!("https://example.org/{}", title.replace(' ', "-")),
            platform: "Coursera".to_string(),
        }
    }

    fn catalog() -> Recommender {
        Recommender::new(
            vec![
                entry("French Cooking Basics", "Sauces, bread and pastry at home"),
                entry("Intro to Machine Learning", "Supervised learning, regression and classification"),
                entry("Python for Data Science", "Pandas, numpy and plotting"),
                entry("Deep Learning", "Neural networks and machine vision"),
            ],
            5000,
        )
    }

    #[test]
    fn test_machine_learning_beats_cooking() {
        let results = catalog().search("machine learning", 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Intro to Machine Learning");
        assert_eq!(results[1].title, "Deep Learning");
        assert_eq!(results[2].title, "French Cooking Basics");
    }

    #[test]
    fn test_top_n_larger_than_catalog() {
        assert_eq!(catalog().search("python", 50).len(), 4);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let results = catalog().search("zzz unknown words", 4);
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "French Cooking Basics",
                "Intro to Machine Learning",
                "Python for Data Science",
                "Deep Learning"
            ]
        );
    }

    #[test]
    fn test_blank_query_is_empty() {
        assert!(catalog().search("   ", 3).is_empty());
        assert!(catalog().search("python", 0).is_empty());
    }

    #[test]
    fn test_missing_catalog_degrades_to_empty() {
        let temp = tempfile::tempdir().unwrap();
        let recommender = Recommender::from_catalog(&temp.path().join("absent.csv"), 5000);
        assert!(recommender.is_empty());
        assert!(recommender.search("machine learning", 3).is_empty());
    }
}
