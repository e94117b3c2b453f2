//! Learning-resource catalog read from CSV.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub platform: String,
}

impl CatalogEntry {
    /// Text the TF-IDF model is fitted on.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Reads every row with a non-blank title. Extra columns are ignored.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    let read_err = |source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(read_err)?;

    let mut entries = Vec::new();
    let mut dropped = 0usize;
    for row in reader.deserialize::<CatalogEntry>() {
        let entry = row.map_err(read_err)?;
        if entry.title.trim().is_empty() {
            dropped += 1;
            continue;
        }
        entries.push(entry);
    }

    if dropped > 0 {
        debug!("Dropped {dropped} catalog rows without a title");
    }
    info!("Catalog loaded: {} resources from {}", entries.len(), path.display());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rows_without_title_are_dropped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,title,description,url,platform").unwrap();
        writeln!(file, "1,Intro to Rust,Ownership and borrowing,https://a.example,Udemy").unwrap();
        writeln!(file, "2,,Orphan description,https://b.example,YouTube").unwrap();
        writeln!(file, "3,SQL Basics,,https://c.example,Coursera").unwrap();
        file.flush().unwrap();

        let entries = load_catalog(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Intro to Rust");
        assert_eq!(entries[1].combined_text(), "SQL Basics ");
        assert_eq!(entries[1].platform, "Coursera");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(load_catalog(&temp.path().join("absent.csv")).is_err());
    }
}
