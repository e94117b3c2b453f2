//! File loading: PDF pages and plain text files become [`Document`]s.
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{Document, DocumentMetadata};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PDF {path}: {reason}")]
    Pdf { path: PathBuf, reason: String },

    #[error("{path} is not a directory")]
    NotADirectory { path: PathBuf },

    /// A folder load stopped at the first failing file; nothing was returned.
    #[error("batch aborted at {path}: {source}")]
    BatchAborted {
        path: PathBuf,
        #[source]
        source: Box<LoadError>,
    },
}

/// What a folder load does when one file fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Give up on the whole folder and return no documents.
    #[default]
    AbortAll,
    /// Log the failure and keep the documents of every other file.
    SkipFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Text,
}

fn file_kind(path: &Path) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(FileKind::Pdf),
        "txt" => Some(FileKind::Text),
        _ => None,
    }
}

/// Checks if a file has a loadable extension
pub fn is_supported(path: &Path) -> bool {
    file_kind(path).is_some()
}

fn source_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Loads one file. PDFs yield one document per non-empty page.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<Document>, LoadError> {
    let path = path.as_ref();
    match file_kind(path) {
        Some(FileKind::Pdf) => load_pdf(path),
        Some(FileKind::Text) => load_text(path),
        None => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn load_text(path: &Path) -> Result<Vec<Document>, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(vec![Document {
        text,
        metadata: DocumentMetadata {
            source: source_name(path),
            page: None,
        },
    }])
}

fn load_pdf(path: &Path) -> Result<Vec<Document>, LoadError> {
    let pdf = lopdf::Document::load(path).map_err(|e| LoadError::Pdf {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let source = source_name(path);
    let mut documents = Vec::new();

    for page_number in pdf.get_pages().keys() {
        let text = pdf
            .extract_text(&[*page_number])
            .map_err(|e| LoadError::Pdf {
                path: path.to_path_buf(),
                reason: format!("page {page_number}: {e}"),
            })?;

        if text.trim().is_empty() {
            debug!("Skipping empty page {page_number} of {source}");
            continue;
        }

        documents.push(Document {
            text,
            metadata: DocumentMetadata {
                source: source.clone(),
                page: Some(*page_number),
            },
        });
    }

    Ok(documents)
}

/// Regular files among `entries`. An unreadable entry is a failure like any
/// other: it aborts the batch or is skipped, per `policy`.
fn collect_files<I>(dir: &Path, entries: I, policy: FailurePolicy) -> Result<Vec<PathBuf>, LoadError>
where
    I: IntoIterator<Item = std::io::Result<PathBuf>>,
{
    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(source) => {
                let e = LoadError::Io {
                    path: dir.to_path_buf(),
                    source,
                };
                match policy {
                    FailurePolicy::AbortAll => {
                        error!("Failed to list {}: {e}; aborting batch", dir.display());
                        return Err(LoadError::BatchAborted {
                            path: dir.to_path_buf(),
                            source: Box::new(e),
                        });
                    }
                    FailurePolicy::SkipFailed => {
                        warn!("Failed to list an entry of {}: {e}; skipping", dir.display());
                    }
                }
            }
        }
    }
    Ok(files)
}

/// Loads every supported file directly inside `dir`, in file-name order.
///
/// Unsupported files are skipped. Under [`FailurePolicy::AbortAll`] the first
/// failing file aborts the batch and no documents are returned.
pub fn load_folder<P: AsRef<Path>>(
    dir: P,
    policy: FailurePolicy,
) -> Result<Vec<Document>, LoadError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(LoadError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let read_dir = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = collect_files(dir, read_dir.map(|e| e.map(|e| e.path())), policy)?;
    paths.sort();

    let mut documents = Vec::new();

    for path in paths {
        if !is_supported(&path) {
            debug!("Skipping unsupported file: {}", path.display());
            continue;
        }

        match load_file(&path) {
            Ok(docs) => {
                info!("Loaded {} ({} documents)", path.display(), docs.len());
                documents.extend(docs);
            }
            Err(e) => match policy {
                FailurePolicy::AbortAll => {
                    error!("Failed to load {}: {e}; aborting batch", path.display());
                    return Err(LoadError::BatchAborted {
                        path,
                        source: Box::new(e),
                    });
                }
                FailurePolicy::SkipFailed => {
                    warn!("Failed to load {}: {e}; skipping", path.display());
                }
            },
        }
    }

    Ok(documents)
}
