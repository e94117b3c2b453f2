//! Vector index backed by SQLite and sqlite-vec
use rusqlite::{Connection, OptionalExtension, params};
use sqlite_vec::sqlite3_vec_init;
use std::path::{Path, PathBuf};
use std::sync::Once;
use thiserror::Error;
use tracing::info;

use crate::indexer::Chunk;

pub mod documents;
pub mod models;
pub mod search;

pub use models::{IndexEntry, SearchHit};

/// File holding the index inside a persist directory.
pub const INDEX_FILENAME: &str = "index.sqlite3";

/// Build target inside the persist directory, renamed over [`INDEX_FILENAME`].
const STAGING_FILENAME: &str = "index.sqlite3.building";

const META_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chunk_key TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL,
    page INTEGER,
    start_offset INTEGER NOT NULL,
    content TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
"#;

/// vec0 needs the dimension in its declaration.
fn vec_table_sql(dimensions: usize) -> String {
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS vec_chunks USING vec0(embedding FLOAT[{dimensions}]);"
    )
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("no index found at {0}")]
    NotFound(PathBuf),

    #[error("index was built with {found}, but the configured embedder is {expected}")]
    FingerprintMismatch {
        expected: IndexFingerprint,
        found: IndexFingerprint,
    },

    #[error("vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{chunks} chunks but {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("index metadata is corrupt: {0}")]
    CorruptMeta(String),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Embedding model identity recorded with an index, checked on reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFingerprint {
    pub model: String,
    pub dimensions: usize,
}

impl IndexFingerprint {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }
}

impl std::fmt::Display for IndexFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} dims)", self.model, self.dimensions)
    }
}

/// Where a freshly built index lives.
#[derive(Debug, Clone)]
pub enum IndexStorage {
    InMemory,
    /// Directory that will hold [`INDEX_FILENAME`].
    Persistent(PathBuf),
}

/// Minimal contract the retriever and orchestrator rely on, so the
/// similarity engine can be swapped.
pub trait VectorIndex: Send {
    /// Store chunks with their vectors; both slices are parallel.
    fn insert(&mut self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<(), IndexError>;

    /// The `k` nearest entries, most similar first. `k` above the entry
    /// count returns every entry.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError>;

    /// Number of stored entries.
    fn count(&self) -> Result<usize, IndexError>;

    /// Dimension every stored vector has.
    fn dimensions(&self) -> usize;
}

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// A SQLite connection initialized with sqlite-vec and the index schema.
pub struct Db {
    pub(crate) conn: Connection,
    fingerprint: IndexFingerprint,
}

impl Db {
    /// Build a fresh index from chunks and their vectors.
    ///
    /// A persistent build is written next to the live index and swapped in
    /// only once every entry is stored; a failed build leaves the previous
    /// index untouched.
    pub fn build(
        storage: &IndexStorage,
        fingerprint: IndexFingerprint,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<Self, IndexError> {
        match storage {
            IndexStorage::InMemory => {
                let mut db = Self::open_in_memory(fingerprint)?;
                db.insert(chunks, vectors)?;
                Ok(db)
            }
            IndexStorage::Persistent(dir) => Self::build_persistent(dir, fingerprint, chunks, vectors),
        }
    }

    /// Create an empty persistent index in `dir`, replacing an existing one.
    pub fn create<P: AsRef<Path>>(dir: P, fingerprint: IndexFingerprint) -> Result<Self, IndexError> {
        Self::build_persistent(dir.as_ref(), fingerprint, &[], &[])
    }

    fn build_persistent(
        dir: &Path,
        fingerprint: IndexFingerprint,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<Self, IndexError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(INDEX_FILENAME);
        let staging = dir.join(STAGING_FILENAME);
        if staging.exists() {
            std::fs::remove_file(&staging)?;
        }
        info!("Building index: {}", staging.display());

        init_sqlite_vec();
        // The staging connection is closed before the swap.
        let filled = Connection::open(&staging)
            .map_err(IndexError::from)
            .and_then(|conn| Self::init(conn, fingerprint.clone()))
            .and_then(|mut db| db.insert(chunks, vectors));
        if let Err(e) = filled {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }

        if path.exists() {
            info!("Replacing existing index: {}", path.display());
        }
        std::fs::rename(&staging, &path)?;

        let conn = Connection::open(&path)?;
        Ok(Self { conn, fingerprint })
    }

    /// Open an empty in-memory index (dynamic single-document mode, tests).
    pub fn open_in_memory(fingerprint: IndexFingerprint) -> Result<Self, IndexError> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory()?;
        Self::init(conn, fingerprint)
    }

    /// Reopen a persisted index, refusing one built by a different embedder.
    pub fn load<P: AsRef<Path>>(dir: P, expected: &IndexFingerprint) -> Result<Self, IndexError> {
        let dir = dir.as_ref();
        let path = dir.join(INDEX_FILENAME);
        if !path.is_file() {
            return Err(IndexError::NotFound(dir.to_path_buf()));
        }

        init_sqlite_vec();
        let conn = Connection::open(&path)?;

        let has_meta: bool = conn.query_row(
            "SELECT count(*) > 0 FROM sqlite_master WHERE type='table' AND name='index_meta'",
            [],
            |row| row.get(0),
        )?;
        if !has_meta {
            return Err(IndexError::NotFound(dir.to_path_buf()));
        }

        let found = read_fingerprint(&conn)?;
        if &found != expected {
            return Err(IndexError::FingerprintMismatch {
                expected: expected.clone(),
                found,
            });
        }

        info!("Loaded index {} built with {found}", path.display());
        Ok(Self {
            conn,
            fingerprint: found,
        })
    }

    fn init(conn: Connection, fingerprint: IndexFingerprint) -> Result<Self, IndexError> {
        let vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
        info!("sqlite-vec version: {}", vec_version);

        conn.execute_batch(META_SQL)?;
        conn.execute_batch(&vec_table_sql(fingerprint.dimensions))?;

        conn.execute(
            "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('embedding_model', ?), ('dimensions', ?), ('created_at', ?)",
            params![
                fingerprint.model,
                fingerprint.dimensions.to_string(),
                chrono::Utc::now().to_rfc3339()
            ],
        )?;

        Ok(Self { conn, fingerprint })
    }

    pub fn fingerprint(&self) -> &IndexFingerprint {
        &self.fingerprint
    }

    /// Creation timestamp recorded in the index metadata.
    pub fn created_at(&self) -> Result<Option<String>, IndexError> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = 'created_at'",
                [],
                |row| row.get(0),
            )
            .optional()?)
    }
}

fn read_fingerprint(conn: &Connection) -> Result<IndexFingerprint, IndexError> {
    let get = |key: &str| -> Result<String, IndexError> {
        conn.query_row(
            "SELECT value FROM index_meta WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| IndexError::CorruptMeta(format!("missing {key}")))
    };

    let model = get("embedding_model")?;
    let dimensions = get("dimensions")?
        .parse::<usize>()
        .map_err(|e| IndexError::CorruptMeta(format!("dimensions: {e}")))?;
    Ok(IndexFingerprint { model, dimensions })
}

/// Helper to serialize a float32 vector into bytes for vec0 virtual table
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}
