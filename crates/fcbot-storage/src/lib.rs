//! fcbot-storage: SQLite-backed persistence for the checkin document.
//!
//! The bot keeps exactly one JSON document, stored under a fixed key in a
//! key-value table. Every command reads the whole document and writes a
//! full replacement in a single call.

use std::path::Path;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;

use fcbot_types::{CheckinDocument, DocumentError};

/// Storage key the checkin document lives under.
pub const DOC_KEY: &str = "cw";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Stored document is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Document violates invariants: {0}")]
    Invalid(#[from] DocumentError),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// SQLite-based key-value store for the bot's state document.
pub struct CheckinStore {
    conn: Arc<Mutex<Connection>>,
}

impl CheckinStore {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        tracing::info!("Storage opened: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;

             CREATE TABLE IF NOT EXISTS kv (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;
        Ok(())
    }

    /// Get a raw value by key.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let value = conn
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1",
                    rusqlite::params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await?
    }

    /// Insert or replace a raw value.
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.clone();
        let key = key.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )?;
            Ok(())
        })
        .await?
    }

    /// Load the checkin document, if one has been stored.
    ///
    /// Malformed JSON surfaces as [`StorageError::Corrupt`] and an
    /// invariant-breaking document as [`StorageError::Invalid`] rather
    /// than a silent default.
    pub async fn load_document(&self) -> Result<Option<CheckinDocument>> {
        let Some(raw) = self.get(DOC_KEY).await? else {
            return Ok(None);
        };
        let mut doc: CheckinDocument = serde_json::from_str(&raw)?;
        doc.normalize();
        doc.validate()?;
        Ok(Some(doc))
    }

    /// Load the checkin document, creating and persisting the empty
    /// default if none exists yet.
    pub async fn load_or_init(&self) -> Result<CheckinDocument> {
        if let Some(doc) = self.load_document().await? {
            return Ok(doc);
        }
        let doc = CheckinDocument::default();
        self.save_document(&doc).await?;
        tracing::info!("Initialized empty checkin document");
        Ok(doc)
    }

    /// Validate and persist a full replacement document.
    pub async fn save_document(&self, doc: &CheckinDocument) -> Result<()> {
        doc.validate()?;
        let raw = serde_json::to_string(doc)?;
        self.put(DOC_KEY, &raw).await
    }
}
