//! Record of which submitter produced which archive folder.

use common::model::serialize::SerializeRecord;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("metadata store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub trait MetadataStore: Send + Sync {
    /// Called once per successful archive.
    fn record(&self, user_id: &str, folder_path: &str) -> Result<SerializeRecord, StoreError>;

    /// Every record, oldest first.
    fn list(&self) -> Result<Vec<SerializeRecord>, StoreError>;
}

/// SQLite file opened afresh for every call.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = SqliteStore {
            path: path.as_ref().to_path_buf(),
        };
        store.connect()?.execute(
            "CREATE TABLE IF NOT EXISTS serialize (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                folder_path TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
            )",
            [],
        )?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Ok(Connection::open(&self.path)?)
    }
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<SerializeRecord> {
    Ok(SerializeRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        folder_path: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl MetadataStore for SqliteStore {
    fn record(&self, user_id: &str, folder_path: &str) -> Result<SerializeRecord, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO serialize (user_id, folder_path) VALUES (?1, ?2)",
            params![user_id, folder_path],
        )?;
        let id = conn.last_insert_rowid();
        let record = conn.query_row(
            "SELECT id, user_id, folder_path, created_at FROM serialize WHERE id = ?1",
            params![id],
            from_row,
        )?;
        Ok(record)
    }

    fn list(&self) -> Result<Vec<SerializeRecord>, StoreError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT id, user_id, folder_path, created_at FROM serialize ORDER BY id")?;
        let records = stmt
            .query_map([], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
