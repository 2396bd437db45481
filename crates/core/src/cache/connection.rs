//! Opening the SQLite-backed partition store.
//!
//! Every connection gets the same pragmas (WAL journal, foreign keys on) and is
//! migrated to the latest schema before it is handed out.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::{Connection, rusqlite};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;
PRAGMA temp_store=MEMORY;
PRAGMA foreign_keys=ON;";

/// SQLite partition store.
///
/// Statements run on tokio-rusqlite's background thread. Clones share the
/// connection.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open (or create) the store at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).await.map_err(|e| Error::Database(e.into()))?;
        tracing::info!(path = %path.display(), "opened cache database");
        Self::prepare(conn).await
    }

    /// Open a private in-memory store.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        // Partition deletion relies on ON DELETE CASCADE.
        conn.call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch(PRAGMAS) })
            .await
            .map_err(Error::Database)?;

        let version = migrations::run(&conn).await?;
        tracing::debug!(schema_version = version, "cache schema ready");

        Ok(Self { conn })
    }
}
