//! Database connection management with pragma configuration.
//!
//! Opens the SQLite database, applies the pragmas needed for performance
//! and concurrency (WAL mode), and runs pending migrations.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

/// Handle to the page cache database.
///
/// Wraps a tokio-rusqlite connection that runs statements on a dedicated
/// background thread, so async callers never block on disk I/O and
/// writes are serialized per connection.
#[derive(Clone, Debug)]
pub struct PageStore {
    pub(crate) conn: Connection,
}

impl PageStore {
    /// Open the cache database at `path`, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        tracing::debug!("opening page cache at {}", path.as_ref().display());
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open a throwaway in-memory database, used by tests.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = PageStore::open_in_memory().await.unwrap();
        let version = store
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_open_creates_pages_table() {
        let store = PageStore::open_in_memory().await.unwrap();
        let exists: bool = store
            .conn
            .call(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='pages')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert!(exists);
    }
}
