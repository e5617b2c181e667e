//! Page entry CRUD and maintenance operations.
//!
//! Entries are keyed by content address; an upsert replaces the prior
//! entry for that address in a single statement, so readers never see a
//! partially written row.

use super::connection::PageStore;
use super::hash::content_address;
use crate::Error;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Body fetched from the network by the run that wrote the entry.
    Fresh,
    /// Entry has since been served from the cache.
    CachedHit,
    /// Entry recording a failure; carries no body. The fetcher never
    /// writes this today (failures are retried on the next run), but
    /// readers skip it so a negative cache needs no schema change.
    Error,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Fresh => "fresh",
            EntryStatus::CachedHit => "cached_hit",
            EntryStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "fresh" => EntryStatus::Fresh,
            "cached_hit" => EntryStatus::CachedHit,
            _ => EntryStatus::Error,
        }
    }
}

/// A cached page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    /// SHA-256 hex digest of the canonicalized URL.
    pub address: String,
    pub url: String,
    /// Raw fetched bytes; absent for entries without a body.
    pub raw_content: Option<Vec<u8>>,
    /// RFC 3339 UTC timestamp of the fetch that produced this entry.
    pub fetched_at: String,
    pub status: EntryStatus,
    pub size_bytes: i64,
}

impl PageEntry {
    /// Build a fresh entry for a successfully fetched body.
    pub fn fresh(url: &str, body: Vec<u8>) -> Self {
        Self {
            address: content_address(url),
            url: url.to_string(),
            size_bytes: body.len() as i64,
            raw_content: Some(body),
            fetched_at: Utc::now().to_rfc3339(),
            status: EntryStatus::Fresh,
        }
    }

    /// True while the entry's age is below `max_age`.
    ///
    /// An unparseable timestamp counts as stale, which forces a re-fetch
    /// rather than serving an entry of unknown age.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        DateTime::parse_from_rfc3339(&self.fetched_at)
            .map(|t| Utc::now().signed_duration_since(t.with_timezone(&Utc)) < max_age)
            .unwrap_or(false)
    }
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entry_count: i64,
    pub total_bytes: i64,
    pub oldest: Option<String>,
    pub newest: Option<String>,
}

impl PageStore {
    /// Insert or replace the entry at its content address.
    pub async fn upsert_entry(&self, entry: &PageEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO pages (address, url, raw_content, fetched_at, status, size_bytes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(address) DO UPDATE SET
                         url = excluded.url,
                         raw_content = excluded.raw_content,
                         fetched_at = excluded.fetched_at,
                         status = excluded.status,
                         size_bytes = excluded.size_bytes",
                    params![
                        &entry.address,
                        &entry.url,
                        &entry.raw_content,
                        &entry.fetched_at,
                        entry.status.as_str(),
                        entry.size_bytes,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Point lookup by content address. Never touches the network.
    pub async fn get_entry(&self, address: &str) -> Result<Option<PageEntry>, Error> {
        let address = address.to_string();
        self.conn
            .call(move |conn| -> Result<Option<PageEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT address, url, raw_content, fetched_at, status, size_bytes
                     FROM pages WHERE address = ?1",
                )?;

                let result = stmt.query_row(params![address], |row| {
                    Ok(PageEntry {
                        address: row.get(0)?,
                        url: row.get(1)?,
                        raw_content: row.get(2)?,
                        fetched_at: row.get(3)?,
                        status: EntryStatus::parse(&row.get::<_, String>(4)?),
                        size_bytes: row.get(5)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Record that an entry was served from the cache. Leaves the body
    /// and fetch timestamp untouched.
    pub async fn mark_cached_hit(&self, address: &str) -> Result<(), Error> {
        let address = address.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE pages SET status = ?1 WHERE address = ?2 AND status != ?3",
                    params![EntryStatus::CachedHit.as_str(), address, EntryStatus::Error.as_str()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries fetched more than `older_than_days` days ago.
    ///
    /// Returns the number of deleted entries. RFC 3339 UTC timestamps
    /// compare correctly as strings.
    pub async fn clean(&self, older_than_days: i64) -> Result<u64, Error> {
        let cutoff = (Utc::now() - Duration::days(older_than_days)).to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM pages WHERE fetched_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Aggregate statistics over the whole cache.
    pub async fn stats(&self) -> Result<CacheStats, Error> {
        self.conn
            .call(|conn| -> Result<CacheStats, Error> {
                let stats = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0), MIN(fetched_at), MAX(fetched_at)
                     FROM pages",
                    [],
                    |row| {
                        Ok(CacheStats {
                            entry_count: row.get(0)?,
                            total_bytes: row.get(1)?,
                            oldest: row.get(2)?,
                            newest: row.get(3)?,
                        })
                    },
                )?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_age(url: &str, age_days: i64) -> PageEntry {
        let mut entry = PageEntry::fresh(url, b"<html>cached page body</html>".to_vec());
        entry.fetched_at = (Utc::now() - Duration::days(age_days)).to_rfc3339();
        entry
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = PageStore::open_in_memory().await.unwrap();
        let entry = PageEntry::fresh("https://example.com/", b"<html>hello</html>".to_vec());

        store.upsert_entry(&entry).await.unwrap();

        let retrieved = store.get_entry(&entry.address).await.unwrap().unwrap();
        assert_eq!(retrieved, entry);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = PageStore::open_in_memory().await.unwrap();
        let result = store.get_entry("nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_prior_entry() {
        let store = PageStore::open_in_memory().await.unwrap();
        let first = PageEntry::fresh("https://example.com/", b"old body".to_vec());
        store.upsert_entry(&first).await.unwrap();

        let second = PageEntry::fresh("https://example.com/", b"new body, somewhat longer".to_vec());
        store.upsert_entry(&second).await.unwrap();

        let retrieved = store.get_entry(&first.address).await.unwrap().unwrap();
        assert_eq!(retrieved.raw_content.as_deref(), Some(&b"new body, somewhat longer"[..]));

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_is_fresh_boundaries() {
        let fresh = PageEntry::fresh("https://example.com/", b"body".to_vec());
        assert!(fresh.is_fresh(Duration::hours(1)));

        let stale = entry_with_age("https://example.com/old", 2);
        assert!(!stale.is_fresh(Duration::hours(24)));
        assert!(stale.is_fresh(Duration::days(3)));
    }

    #[tokio::test]
    async fn test_is_fresh_bad_timestamp() {
        let mut entry = PageEntry::fresh("https://example.com/", b"body".to_vec());
        entry.fetched_at = "not a timestamp".to_string();
        assert!(!entry.is_fresh(Duration::days(365)));
    }

    #[tokio::test]
    async fn test_clean_removes_only_old_entries() {
        let store = PageStore::open_in_memory().await.unwrap();
        store.upsert_entry(&entry_with_age("https://example.com/old", 40)).await.unwrap();
        store.upsert_entry(&entry_with_age("https://example.com/mid", 31)).await.unwrap();
        store.upsert_entry(&entry_with_age("https://example.com/new", 2)).await.unwrap();

        let removed = store.clean(30).await.unwrap();
        assert_eq!(removed, 2);

        let kept = store
            .get_entry(&content_address("https://example.com/new"))
            .await
            .unwrap()
            .unwrap();
        assert!(kept.raw_content.is_some());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_stats_empty_cache() {
        let store = PageStore::open_in_memory().await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.total_bytes, 0);
        assert!(stats.oldest.is_none());
        assert!(stats.newest.is_none());
    }

    #[tokio::test]
    async fn test_stats_totals() {
        let store = PageStore::open_in_memory().await.unwrap();
        let a = PageEntry::fresh("https://example.com/a", vec![0u8; 100]);
        let b = PageEntry::fresh("https://example.com/b", vec![0u8; 250]);
        store.upsert_entry(&a).await.unwrap();
        store.upsert_entry(&b).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.total_bytes, 350);
        assert!(stats.oldest.is_some());
        assert!(stats.newest.is_some());
    }

    #[tokio::test]
    async fn test_mark_cached_hit() {
        let store = PageStore::open_in_memory().await.unwrap();
        let entry = PageEntry::fresh("https://example.com/", b"body".to_vec());
        store.upsert_entry(&entry).await.unwrap();

        store.mark_cached_hit(&entry.address).await.unwrap();

        let retrieved = store.get_entry(&entry.address).await.unwrap().unwrap();
        assert_eq!(retrieved.status, EntryStatus::CachedHit);
        assert_eq!(retrieved.fetched_at, entry.fetched_at);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [EntryStatus::Fresh, EntryStatus::CachedHit, EntryStatus::Error] {
            assert_eq!(EntryStatus::parse(status.as_str()), status);
        }
        assert_eq!(EntryStatus::parse("garbage"), EntryStatus::Error);
    }
}
