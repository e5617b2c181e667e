//! Read-only queries against browser history databases.
//!
//! The live database may be locked by a running browser, so each source
//! is copied to a temporary file first and the copy queried instead.

use chrono::Utc;
use tokio_rusqlite::{Connection, params};

use webtrail_core::{Error, HistoryRecord};

use crate::sources::{Browser, HistorySource};

/// Offset between the Windows FILETIME epoch (1601-01-01) and the Unix
/// epoch, in microseconds. Chrome stores visit times on the former.
const CHROME_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600 * 1_000_000;

const FIREFOX_QUERY: &str = "SELECT p.url, p.title, v.visit_date
    FROM moz_historyvisits v JOIN moz_places p ON v.place_id = p.id
    WHERE v.visit_date >= ?1 AND p.url LIKE 'http%'
    ORDER BY v.visit_date DESC";

const CHROME_QUERY: &str = "SELECT u.url, u.title, v.visit_time
    FROM visits v JOIN urls u ON v.url = u.id
    WHERE v.visit_time >= ?1 AND u.url LIKE 'http%'
    ORDER BY v.visit_time DESC";

/// Load visits from one source within the last `days_back` days,
/// most recent first. Visit times are normalized to Unix microseconds.
pub async fn load_visits(source: &HistorySource, days_back: i64) -> Result<Vec<HistoryRecord>, Error> {
    let copy = tempfile::NamedTempFile::new().map_err(|e| Error::HistorySource(e.to_string()))?;
    std::fs::copy(&source.db_path, copy.path())
        .map_err(|e| Error::HistorySource(format!("copying {}: {e}", source.db_path.display())))?;

    let conn = Connection::open(copy.path())
        .await
        .map_err(|e| Error::Database(e.into()))?;

    let cutoff_unix = (Utc::now() - chrono::Duration::days(days_back)).timestamp_micros();
    let browser = source.browser;

    let records = conn
        .call(move |conn| -> Result<Vec<HistoryRecord>, Error> {
            let (sql, cutoff) = match browser {
                Browser::Firefox => (FIREFOX_QUERY, cutoff_unix),
                Browser::Chrome | Browser::Chromium => (CHROME_QUERY, cutoff_unix + CHROME_EPOCH_OFFSET_MICROS),
            };

            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params![cutoff], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (url, title, visit_time) = row?;
                let visited_at = match browser {
                    Browser::Firefox => visit_time,
                    Browser::Chrome | Browser::Chromium => visit_time - CHROME_EPOCH_OFFSET_MICROS,
                };
                records.push(HistoryRecord { url, title: title.unwrap_or_default(), visited_at });
            }
            Ok(records)
        })
        .await
        .map_err(Error::from)?;

    tracing::debug!(
        "loaded {} visits from {}",
        records.len(),
        source.db_path.display()
    );

    Ok(records)
}

/// Load and merge visits from every source, most recent first.
///
/// A source that fails to open or query degrades to a warning so the
/// remaining sources still contribute.
///
/// # Errors
///
/// Returns `Error::HistorySource` when no sources were supplied at all.
pub async fn load_all(sources: &[HistorySource], days_back: i64) -> Result<Vec<HistoryRecord>, Error> {
    if sources.is_empty() {
        return Err(Error::HistorySource("no browser history databases found".into()));
    }

    let mut records = Vec::new();
    for source in sources {
        match load_visits(source, days_back).await {
            Ok(mut batch) => records.append(&mut batch),
            Err(e) => tracing::warn!("skipping {}: {e}", source.db_path.display()),
        }
    }

    records.sort_by(|a, b| b.visited_at.cmp(&a.visited_at));
    Ok(records)
}
