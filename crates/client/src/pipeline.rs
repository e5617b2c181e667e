//! The fetch/cache/search pipeline.
//!
//! Joins the page store, fetch pool, extractor, and matcher, then
//! aggregates per-URL outcomes into match records ordered by visit
//! recency. Partial failure is the expected common case: per-URL
//! problems are tallied, never fatal. Only an unusable configuration or
//! a batch with no content at all terminates early.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use webtrail_core::cache::content_address;
use webtrail_core::matcher::KeywordQuery;
use webtrail_core::model::{HistoryRecord, MatchRecord};
use webtrail_core::{EntryStatus, Error, PageEntry, PageStore};

use crate::extract::{ExtractConfig, extract_text};
use crate::fetch::{FetchPool, canonicalize};

/// Tunables for one search run.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Entries older than this are re-fetched (unless cache-only).
    pub cache_max_age: chrono::Duration,
    /// Serve stale entries and never touch the network.
    pub cache_only: bool,
    /// Re-fetch every URL even when a fresh entry exists.
    pub force_refresh: bool,
    /// Characters of context captured on each side of a match.
    pub context_window: usize,
    pub extract: ExtractConfig,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            cache_max_age: chrono::Duration::hours(24),
            cache_only: false,
            force_refresh: false,
            context_window: 100,
            extract: ExtractConfig::default(),
        }
    }
}

/// Per-run tallies surfaced to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Distinct URLs after canonicalization and dedupe.
    pub attempted: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    pub failed: usize,
    pub matched: usize,
}

/// Everything a search run produces.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Match records ordered by visit timestamp descending.
    pub matches: Vec<MatchRecord>,
    pub summary: RunSummary,
}

/// Run the full pipeline over one history batch.
///
/// # Errors
///
/// Returns `Error::InvalidInput` for an empty batch and
/// `Error::NoContent` when nothing was fetched and nothing usable was
/// cached. Database failures are fatal; per-URL fetch and extraction
/// failures are not.
pub async fn run_search(
    store: &PageStore, pool: &FetchPool, records: &[HistoryRecord], query: &KeywordQuery, opts: &SearchOptions,
) -> Result<SearchOutcome, Error> {
    if records.is_empty() {
        return Err(Error::InvalidInput("history batch is empty".into()));
    }

    // Dedupe by canonical URL; the first record wins, which is the most
    // recent visit given the source's ordering.
    let mut canonical: Vec<(String, &HistoryRecord)> = Vec::new();
    let mut seen = HashSet::new();
    for record in records {
        match canonicalize(&record.url) {
            Ok(url) => {
                let url = url.to_string();
                if seen.insert(url.clone()) {
                    canonical.push((url, record));
                }
            }
            Err(e) => tracing::debug!("skipping unparseable history url {}: {e}", record.url),
        }
    }

    if canonical.is_empty() {
        return Err(Error::InvalidInput("no usable URLs in history batch".into()));
    }

    let mut summary = RunSummary { attempted: canonical.len(), ..Default::default() };

    // Partition into usable cache entries and URLs for the pool.
    let mut ready: Vec<(String, PageEntry)> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    for (url, _) in &canonical {
        match store.get_entry(&content_address(url)).await? {
            Some(entry) if usable(&entry, opts) => {
                store.mark_cached_hit(&entry.address).await?;
                summary.cache_hits += 1;
                ready.push((url.clone(), entry));
            }
            _ => missing.push(url.clone()),
        }
    }

    if opts.cache_only {
        // Nothing to fetch; URLs without a usable entry stay excluded.
        summary.failed += missing.len();
    } else {
        for outcome in pool.fetch_missing(missing).await {
            match outcome.result {
                Ok(_) => {
                    summary.fetched += 1;
                    if let Some(entry) = store.get_entry(&content_address(&outcome.url)).await? {
                        ready.push((outcome.url, entry));
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::debug!("fetch failed for {}: {e}", outcome.url);
                }
            }
        }
    }

    if ready.is_empty() {
        return Err(Error::NoContent(format!(
            "0 fetched, 0 cached out of {} URLs",
            summary.attempted
        )));
    }

    // Extract, match, and join with history metadata.
    let meta: HashMap<&str, &HistoryRecord> = canonical.iter().map(|(u, r)| (u.as_str(), *r)).collect();
    let mut matches = Vec::new();
    for (url, entry) in &ready {
        if entry.status == EntryStatus::Error {
            continue;
        }
        let Some(body) = entry.raw_content.as_deref() else {
            continue;
        };
        let Some(extracted) = extract_text(body, &opts.extract) else {
            continue;
        };
        let Some(result) = query.matches(&extracted.text, opts.context_window) else {
            continue;
        };
        let Some(record) = meta.get(url.as_str()) else {
            continue;
        };

        summary.matched += 1;
        matches.push(MatchRecord {
            url: record.url.clone(),
            title: record.title.clone(),
            timestamp: record.visited_at,
            date: MatchRecord::format_date(record.visited_at),
            match_count: result.match_count,
            contexts: result.contexts,
        });
    }

    // Most recent visit first; sort_by is stable so ties keep input order.
    matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(SearchOutcome { matches, summary })
}

fn usable(entry: &PageEntry, opts: &SearchOptions) -> bool {
    if opts.force_refresh {
        return false;
    }
    if entry.status == EntryStatus::Error || entry.raw_content.is_none() {
        return false;
    }
    opts.cache_only || entry.is_fresh(opts.cache_max_age)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchClient, FetchConfig};
    use crate::testutil::spawn_http_server;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use webtrail_core::MatchMode;

    const BODY: &str = "<html><body>The quick brown fox jumps over the lazy dog, repeatedly and at length.</body></html>";

    fn query(terms: &[&str], mode: MatchMode) -> KeywordQuery {
        let terms: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
        KeywordQuery::new(&terms, mode).unwrap()
    }

    fn record(url: &str, title: &str, visited_at: i64) -> HistoryRecord {
        HistoryRecord { url: url.to_string(), title: title.to_string(), visited_at }
    }

    async fn test_pool(store: &PageStore) -> FetchPool {
        let client = FetchClient::new(FetchConfig {
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap();
        FetchPool::new(client, store.clone(), 4, Duration::ZERO).unwrap()
    }

    fn seeded_entry(url: &str, body: &str) -> PageEntry {
        PageEntry::fresh(&canonicalize(url).unwrap().to_string(), body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let store = PageStore::open_in_memory().await.unwrap();
        let pool = test_pool(&store).await;
        let q = query(&["fox"], MatchMode::All);

        let result = run_search(&store, &pool, &[], &q, &SearchOptions::default()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_no_content_is_fatal() {
        let store = PageStore::open_in_memory().await.unwrap();
        let pool = test_pool(&store).await;
        let q = query(&["fox"], MatchMode::All);
        let records = vec![record("https://example.com/missing", "Missing", 1)];

        let opts = SearchOptions { cache_only: true, ..Default::default() };
        let result = run_search(&store, &pool, &records, &q, &opts).await;
        assert!(matches!(result, Err(Error::NoContent(_))));
    }

    #[tokio::test]
    async fn test_fetch_then_match() {
        let (addr, stats) = spawn_http_server(BODY, Duration::ZERO).await;
        let store = PageStore::open_in_memory().await.unwrap();
        let pool = test_pool(&store).await;
        let q = query(&["quick", "lazy"], MatchMode::All);

        let records = vec![record(&format!("http://{addr}/fox"), "Fox Page", 42)];
        let outcome = run_search(&store, &pool, &records, &q, &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(stats.requests.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.summary.fetched, 1);
        assert_eq!(outcome.summary.cache_hits, 0);
        assert_eq!(outcome.summary.matched, 1);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].title, "Fox Page");
        assert_eq!(outcome.matches[0].match_count, 2);
        assert_eq!(outcome.matches[0].contexts.len(), 2);
    }

    #[tokio::test]
    async fn test_second_run_hits_cache() {
        let (addr, stats) = spawn_http_server(BODY, Duration::ZERO).await;
        let store = PageStore::open_in_memory().await.unwrap();
        let pool = test_pool(&store).await;
        let q = query(&["fox"], MatchMode::All);

        let records = vec![
            record(&format!("http://{addr}/a"), "A", 2),
            record(&format!("http://{addr}/b"), "B", 1),
        ];

        let first = run_search(&store, &pool, &records, &q, &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(first.summary.fetched, 2);
        assert_eq!(stats.requests.load(Ordering::SeqCst), 2);

        let second = run_search(&store, &pool, &records, &q, &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(second.summary.cache_hits, 2);
        assert_eq!(second.summary.fetched, 0);
        // The cache-hit invariant: no further network traffic.
        assert_eq!(stats.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_duplicate_urls_fetch_once() {
        let (addr, stats) = spawn_http_server(BODY, Duration::ZERO).await;
        let store = PageStore::open_in_memory().await.unwrap();
        let pool = test_pool(&store).await;
        let q = query(&["fox"], MatchMode::All);

        let url = format!("http://{addr}/same");
        let records = vec![record(&url, "First", 9), record(&url, "Second", 3)];

        let outcome = run_search(&store, &pool, &records, &q, &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(stats.requests.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.summary.attempted, 1);
        assert_eq!(outcome.matches.len(), 1);
        // First record wins: it is the most recent visit.
        assert_eq!(outcome.matches[0].title, "First");
        assert_eq!(outcome.matches[0].timestamp, 9);
    }

    #[tokio::test]
    async fn test_force_refresh_refetches() {
        let (addr, stats) = spawn_http_server(BODY, Duration::ZERO).await;
        let store = PageStore::open_in_memory().await.unwrap();
        let pool = test_pool(&store).await;
        let q = query(&["fox"], MatchMode::All);
        let records = vec![record(&format!("http://{addr}/page"), "Page", 1)];

        run_search(&store, &pool, &records, &q, &SearchOptions::default())
            .await
            .unwrap();
        let opts = SearchOptions { force_refresh: true, ..Default::default() };
        let outcome = run_search(&store, &pool, &records, &q, &opts).await.unwrap();

        assert_eq!(outcome.summary.cache_hits, 0);
        assert_eq!(outcome.summary.fetched, 1);
        assert_eq!(stats.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_only_accepts_stale_entries() {
        let store = PageStore::open_in_memory().await.unwrap();
        let pool = test_pool(&store).await;
        let q = query(&["cached"], MatchMode::All);

        let url = "https://example.com/stale";
        let mut entry = seeded_entry(url, "<p>an old but cached page body with the word cached in it</p>");
        entry.fetched_at = (chrono::Utc::now() - chrono::Duration::days(30)).to_rfc3339();
        store.upsert_entry(&entry).await.unwrap();

        let records = vec![record(url, "Stale", 5)];
        let opts = SearchOptions { cache_only: true, ..Default::default() };
        let outcome = run_search(&store, &pool, &records, &q, &opts).await.unwrap();

        assert_eq!(outcome.summary.cache_hits, 1);
        assert_eq!(outcome.summary.fetched, 0);
        assert_eq!(outcome.matches.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_extraction_excluded_silently() {
        let store = PageStore::open_in_memory().await.unwrap();
        let pool = test_pool(&store).await;
        let q = query(&["tiny"], MatchMode::All);

        let url = "https://example.com/tiny";
        store.upsert_entry(&seeded_entry(url, "<p>tiny</p>")).await.unwrap();

        let records = vec![record(url, "Tiny", 5)];
        let opts = SearchOptions { cache_only: true, ..Default::default() };
        let outcome = run_search(&store, &pool, &records, &q, &opts).await.unwrap();

        assert_eq!(outcome.summary.cache_hits, 1);
        assert_eq!(outcome.summary.matched, 0);
        assert!(outcome.matches.is_empty());
    }

    #[tokio::test]
    async fn test_results_ordered_by_visit_recency() {
        let store = PageStore::open_in_memory().await.unwrap();
        let pool = test_pool(&store).await;
        let q = query(&["shared"], MatchMode::All);

        let body = "<p>every page in this test mentions the shared keyword somewhere</p>";
        // T3 > T1 > T2; expected output order is [T3, T1, T2].
        let (t3, t1, t2) = (3_000_000i64, 2_000_000i64, 1_000_000i64);
        let mut records = Vec::new();
        for (path, ts) in [("one", t1), ("two", t2), ("three", t3)] {
            let url = format!("https://example.com/{path}");
            store.upsert_entry(&seeded_entry(&url, body)).await.unwrap();
            records.push(record(&url, path, ts));
        }

        let opts = SearchOptions { cache_only: true, ..Default::default() };
        let outcome = run_search(&store, &pool, &records, &q, &opts).await.unwrap();

        let order: Vec<i64> = outcome.matches.iter().map(|m| m.timestamp).collect();
        assert_eq!(order, vec![t3, t1, t2]);
    }

    #[test]
    fn test_summary_serializes_for_callers() {
        let summary = RunSummary { attempted: 4, cache_hits: 2, fetched: 1, failed: 1, matched: 2 };
        let value = serde_json::to_value(summary).unwrap();
        assert_eq!(value["attempted"], 4);
        assert_eq!(value["cache_hits"], 2);
        assert_eq!(value["failed"], 1);
    }

    #[tokio::test]
    async fn test_partial_failure_not_fatal() {
        let (addr, _stats) = spawn_http_server(BODY, Duration::ZERO).await;
        let store = PageStore::open_in_memory().await.unwrap();
        let pool = test_pool(&store).await;
        let q = query(&["fox"], MatchMode::All);

        // One reachable URL, one pointing at a dead port.
        let dead = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = dead.local_addr().unwrap();
        drop(dead);

        let records = vec![
            record(&format!("http://{addr}/ok"), "Ok", 2),
            record(&format!("http://{dead_addr}/dead"), "Dead", 1),
        ];

        let outcome = run_search(&store, &pool, &records, &q, &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.summary.fetched, 1);
        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].title, "Ok");
    }
}
