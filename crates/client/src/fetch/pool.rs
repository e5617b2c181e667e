//! Bounded-concurrency retrieval of cache misses.
//!
//! The pool enforces one global in-flight cap across the batch (not
//! per-host): semaphore permits are acquired before spawning and held
//! for the task's whole duration. A fixed pacing delay separates
//! dispatches without consuming a permit or blocking in-flight work.
//! An abort signal stops dispatching promptly and hard-aborts whatever
//! is still in flight; aborted URLs surface as failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;

use webtrail_core::{Error, PageEntry, PageStore};

use super::FetchClient;

/// Outcome of one URL's trip through the pool.
///
/// Results come back in completion order, so the originating URL rides
/// along with each outcome.
#[derive(Debug)]
pub struct FetchOutcome {
    pub url: String,
    /// Bytes written to the cache on success.
    pub result: Result<usize, Error>,
}

/// Triggers a pool stop from another task (e.g. a Ctrl-C handler).
#[derive(Clone)]
pub struct AbortHandle(Arc<watch::Sender<bool>>);

impl AbortHandle {
    pub fn abort(&self) {
        let _ = self.0.send(true);
    }
}

/// Bounded worker pool writing successful fetches into the cache.
pub struct FetchPool {
    client: FetchClient,
    store: PageStore,
    concurrency: usize,
    pacing: Duration,
    abort_tx: Arc<watch::Sender<bool>>,
    abort_rx: watch::Receiver<bool>,
}

impl FetchPool {
    /// # Errors
    ///
    /// Rejects a zero concurrency limit before any work starts.
    pub fn new(
        client: FetchClient, store: PageStore, concurrency: usize, pacing: Duration,
    ) -> Result<Self, Error> {
        if concurrency == 0 {
            return Err(Error::InvalidInput("concurrency must be at least 1".into()));
        }

        let (abort_tx, abort_rx) = watch::channel(false);
        Ok(Self {
            client,
            store,
            concurrency,
            pacing,
            abort_tx: Arc::new(abort_tx),
            abort_rx,
        })
    }

    /// Handle for stopping the pool from another task.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(self.abort_tx.clone())
    }

    /// Fetch every URL with at most `concurrency` in flight, upserting
    /// successes into the cache. Failed URLs are not written, so a later
    /// run retries them.
    ///
    /// Callers pass canonicalized URLs already filtered to cache misses;
    /// URLs with a fresh entry must never reach the pool. The returned
    /// outcomes are in completion order, one per input URL.
    pub async fn fetch_missing(&self, urls: Vec<String>) -> Vec<FetchOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, String> = HashMap::new();
        let mut outcomes = Vec::with_capacity(urls.len());
        let mut abort_rx = self.abort_rx.clone();
        let total = urls.len();

        for (i, url) in urls.into_iter().enumerate() {
            if *abort_rx.borrow() {
                outcomes.push(FetchOutcome { url, result: Err(Error::Aborted) });
                continue;
            }

            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => {
                    permit.expect("pool semaphore closed")
                }
                _ = abort_rx.wait_for(|&stop| stop) => {
                    outcomes.push(FetchOutcome { url, result: Err(Error::Aborted) });
                    continue;
                }
            };

            let client = self.client.clone();
            let store = self.store.clone();
            let task_url = url.clone();
            let handle = join_set.spawn(async move {
                // Hold the permit for the task duration to enforce the
                // in-flight cap.
                let _permit = permit;
                let result = fetch_one(&client, &store, &task_url).await;
                FetchOutcome { url: task_url, result }
            });
            in_flight.insert(handle.id(), url);

            if !self.pacing.is_zero() && i + 1 < total {
                tokio::time::sleep(self.pacing).await;
            }
        }

        let mut aborted = *abort_rx.borrow();
        if aborted {
            join_set.shutdown().await;
        }

        loop {
            tokio::select! {
                joined = join_set.join_next_with_id() => match joined {
                    None => break,
                    Some(Ok((id, outcome))) => {
                        in_flight.remove(&id);
                        outcomes.push(outcome);
                    }
                    Some(Err(err)) => {
                        if let Some(url) = in_flight.remove(&err.id()) {
                            outcomes.push(FetchOutcome { url, result: Err(Error::Aborted) });
                        }
                    }
                },
                _ = abort_rx.wait_for(|&stop| stop), if !aborted => {
                    aborted = true;
                    join_set.shutdown().await;
                }
            }
        }

        // Tasks killed by shutdown never reach join_next; their URLs are
        // still owed an outcome.
        for (_, url) in in_flight.drain() {
            outcomes.push(FetchOutcome { url, result: Err(Error::Aborted) });
        }

        outcomes
    }
}

async fn fetch_one(client: &FetchClient, store: &PageStore, url: &str) -> Result<usize, Error> {
    let parsed = reqwest::Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let response = client.fetch(&parsed).await?;
    let size = response.body.len();

    let entry = PageEntry::fresh(url, response.body);
    store.upsert_entry(&entry).await?;

    Ok(size)
}
