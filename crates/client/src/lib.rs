//! Fetch, extraction, and pipeline stages for webtrail.
//!
//! This crate provides the HTTP fetch client with its bounded-concurrency
//! pool, the tag-stripping text extractor, and the pipeline that joins
//! cache, fetcher, and matcher into ordered search results.

pub mod extract;
pub mod fetch;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod testutil;

pub use extract::{ExtractConfig, ExtractedText, extract_text};
pub use fetch::{AbortHandle, FetchClient, FetchConfig, FetchOutcome, FetchPool, FetchResponse, canonicalize};
pub use pipeline::{RunSummary, SearchOptions, SearchOutcome, run_search};
