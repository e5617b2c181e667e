//! SQLite-backed content-addressed page cache.
//!
//! This module provides a persistent cache keyed by the SHA-256 address
//! of a canonicalized URL, with async access via tokio-rusqlite. It
//! supports:
//!
//! - Point lookup and atomic upsert per address
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Age-based cleanup and aggregate statistics

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::PageStore;
pub use entries::{CacheStats, EntryStatus, PageEntry};
pub use hash::content_address;
