//! Core types and shared functionality for webtrail.
//!
//! This crate provides:
//! - Content-addressed page cache with SQLite backend
//! - Keyword matching over extracted page text
//! - Unified error types and configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod matcher;
pub mod model;

pub use cache::{CacheStats, EntryStatus, PageEntry, PageStore};
pub use config::AppConfig;
pub use error::Error;
pub use matcher::{KeywordQuery, MatchMode, MatchResult};
pub use model::{HistoryRecord, MatchRecord};
