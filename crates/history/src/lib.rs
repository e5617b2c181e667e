//! Browser history discovery and querying for webtrail.
//!
//! This crate finds history databases in the fixed per-browser profile
//! layouts and reads recent visits out of them, producing the record
//! stream the pipeline consumes.

pub mod query;
pub mod sources;

pub use query::{load_all, load_visits};
pub use sources::{Browser, HistorySource, discover};
