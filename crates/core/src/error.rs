//! Unified error types for webtrail.
//!
//! Transient per-URL fetch failures are modeled here too; callers use
//! [`Error::is_transient`] to tell them apart from batch-fatal classes.

use tokio_rusqlite::rusqlite;

/// Unified error type shared across the webtrail crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty URL batch).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Keyword query failed validation.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Database operation failed.
    #[error("cache error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("cache error: migration failed: {0}")]
    MigrationFailed(String),

    /// URL could not be canonicalized.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Request exceeded the configured timeout.
    #[error("fetch timeout: {0}")]
    Timeout(String),

    /// Response body exceeded the configured size ceiling.
    #[error("response too large: {0}")]
    TooLarge(String),

    /// Connection or protocol failure.
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-success final status.
    #[error("http status {0}")]
    HttpStatus(u16),

    /// Fetch was aborted before completion.
    #[error("fetch aborted")]
    Aborted,

    /// Nothing was fetched and nothing usable was cached.
    #[error("no content available: {0}")]
    NoContent(String),

    /// Browser history database could not be read.
    #[error("history source error: {0}")]
    HistorySource(String),
}

impl Error {
    /// True for per-URL failures that exclude one document without
    /// aborting the batch.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::TooLarge(_) | Error::Network(_) | Error::HttpStatus(_) | Error::Aborted
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoContent("0 fetched, 0 cached".to_string());
        assert!(err.to_string().contains("no content available"));
        assert!(err.to_string().contains("0 fetched"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Timeout("20s".into()).is_transient());
        assert!(Error::HttpStatus(503).is_transient());
        assert!(Error::Aborted.is_transient());
        assert!(!Error::InvalidQuery("empty".into()).is_transient());
        assert!(!Error::NoContent("nothing".into()).is_transient());
    }
}
