//! HTTP retrieval of history pages.
//!
//! ### URL canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments, preserve query string
//!
//! ### Resource ceilings
//! - Per-request timeout covering connect and body transfer
//! - Body bytes capped while streaming; oversize aborts the request
//! - Max redirects: 5
//!
//! All per-request failures collapse into the transient error class;
//! downstream only distinguishes success from failure.

pub mod pool;
pub mod url;

use bytes::BytesMut;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use pool::{AbortHandle, FetchOutcome, FetchPool};
pub use url::{UrlError, canonicalize};

use webtrail_core::Error;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "webtrail/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "webtrail/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// Response from a completed fetch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: reqwest::Url,
    /// The final URL after redirects
    pub final_url: reqwest::Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub body: Vec<u8>,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// HTTP client enforcing the configured ceilings.
#[derive(Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Fetch a canonicalized URL, streaming the body under the byte
    /// ceiling.
    ///
    /// A Content-Length above the ceiling is rejected before reading;
    /// chunked bodies are aborted the moment the accumulated size
    /// crosses it, discarding the partial data.
    pub async fn fetch(&self, url: &reqwest::Url) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let mut response = self
            .http
            .get(url.as_str())
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(Error::HttpStatus(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::TooLarge(format!("{len} bytes exceeds {}", self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(Error::TooLarge(format!("body exceeds {} bytes", self.config.max_bytes)));
            }
            body.extend_from_slice(&chunk);
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            final_url,
            fetch_ms,
            body.len()
        );

        Ok(FetchResponse {
            url: url.clone(),
            final_url,
            status,
            content_type,
            body: body.to_vec(),
            fetch_ms,
        })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn classify(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}
