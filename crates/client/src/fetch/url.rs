//! URL canonicalization for consistent cache addressing.
//!
//! The canonical form feeds the content address, so this normalization
//! determines cache-hit rates. Steps, fixed and documented:
//!
//! 1. Trim leading/trailing whitespace
//! 2. Default the scheme to https:// if missing
//! 3. Lowercase the host
//! 4. Remove the fragment (#...)
//! 5. Keep the query string intact (do not reorder)

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let lowered = parsed.host_str().map(|h| h.to_ascii_lowercase());
    if let Some(host) = lowered {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
