//! Content-addressed cache key derivation.

use sha2::{Digest, Sha256};

/// Derive the cache address for a canonicalized URL.
///
/// Pure function of the URL string: the same URL maps to the same slot
/// on every run and across processes, which is what makes the cache
/// effective across invocations. Callers pass the canonical form (see
/// the client crate's URL handling) so trivially different spellings of
/// one page share an address. Collisions are treated as cache hits, an
/// accepted risk at 256-bit strength.
pub fn content_address(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
