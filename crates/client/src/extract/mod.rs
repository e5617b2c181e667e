//! Plain-text approximation of fetched markup.
//!
//! Deliberately not DOM-aware. Script, style, and comment blocks are
//! removed before the remaining tags are stripped; doing it the other
//! way around would leave their bodies behind as fake prose. Entities
//! are then decoded and whitespace collapsed, and the result is bounded
//! on both ends: too little text is a failed extraction, too much is
//! hard-truncated.

mod entities;

use std::sync::LazyLock;

use regex::Regex;

pub use entities::decode_entities;

/// Bounds applied during extraction.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Results shorter than this are rejected as failed extractions
    /// (default: 50 characters).
    pub min_length: usize,
    /// Hard cut applied after cleanup, not word-boundary aware
    /// (default: 10,000 characters).
    pub max_length: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { min_length: 50, max_length: 10_000 }
    }
}

/// Text extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Character count of `text`.
    pub length: usize,
}

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script pattern"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style pattern"));
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("tag pattern"));

/// Extract a length-bounded plain-text approximation of `raw`.
///
/// Returns `None` when the cleaned text falls below the minimum length —
/// a failed extraction, not an error.
pub fn extract_text(raw: &[u8], config: &ExtractConfig) -> Option<ExtractedText> {
    let html = String::from_utf8_lossy(raw);

    let text = SCRIPT_RE.replace_all(&html, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    let text = COMMENT_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.chars().count() < config.min_length {
        return None;
    }

    let text = truncate_chars(text, config.max_length);
    let length = text.chars().count();

    Some(ExtractedText { text, length })
}

fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
    s
}
