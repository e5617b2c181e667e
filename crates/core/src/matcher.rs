//! Keyword matching over extracted page text.
//!
//! Terms are matched as case-insensitive substrings (no word boundaries)
//! via escaped regex patterns compiled once per query. Context snippets
//! surround the first occurrence of each term.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Conjunctive vs disjunctive keyword predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every term must appear at least once.
    All,
    /// At least one term must appear.
    Any,
}

/// A validated multi-keyword query.
///
/// Construction trims each term and rejects an empty term list, so a
/// query in hand is always runnable. A one-term query behaves
/// identically under both modes.
#[derive(Debug, Clone)]
pub struct KeywordQuery {
    terms: Vec<String>,
    mode: MatchMode,
    patterns: Vec<Regex>,
}

/// Outcome of a document that satisfied the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Occurrences summed across all terms, counted independently per
    /// term and not deduplicated across terms.
    pub match_count: usize,
    /// One whitespace-normalized snippet per term that occurred, in
    /// query order; may be shorter than the term list.
    pub contexts: Vec<String>,
}

impl KeywordQuery {
    /// Build a query from raw terms.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuery` when no non-blank terms remain
    /// after trimming.
    pub fn new(terms: &[String], mode: MatchMode) -> Result<Self, Error> {
        let terms: Vec<String> = terms
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if terms.is_empty() {
            return Err(Error::InvalidQuery("keyword list is empty".to_string()));
        }

        let patterns = terms
            .iter()
            .map(|t| {
                RegexBuilder::new(&regex::escape(t))
                    .case_insensitive(true)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidQuery(e.to_string()))?;

        Ok(Self { terms, mode, patterns })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Evaluate the query against a document's text.
    ///
    /// Returns `None` when the document does not satisfy the mode
    /// predicate.
    pub fn matches(&self, text: &str, context_window: usize) -> Option<MatchResult> {
        let mut match_count = 0usize;
        let mut terms_hit = 0usize;
        let mut contexts = Vec::new();

        for pattern in &self.patterns {
            let mut first: Option<(usize, usize)> = None;
            let mut count = 0usize;
            for m in pattern.find_iter(text) {
                if first.is_none() {
                    first = Some((m.start(), m.end()));
                }
                count += 1;
            }

            if let Some((start, end)) = first {
                terms_hit += 1;
                match_count += count;
                contexts.push(snippet(text, start, end, context_window));
            }
        }

        let satisfied = match self.mode {
            MatchMode::All => terms_hit == self.patterns.len(),
            MatchMode::Any => terms_hit > 0,
        };

        satisfied.then_some(MatchResult { match_count, contexts })
    }
}

/// Expand a match range by up to `window` characters on each side and
/// normalize interior whitespace.
fn snippet(text: &str, start: usize, end: usize, window: usize) -> String {
    let mut begin = start;
    for _ in 0..window {
        match text[..begin].chars().next_back() {
            Some(c) => begin -= c.len_utf8(),
            None => break,
        }
    }

    let mut finish = end;
    for _ in 0..window {
        match text[finish..].chars().next() {
            Some(c) => finish += c.len_utf8(),
            None => break,
        }
    }

    text[begin..finish].split_whitespace().collect::<Vec<_>>().join(" ")
}
