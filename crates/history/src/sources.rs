//! Browser profile discovery.
//!
//! Profiles live in fixed directory layouts under the home directory;
//! discovery is plain glob matching over those layouts. Databases are
//! only ever read, never written.

use std::path::{Path, PathBuf};

/// Browsers whose history databases webtrail understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Firefox,
    Chrome,
    Chromium,
}

/// One discovered history database.
#[derive(Debug, Clone)]
pub struct HistorySource {
    pub browser: Browser,
    pub db_path: PathBuf,
}

impl Browser {
    /// Glob patterns for this browser's history databases, relative to
    /// the home directory. Linux and macOS layouts are both listed; a
    /// layout that doesn't exist simply matches nothing.
    pub fn profile_globs(self) -> &'static [&'static str] {
        match self {
            Browser::Firefox => &[
                ".mozilla/firefox/*/places.sqlite",
                "Library/Application Support/Firefox/Profiles/*/places.sqlite",
            ],
            Browser::Chrome => &[
                ".config/google-chrome/*/History",
                "Library/Application Support/Google/Chrome/*/History",
            ],
            Browser::Chromium => &[
                ".config/chromium/*/History",
                "Library/Application Support/Chromium/*/History",
            ],
        }
    }

    /// Guess the browser family from a history database filename.
    /// Firefox calls its database places.sqlite; the Chromium family
    /// calls it History.
    pub fn infer_from_path(path: &Path) -> Browser {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("places.sqlite") => Browser::Firefox,
            _ => Browser::Chrome,
        }
    }
}

/// Glob the fixed profile layouts for history databases.
///
/// Missing browsers are not an error here; the caller decides whether an
/// empty result is fatal.
pub fn discover(browsers: &[Browser]) -> Vec<HistorySource> {
    let Some(home) = dirs::home_dir() else {
        tracing::warn!("no home directory; skipping profile discovery");
        return Vec::new();
    };

    let mut sources = Vec::new();
    for &browser in browsers {
        for relative in browser.profile_globs() {
            let pattern = home.join(relative);
            let Some(pattern) = pattern.to_str() else { continue };
            let Ok(paths) = glob::glob(pattern) else { continue };
            for path in paths.flatten() {
                if path.is_file() {
                    tracing::debug!("found {:?} history at {}", browser, path.display());
                    sources.push(HistorySource { browser, db_path: path });
                }
            }
        }
    }

    sources
}
