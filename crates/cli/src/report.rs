//! HTML rendering of search results.
//!
//! Produces a self-contained document (inline CSS, no external assets)
//! from already-computed match records. All interpolated text is
//! escaped; snippets are prose, titles and URLs come straight from the
//! browser database.

use webtrail_client::pipeline::SearchOutcome;
use webtrail_core::matcher::KeywordQuery;

const STYLE: &str = "\
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; color: #222; }
header { border-bottom: 1px solid #ccc; margin-bottom: 1.5rem; }
article { margin-bottom: 1.5rem; }
article h2 { margin: 0 0 0.25rem; font-size: 1.1rem; }
.meta { color: #666; font-size: 0.85rem; }
.context { background: #f6f6f6; padding: 0.4rem 0.6rem; margin: 0.3rem 0; font-size: 0.9rem; }
";

/// Render the full report document.
pub fn render_html(query: &KeywordQuery, outcome: &SearchOutcome) -> String {
    let mut out = String::with_capacity(4096);

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>webtrail report</title>\n<style>\n");
    out.push_str(STYLE);
    out.push_str("</style>\n</head>\n<body>\n<header>\n<h1>webtrail report</h1>\n");

    out.push_str("<p class=\"meta\">keywords: ");
    out.push_str(&escape_html(&query.terms().join(", ")));
    out.push_str(&format!(
        " ({:?}) &mdash; {} match(es) from {} page(s): {} cached, {} fetched, {} failed</p>\n",
        query.mode(),
        outcome.matches.len(),
        outcome.summary.attempted,
        outcome.summary.cache_hits,
        outcome.summary.fetched,
        outcome.summary.failed,
    ));
    out.push_str("</header>\n");

    if outcome.matches.is_empty() {
        out.push_str("<p>No pages matched.</p>\n");
    }

    for record in &outcome.matches {
        let title = if record.title.is_empty() { &record.url } else { &record.title };

        out.push_str("<article>\n<h2><a href=\"");
        out.push_str(&escape_html(&record.url));
        out.push_str("\">");
        out.push_str(&escape_html(title));
        out.push_str("</a></h2>\n<p class=\"meta\">");
        out.push_str(&escape_html(&record.date));
        out.push_str(&format!(" &middot; {} occurrence(s)</p>\n", record.match_count));

        for context in &record.contexts {
            out.push_str("<p class=\"context\">&hellip; ");
            out.push_str(&escape_html(context));
            out.push_str(" &hellip;</p>\n");
        }

        out.push_str("</article>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
