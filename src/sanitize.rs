//! HTML cleaning for remote highlight markup and escaping for local text.

use std::collections::HashSet;

/// Clean HTML returned by the highlight service.
///
/// Keeps the `div`/`span` structure and `class` attributes the highlighter
/// emits; scripts, event handlers, styles and links are removed.
pub fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&str> = ["div", "span", "pre", "code", "br"].into_iter().collect();
    ammonia::Builder::default()
        .tags(tags)
        .generic_attributes(["class"].into_iter().collect())
        .link_rel(None)
        .clean(html)
        .to_string()
}

/// Escape plain text for insertion into HTML.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
