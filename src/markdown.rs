//! Markdown body to HTML.
//!
//! Thin wrapper over pulldown-cmark; the structural work happens on the
//! parsed [`crate::dom::Document`], not on markdown events.

use pulldown_cmark::{Options, Parser, html};

/// Convert a markdown body to HTML text.
///
/// Tables, strikethrough, footnotes, and smart punctuation are enabled, and
/// inline HTML passes through untouched (it is the template and placeholder
/// carrier inside content documents).
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let html = to_html("# Title\n\nSome *emphasis*.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn test_tables_enabled() {
        let html = to_html("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_smart_punctuation() {
        let html = to_html("\"quoted\"");
        assert!(html.contains("\u{201c}quoted\u{201d}"));
    }

    #[test]
    fn test_inline_html_passthrough() {
        let html = to_html("before\n\n<nav folio-template=\"nav.html\"></nav>\n\nafter");
        assert!(html.contains("folio-template=\"nav.html\""));
    }
}
