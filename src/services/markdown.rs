// Markdown Rendering
// Minimal markdown subset to HTML for the incremental essay view

use regex::Regex;
use std::sync::OnceLock;

fn h3_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^### (.*)$").unwrap())
}

fn h2_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^## (.*)$").unwrap())
}

fn h1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^# (.*)$").unwrap())
}

fn bold_italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*\*(.*?)\*\*\*").unwrap())
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").unwrap())
}

fn italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(.*?)\*").unwrap())
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Headings (`#`, `##`, `###`), `***`/`**`/`*` emphasis, blank-line paragraphs and
/// single-newline breaks. Everything else is escaped text.
pub fn markdown_to_html(markdown: &str) -> String {
    let html = escape_html(markdown);
    let html = h3_re().replace_all(&html, "<h3>$1</h3>");
    let html = h2_re().replace_all(&html, "<h2>$1</h2>");
    let html = h1_re().replace_all(&html, "<h1>$1</h1>");
    let html = bold_italic_re().replace_all(&html, "<strong><em>$1</em></strong>");
    let html = bold_re().replace_all(&html, "<strong>$1</strong>");
    let html = italic_re().replace_all(&html, "<em>$1</em>");
    let html = html.replace("\n\n", "</p><p>").replace('\n', "<br>");

    format!("<p>{}</p>", html)
        .replace("<p></p>", "")
        .replace("<p><br></p>", "")
}

/// Error panel shown in place of a discarded partial essay.
pub fn error_html(message: &str) -> String {
    format!(
        "<div class=\"generation-error\"><h3>Generation Failed</h3><p>{}</p></div>",
        escape_html(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_emphasis() {
        let html = markdown_to_html("# Title\n\n## Section\n\nSome **bold**, *it* and ***both***.");
        assert_eq!(
            html,
            "<p><h1>Title</h1></p><p><h2>Section</h2></p><p>Some <strong>bold</strong>, <em>it</em> and <strong><em>both</em></strong>.</p>"
        );
    }

    #[test]
    fn test_escapes_markup() {
        let html = markdown_to_html("a < b & c > d");
        assert_eq!(html, "<p>a &lt; b &amp; c &gt; d</p>");
    }

    #[test]
    fn test_line_breaks_and_empty_paragraphs() {
        assert_eq!(markdown_to_html("one\ntwo"), "<p>one<br>two</p>");
        assert_eq!(markdown_to_html(""), "");
        assert_eq!(markdown_to_html("\n\n\n\n"), "");
    }

    #[test]
    fn test_error_html_escapes() {
        assert!(error_html("bad <key>").contains("bad &lt;key&gt;"));
    }
}
