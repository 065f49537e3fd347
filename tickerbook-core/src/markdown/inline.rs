//! Inline span formatting: escaping, code, links, emphasis and checkboxes.
//!
//! Every piece of text that ends up in rendered HTML goes through
//! [`inline_format`]. Escaping always runs first; the markdown substitutions
//! only ever see already-safe text.

use regex::Regex;
use std::sync::OnceLock;

/// Schemes that can execute script when followed
const BLOCKED_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:"];

const CHECKED_BOX: &str = r#"<input type="checkbox" checked disabled>"#;
const UNCHECKED_BOX: &str = r#"<input type="checkbox" disabled>"#;

static CODE_REGEX: OnceLock<Regex> = OnceLock::new();
static LINK_REGEX: OnceLock<Regex> = OnceLock::new();
static BOLD_REGEX: OnceLock<Regex> = OnceLock::new();
static ITALIC_REGEX: OnceLock<Regex> = OnceLock::new();

fn code_regex() -> &'static Regex {
    CODE_REGEX.get_or_init(|| Regex::new(r"`[^`]+`").unwrap())
}

fn link_regex() -> &'static Regex {
    LINK_REGEX.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(((?:[^()]|\([^()]*\))+)\)").unwrap())
}

fn bold_regex() -> &'static Regex {
    BOLD_REGEX.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap())
}

fn italic_regex() -> &'static Regex {
    ITALIC_REGEX.get_or_init(|| Regex::new(r"\*([^*]+)\*").unwrap())
}

/// Format inline markdown into HTML
///
/// Order: escape, code spans, links, bold, italic, checkboxes. Code span
/// contents are emitted as-is (escaped) and are not subject to the later
/// substitutions.
///
/// ```
/// use tickerbook_core::markdown::inline_format;
///
/// assert_eq!(
///     inline_format("**bold** and *italic*"),
///     "<strong>bold</strong> and <em>italic</em>"
/// );
/// assert_eq!(inline_format("a < b"), "a &lt; b");
/// ```
pub fn inline_format(text: &str) -> String {
    let escaped = html_escape(text);
    let mut out = String::with_capacity(escaped.len());
    let mut last = 0;

    for code in code_regex().find_iter(&escaped) {
        out.push_str(&format_spans(&escaped[last..code.start()]));
        // Strip the surrounding backticks (one byte each)
        let inner = &code.as_str()[1..code.as_str().len() - 1];
        out.push_str("<code>");
        out.push_str(inner);
        out.push_str("</code>");
        last = code.end();
    }
    out.push_str(&format_spans(&escaped[last..]));

    out
}

/// Links, emphasis and checkboxes over escaped text outside code spans
///
/// Anchors are cut out like code spans: emphasis and checkboxes apply to the
/// text around them and to the label, never to the URL.
fn format_spans(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in link_regex().captures_iter(text) {
        let Some(link) = caps.get(0) else {
            continue;
        };
        out.push_str(&format_emphasis(&text[last..link.start()]));
        out.push_str(&safe_link(&format_emphasis(&caps[1]), &caps[2]));
        last = link.end();
    }
    out.push_str(&format_emphasis(&text[last..]));

    out
}

fn format_emphasis(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let bold = bold_regex().replace_all(text, "<strong>$1</strong>");
    let italic = italic_regex().replace_all(&bold, "<em>$1</em>");

    italic
        .replace("[x]", CHECKED_BOX)
        .replace("[ ]", UNCHECKED_BOX)
}

/// Build an anchor, or fall back to the bare label for unsafe schemes
///
/// Both arguments are already escaped and are not escaped again.
fn safe_link(label: &str, url: &str) -> String {
    if is_unsafe_url(url) {
        tracing::debug!("Dropping link with unsafe scheme: {}", url);
        return label.to_string();
    }
    format!(r#"<a href="{}" target="_blank">{}</a>"#, url, label)
}

/// Check whether an escaped URL would run script when followed
///
/// The URL is unescaped first. Every `&` in source text was escaped, so
/// reversing [`html_escape`] yields exactly the attribute value the browser
/// will see. Browsers ignore ASCII whitespace and control characters inside
/// a scheme, so those are removed before comparing.
pub fn is_unsafe_url(escaped_url: &str) -> bool {
    let decoded = html_unescape(escaped_url);
    let normalized: String = decoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    BLOCKED_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

/// Escape the five HTML metacharacters
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Reverse [`html_escape`]; `&amp;` goes last so nothing is decoded twice
fn html_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
