//! Markdown subset renderer for company cards.
//!
//! Supports headings (h1–h4), paragraphs, flat lists, pipe tables,
//! blockquotes, horizontal rules and HTML comments (dropped). Inline spans:
//! code, links, bold, italic, checkboxes. Nothing is nested and nothing is
//! passed through unescaped.

pub mod blocks;
pub mod inline;

use crate::models::Diagnostic;
pub use blocks::{scan, Block};
pub use inline::{html_escape, inline_format, is_unsafe_url};

/// Rendered HTML fragment plus any problems found in the source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutput {
    pub html: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Markdown renderer for card bodies
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Convert a markdown body into an HTML fragment
    ///
    /// Never fails; malformed input degrades to paragraphs and is reported
    /// through `diagnostics`.
    pub fn render(&self, body: &str) -> RenderOutput {
        let mut output = RenderOutput::default();
        let mut parts = Vec::new();
        render_blocks(scan(body), &mut parts, &mut output.diagnostics);
        output.html = parts.join("\n");
        output
    }

    /// Convert markdown to HTML, discarding diagnostics
    pub fn render_html(&self, body: &str) -> String {
        self.render(body).html
    }
}

fn render_blocks(blocks: Vec<Block>, parts: &mut Vec<String>, diagnostics: &mut Vec<Diagnostic>) {
    for block in blocks {
        match block {
            Block::Comment {
                start_line,
                terminated,
                remnant,
            } => {
                if !terminated {
                    diagnostics.push(
                        Diagnostic::warning(
                            "markdown.unterminated-comment",
                            "Unterminated HTML comment; the rest of the document was dropped",
                        )
                        .at_line(start_line),
                    );
                }
                // The remnant holds no comment markers, so this recursion is one level deep
                if !remnant.is_empty() {
                    render_blocks(scan(&remnant), parts, diagnostics);
                }
            }
            other => parts.push(render_block(&other)),
        }
    }
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Heading { level, text } => {
            format!("<h{level}>{}</h{level}>", inline_format(text))
        }
        Block::Paragraph(text) => format!("<p>{}</p>", inline_format(text)),
        Block::UnorderedList(items) => format!("<ul>{}</ul>", render_items(items)),
        Block::OrderedList(items) => format!("<ol>{}</ol>", render_items(items)),
        Block::Table { header, rows } => render_table(header, rows),
        Block::Blockquote(lines) => {
            // Formatted as one unit so emphasis may span quote lines
            let formatted = inline_format(&lines.join("\n"));
            format!("<blockquote>{}</blockquote>", formatted.replace('\n', "<br>"))
        }
        Block::HorizontalRule => "<hr>".to_string(),
        Block::Comment { .. } => String::new(),
    }
}

fn render_items(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("<li>{}</li>", inline_format(item)))
        .collect()
}

fn render_table(header: &[String], rows: &[Vec<String>]) -> String {
    let mut html = String::from(r#"<div class="table-wrap"><table><thead><tr>"#);
    for cell in header {
        html.push_str(&format!("<th>{}</th>", inline_format(cell)));
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", inline_format(cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(md: &str) -> String {
        MarkdownRenderer::new().render_html(md)
    }

    #[test]
    fn test_script_is_escaped() {
        assert_eq!(
            render("<script>alert(1)</script>"),
            "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn test_links() {
        assert_eq!(render("[click](javascript:alert(1))"), "<p>click</p>");
        assert_eq!(
            render("[click](https://example.com)"),
            r#"<p><a href="https://example.com" target="_blank">click</a></p>"#
        );
    }

    #[test]
    fn test_table_round_trip() {
        let md = "| A | B |\n|---|---|\n| 1 | 2 |";
        insta::assert_snapshot!(render(md), @r#"<div class="table-wrap"><table><thead><tr><th>A</th><th>B</th></tr></thead><tbody><tr><td>1</td><td>2</td></tr></tbody></table></div>"#);
    }

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(
            render("**bold** and *italic*"),
            "<p><strong>bold</strong> and <em>italic</em></p>"
        );
    }

    #[test]
    fn test_unterminated_comment() {
        let output = MarkdownRenderer::new().render("text <!-- no closing");
        assert_eq!(output.html, "<p>text</p>");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, "markdown.unterminated-comment");
        assert_eq!(output.diagnostics[0].line, Some(1));
    }

    #[test]
    fn test_terminated_comment_has_no_diagnostics() {
        let output = MarkdownRenderer::new().render("<!-- note -->\n## Риски");
        assert_eq!(output.html, "<h2>Риски</h2>");
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_comment_remnant_is_rescanned() {
        assert_eq!(render("## Итог <!-- черновик -->"), "<h2>Итог</h2>");
    }

    #[test]
    fn test_checkbox_list() {
        insta::assert_snapshot!(render("- [x] done\n- [ ] pending"), @r#"<ul><li><input type="checkbox" checked disabled> done</li><li><input type="checkbox" disabled> pending</li></ul>"#);
    }

    #[test]
    fn test_blockquote_line_breaks() {
        assert_eq!(
            render("> **Цитата** из\n> политики"),
            "<blockquote><strong>Цитата</strong> из<br>политики</blockquote>"
        );
    }

    #[test]
    fn test_ordered_list_and_rule() {
        assert_eq!(
            render("1. первый\n2. второй\n\n---"),
            "<ol><li>первый</li><li>второй</li></ol>\n<hr>"
        );
    }

    #[test]
    fn test_card_body() {
        let md = r#"# Сбербанк (SBER)

Крупнейший банк. Ставка ЦБ > 16% & растёт.

## Тезисы

- Дивиденды **50%** от ЧП
- Риск: `NIM` снижается

| Год | ДПА |
|-----|-----|
| 2024 | 33.3 |
"#;
        insta::assert_snapshot!(render(md), @r#"
        <h1>Сбербанк (SBER)</h1>
        <p>Крупнейший банк. Ставка ЦБ &gt; 16% &amp; растёт.</p>
        <h2>Тезисы</h2>
        <ul><li>Дивиденды <strong>50%</strong> от ЧП</li><li>Риск: <code>NIM</code> снижается</li></ul>
        <div class="table-wrap"><table><thead><tr><th>Год</th><th>ДПА</th></tr></thead><tbody><tr><td>2024</td><td>33.3</td></tr></tbody></table></div>
        "#);
    }

    #[test]
    fn test_empty_body() {
        let output = MarkdownRenderer::new().render("\n\n  \n");
        assert_eq!(output, RenderOutput::default());
    }
}
