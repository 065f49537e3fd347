//! Render a single markdown document.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tickerbook_core::frontmatter::split_body;
use tickerbook_core::MarkdownRenderer;

/// Print the HTML fragment for `file` (or stdin) to stdout
pub fn render_markdown(file: Option<&Path>) -> Result<()> {
    let content = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let output = MarkdownRenderer::new().render(split_body(&content));
    for diagnostic in output.diagnostics {
        let diagnostic = match file {
            Some(path) => diagnostic.in_file(path),
            None => diagnostic,
        };
        tracing::warn!("{}", diagnostic);
    }

    print!("{}", output.html);
    Ok(())
}
