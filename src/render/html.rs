//! HTML-to-text conversion for message bodies, backed by `html2text`.
//!
//! Markup is rendered without decoration, images become their alt text and
//! lines are not wrapped. Blank lines and surrounding whitespace are removed.

use html2text::render::text_renderer::TrivialDecorator;

use super::TextRenderer;

/// Long enough that message paragraphs are never wrapped.
const RENDER_WIDTH: usize = 10_000;

/// Renders HTML message bodies to plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTextRenderer;

impl TextRenderer for HtmlTextRenderer {
    fn render_text(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }
        let config = html2text::config::with_decorator(TrivialDecorator::new());
        match config.string_from_read(html.as_bytes(), RENDER_WIDTH) {
            Ok(text) => tidy_lines(&text),
            Err(e) => {
                tracing::debug!("html rendering failed, keeping markup: {}", e);
                html.trim().to_string()
            }
        }
    }
}

/// Trim every line and drop empty ones.
fn tidy_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
