//! Plain-text rendering of rich message bodies.
//!
//! Query operations only depend on [`TextRenderer`]; [`HtmlTextRenderer`] is the
//! built-in implementation.

mod html;

pub use html::HtmlTextRenderer;

/// Converts message markup to readable text.
///
/// Implementations must not panic on malformed input and must return an empty
/// string for empty input.
pub trait TextRenderer: Send + Sync {
    fn render_text(&self, html: &str) -> String;
}

/// Returns content unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl TextRenderer for PlainTextRenderer {
    fn render_text(&self, html: &str) -> String {
        html.to_string()
    }
}
