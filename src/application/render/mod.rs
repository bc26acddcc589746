//! Markdown to safe HTML.
//!
//! Stored page content is never altered; sanitisation happens on every
//! render, after comrak has produced HTML.

mod config;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;
use once_cell::sync::Lazy;

static RENDERER: Lazy<MarkdownRenderer> = Lazy::new(MarkdownRenderer::new);

/// Process-wide renderer.
pub fn renderer() -> &'static MarkdownRenderer {
    &RENDERER
}

pub struct MarkdownRenderer {
    options: Options<'static>,
    sanitizer: AmmoniaBuilder<'static>,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            options: config::default_options(),
            sanitizer: config::build_sanitizer(),
        }
    }

    pub fn render(&self, markdown: &str) -> String {
        let html = comrak::markdown_to_html(markdown, &self.options);
        self.sanitizer.clean(&html).to_string()
    }
}
