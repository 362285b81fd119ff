mod checkbox;
mod config;
mod highlight;
mod rewrite;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use once_cell::sync::Lazy;
use syntect::{dumps::from_uncompressed_data, html::ClassStyle, parsing::SyntaxSet};
use tracing::debug;

use crate::application::render::types::RenderError;

pub use checkbox::{CHECKED_GLYPH_HTML, UNCHECKED_GLYPH_HTML};
pub use highlight::CODE_BLOCK_CLASS;

use checkbox::normalize_checkboxes;
use config::{build_body_sanitizer, default_options};
use rewrite::{RewriteOutcome, rewrite_ast};

/// Token classes are emitted as `syntax-`-prefixed class lists so the theme
/// CSS generated at build time can target them.
pub(crate) const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

/// Comrak-based markdown renderer with Syntect highlighting for every code
/// block. Built once per process and shared read-only across render calls.
pub struct MarkdownRenderer {
    options: comrak::Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
}

impl MarkdownRenderer {
    fn new() -> Self {
        let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
        let syntax_set: SyntaxSet =
            from_uncompressed_data(syntax_bytes).expect("syntax pack must be valid");

        Self {
            options: default_options(),
            syntax_set,
            class_style: CLASS_STYLE,
            sanitizer: build_body_sanitizer(),
        }
    }

    /// Render markdown into a sanitized HTML body fragment with highlighted
    /// code blocks. Task-list checkboxes are still native inputs at this point.
    pub fn render_raw(&self, markdown: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let outcome = rewrite_stage(root, &self.syntax_set, &self.class_style);
        debug!(
            target = "application::render::markdown",
            code_blocks = outcome.code_blocks,
            plain_text_blocks = outcome.plain_text_blocks,
            "code blocks rewritten"
        );

        let html = render_html_stage(root, &self.options)?;
        Ok(sanitize_stage(&html, &self.sanitizer))
    }

    /// Render markdown into the normalized body shared by preview and export.
    pub fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let html = self.render_raw(markdown)?;
        normalize_checkboxes(&html)
    }

    #[cfg(test)]
    pub(crate) fn syntax_set(&self) -> &SyntaxSet {
        &self.syntax_set
    }
}

static MARKDOWN_RENDERER: Lazy<Arc<MarkdownRenderer>> =
    Lazy::new(|| Arc::new(MarkdownRenderer::new()));

/// Access the shared markdown renderer, initialised on first use.
pub fn markdown_renderer() -> Arc<MarkdownRenderer> {
    Arc::clone(&MARKDOWN_RENDERER)
}

fn rewrite_stage<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> RewriteOutcome {
    rewrite_ast(root, syntax_set, class_style)
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

fn sanitize_stage(html: &str, sanitizer: &ammonia::Builder<'static>) -> String {
    sanitizer.clean(html).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_renderer_is_a_singleton() {
        let first = markdown_renderer();
        let second = markdown_renderer();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn render_normalizes_task_items() {
        let html = markdown_renderer()
            .render("- [x] shipped\n- [ ] pending\n")
            .expect("render");

        assert!(!html.contains("<input"));
        assert!(html.contains(CHECKED_GLYPH_HTML));
        assert!(html.contains(UNCHECKED_GLYPH_HTML));
    }

    #[test]
    fn raw_render_keeps_native_checkboxes() {
        let html = markdown_renderer()
            .render_raw("- [x] shipped\n")
            .expect("render");
        assert!(html.contains("<input"));
    }

    #[test]
    fn raw_document_markup_is_sanitized() {
        let html = markdown_renderer()
            .render("<body>\n\nhello\n\n</body>\n<script>alert(1)</script>\n")
            .expect("render");

        assert!(!html.contains("<body"));
        assert!(!html.contains("<script"));
        assert!(html.contains("hello"));
    }

    #[test]
    fn gfm_extensions_render() {
        let markdown = "| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n";
        let html = markdown_renderer().render(markdown).expect("render");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn arbitrary_text_never_fails() {
        let inputs = [
            "",
            "```",
            "~~~\nunterminated",
            "| broken | table\n|---",
            "<div><span>unclosed",
            "\u{0}\u{feff}ünïcödé — 漢字 🎉",
            "[link](",
            "- [x]",
        ];
        let renderer = markdown_renderer();
        for input in inputs {
            renderer.render(input).expect("render never fails on content");
        }
    }
}
