//! Markdown rendering pipeline.
//!
//! Rendering is pure: it accepts markdown plus a style configuration and
//! produces deterministic HTML, or hands an assembled document to a
//! [`PrintEngine`] for pagination. Timeouts and output handling belong to
//! the caller.

mod pipeline;
mod service;
pub mod style;
mod types;

pub use pipeline::{DEFAULT_TITLE, RenderPipeline};
pub use service::{
    CHECKED_GLYPH_HTML, CODE_BLOCK_CLASS, MarkdownRenderer, UNCHECKED_GLYPH_HTML, markdown_renderer,
};
pub use types::{PrintEngine, PrintError, PrintJob, RenderError, RenderTarget, Stylesheets};

pub(crate) use pipeline::{METRIC_EXPORT_MS, METRIC_RENDER_FAILURES_TOTAL, METRIC_RENDER_TOTAL};
