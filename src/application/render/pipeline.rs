use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, instrument, warn};

use super::service::{MarkdownRenderer, markdown_renderer};
use super::style::stylesheets_for;
use super::types::{PrintEngine, PrintError, PrintJob, RenderError, RenderTarget, Stylesheets};
use crate::domain::style::StyleConfig;

pub(crate) const METRIC_RENDER_TOTAL: &str = "mdprint_render_total";
pub(crate) const METRIC_RENDER_FAILURES_TOTAL: &str = "mdprint_render_failures_total";
pub(crate) const METRIC_EXPORT_MS: &str = "mdprint_export_ms";

/// Title used when the caller supplies an empty or blank one.
pub const DEFAULT_TITLE: &str = "document";

/// Layout of the preview frame. Not part of the shared stylesheets because
/// paginated output takes its geometry from `@page` instead.
const PREVIEW_FRAME_CSS: &str =
    ".markdown-body {\n  max-width: 860px;\n  margin: 0 auto;\n  padding: 2rem 2.5rem;\n}\n";

/// Composes markdown rendering, checkbox normalization and style compilation
/// into the preview and export entry points.
#[derive(Clone)]
pub struct RenderPipeline {
    markdown: Arc<MarkdownRenderer>,
    engine: Option<Arc<dyn PrintEngine>>,
}

impl RenderPipeline {
    pub fn new(engine: Arc<dyn PrintEngine>) -> Self {
        Self {
            markdown: markdown_renderer(),
            engine: Some(engine),
        }
    }

    /// Pipeline without a print engine. Preview and document assembly work;
    /// `render_export` reports the engine as unavailable.
    pub fn preview_only() -> Self {
        Self {
            markdown: markdown_renderer(),
            engine: None,
        }
    }

    /// Normalized HTML body shared by both render targets.
    pub fn render_body(&self, markdown: &str) -> Result<String, RenderError> {
        self.markdown.render(markdown)
    }

    /// Standalone HTML document for the preview frame. Page geometry is
    /// stripped from both stylesheets.
    #[instrument(level = "debug", skip_all, fields(markdown_len = markdown.len()))]
    pub fn render_preview(
        &self,
        markdown: &str,
        style: &StyleConfig,
    ) -> Result<String, RenderError> {
        record(RenderTarget::Preview, self.preview_document(markdown, style))
    }

    /// Full HTML document plus unfiltered stylesheets, ready for pagination.
    pub fn export_document(
        &self,
        markdown: &str,
        style: &StyleConfig,
        title: &str,
    ) -> Result<PrintJob, RenderError> {
        let body = self.render_body(markdown)?;
        let document = export_html(&body, title)?;
        Ok(PrintJob {
            document,
            stylesheets: stylesheets_for(style, RenderTarget::Export),
        })
    }

    /// Paginated bytes produced by the print engine. Blocking.
    #[instrument(level = "debug", skip_all, fields(markdown_len = markdown.len()))]
    pub fn render_export(
        &self,
        markdown: &str,
        style: &StyleConfig,
        title: &str,
    ) -> Result<Vec<u8>, RenderError> {
        let started_at = Instant::now();
        let result = self.export_document(markdown, style, title).and_then(|job| {
            let engine = self
                .engine
                .as_ref()
                .ok_or_else(|| PrintError::unavailable("no print engine configured"))?;
            let bytes = engine.print(&job)?;
            if bytes.is_empty() {
                return Err(PrintError::EmptyOutput.into());
            }
            Ok(bytes)
        });

        histogram!(METRIC_EXPORT_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        if let Ok(bytes) = &result {
            debug!(
                target = "application::render::pipeline",
                bytes = bytes.len(),
                "export rendered"
            );
        }
        record(RenderTarget::Export, result)
    }

    fn preview_document(&self, markdown: &str, style: &StyleConfig) -> Result<String, RenderError> {
        let body = self.render_body(markdown)?;
        preview_html(&body, &stylesheets_for(style, RenderTarget::Preview))
    }
}

fn record<T>(target: RenderTarget, result: Result<T, RenderError>) -> Result<T, RenderError> {
    counter!(METRIC_RENDER_TOTAL, "target" => target.as_str()).increment(1);
    if let Err(err) = &result {
        counter!(METRIC_RENDER_FAILURES_TOTAL, "target" => target.as_str()).increment(1);
        warn!(
            target = "application::render::pipeline",
            render_target = target.as_str(),
            error = %err,
            "render failed"
        );
    }
    result
}

fn preview_html(body: &str, stylesheets: &Stylesheets) -> Result<String, RenderError> {
    let mut html = String::with_capacity(
        body.len() + stylesheets.base.len() + stylesheets.overrides.len() + 512,
    );
    write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <style>\n{}</style>\n<style>\n{PREVIEW_FRAME_CSS}</style>\n",
        stylesheets.base,
    )
    .map_err(|err| RenderError::document(err.to_string()))?;
    if !stylesheets.overrides.is_empty() {
        write!(html, "<style>\n{}</style>\n", stylesheets.overrides)
            .map_err(|err| RenderError::document(err.to_string()))?;
    }
    write!(
        html,
        "</head>\n<body class=\"markdown-body\">\n{body}</body>\n</html>\n"
    )
    .map_err(|err| RenderError::document(err.to_string()))?;
    Ok(html)
}

fn export_html(body: &str, title: &str) -> Result<String, RenderError> {
    let title = match title.trim() {
        "" => DEFAULT_TITLE,
        trimmed => trimmed,
    };

    let mut html = String::with_capacity(body.len() + title.len() + 256);
    write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n</head>\n<body class=\"markdown-body\">\n{body}</body>\n</html>\n",
        ammonia::clean_text(title),
    )
    .map_err(|err| RenderError::document(err.to_string()))?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::style::{BASE_STYLESHEET, contains_page_rule};
    use crate::domain::style::PageMargin;

    struct StaticEngine(Vec<u8>);

    impl PrintEngine for StaticEngine {
        fn print(&self, _job: &PrintJob) -> Result<Vec<u8>, PrintError> {
            Ok(self.0.clone())
        }
    }

    struct FailingEngine;

    impl PrintEngine for FailingEngine {
        fn print(&self, _job: &PrintJob) -> Result<Vec<u8>, PrintError> {
            Err(PrintError::engine("renderer crashed"))
        }
    }

    fn pipeline(engine: impl PrintEngine + 'static) -> RenderPipeline {
        RenderPipeline::new(Arc::new(engine))
    }

    #[test]
    fn preview_is_a_single_standalone_document() {
        let html = pipeline(StaticEngine(b"%PDF".to_vec()))
            .render_preview("# Title\n", &StyleConfig::new())
            .expect("preview");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("<body").count(), 1);
        assert!(html.contains("<body class=\"markdown-body\">"));
        assert!(html.contains("max-width: 860px;"));
        assert!(!contains_page_rule(&html));
    }

    #[test]
    fn preview_strips_page_margin_override() {
        let style = StyleConfig::new()
            .with_page_margin(PageMargin::Wide)
            .with_font_size(18.0);
        let html = pipeline(StaticEngine(Vec::new()))
            .render_preview("text\n", &style)
            .expect("preview");

        assert!(!html.contains("3cm 4cm"));
        assert!(html.contains("font-size: 18px;"));
    }

    #[test]
    fn export_document_escapes_title_and_keeps_geometry() {
        let style = StyleConfig::new().with_page_margin(PageMargin::Narrow);
        let job = pipeline(StaticEngine(Vec::new()))
            .export_document("body\n", &style, "<Q&A>")
            .expect("export document");

        assert!(job.document.contains("<title>&lt;Q&amp;A&gt;</title>"));
        assert_eq!(job.stylesheets.base, BASE_STYLESHEET);
        assert_eq!(job.stylesheets.overrides, "@page {\n  margin: 1.5cm 1.5cm;\n}\n");
    }

    #[test]
    fn blank_title_falls_back_to_default() {
        let job = pipeline(StaticEngine(Vec::new()))
            .export_document("body\n", &StyleConfig::new(), "   ")
            .expect("export document");
        assert!(job.document.contains("<title>document</title>"));
    }

    #[test]
    fn export_returns_engine_bytes() {
        let bytes = pipeline(StaticEngine(b"%PDF-1.7".to_vec()))
            .render_export("# Hi\n", &StyleConfig::new(), "hi")
            .expect("export");
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[test]
    fn empty_engine_output_is_an_error() {
        let err = pipeline(StaticEngine(Vec::new()))
            .render_export("# Hi\n", &StyleConfig::new(), "hi")
            .expect_err("empty output");
        assert!(matches!(err, RenderError::Print(PrintError::EmptyOutput)));
    }

    #[test]
    fn preview_only_pipeline_cannot_export() {
        let pipeline = RenderPipeline::preview_only();
        assert!(pipeline.render_preview("text\n", &StyleConfig::new()).is_ok());

        let err = pipeline
            .render_export("text\n", &StyleConfig::new(), "t")
            .expect_err("no engine");
        assert!(matches!(err, RenderError::Print(PrintError::Unavailable { .. })));
    }

    #[test]
    fn engine_failure_propagates_as_render_error() {
        let err = pipeline(FailingEngine)
            .render_export("# Hi\n", &StyleConfig::new(), "hi")
            .expect_err("engine failure");
        assert!(matches!(err, RenderError::Print(PrintError::Engine { .. })));
    }
}
