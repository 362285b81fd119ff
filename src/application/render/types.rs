use thiserror::Error;

/// Selects which of the two outputs a render call produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// Standalone HTML document for a sandboxed, scrollable preview frame.
    Preview,
    /// Paginated document handed to the print engine.
    Export,
}

impl RenderTarget {
    /// Page geometry (`@page`) is only meaningful for paginated output.
    pub fn includes_page_geometry(self) -> bool {
        matches!(self, RenderTarget::Export)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RenderTarget::Preview => "preview",
            RenderTarget::Export => "export",
        }
    }
}

/// Ordered pair of stylesheets. The override text always cascades after the
/// base text so equal-specificity overrides win without `!important`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheets {
    pub base: String,
    pub overrides: String,
}

impl Stylesheets {
    pub fn new(base: impl Into<String>, overrides: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            overrides: overrides.into(),
        }
    }

    /// Base followed by overrides, never interleaved.
    pub fn combined(&self) -> String {
        let mut css = String::with_capacity(self.base.len() + self.overrides.len() + 1);
        css.push_str(&self.base);
        if !self.overrides.is_empty() {
            if !css.is_empty() && !css.ends_with('\n') {
                css.push('\n');
            }
            css.push_str(&self.overrides);
        }
        css
    }
}

/// A fully assembled export document awaiting pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    /// Complete HTML document (`<!DOCTYPE html>` through `</html>`).
    pub document: String,
    /// Unfiltered stylesheets, page geometry included.
    pub stylesheets: Stylesheets,
}

/// Failure reported by a pagination engine.
#[derive(Debug, Clone, Error)]
pub enum PrintError {
    #[error("print engine unavailable: {message}")]
    Unavailable { message: String },
    #[error("print engine failed: {message}")]
    Engine { message: String },
    #[error("print engine produced an empty document")]
    EmptyOutput,
}

impl PrintError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }
}

/// Pagination/print engine seam. Implementations turn an assembled HTML
/// document plus its stylesheets into paginated bytes.
///
/// Calls are blocking and may be slow; callers own the timeout.
pub trait PrintEngine: Send + Sync {
    fn print(&self, job: &PrintJob) -> Result<Vec<u8>, PrintError>;
}

/// Structured errors surfaced by the rendering pipeline. Each render call
/// either succeeds completely or yields exactly one of these.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown formatting failed: {message}")]
    Markdown { message: String },
    #[error("html rewriting failed: {message}")]
    Rewrite { message: String },
    #[error("document assembly failed: {message}")]
    Document { message: String },
    #[error(transparent)]
    Print(#[from] PrintError),
}

impl RenderError {
    pub fn rewrite(message: impl Into<String>) -> Self {
        Self::Rewrite {
            message: message.into(),
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_places_overrides_after_base() {
        let sheets = Stylesheets::new("body { color: black; }", "body { font-size: 18px; }\n");
        let css = sheets.combined();
        let base_at = css.find("color: black").expect("base present");
        let override_at = css.find("font-size: 18px").expect("override present");
        assert!(base_at < override_at);
    }

    #[test]
    fn combined_without_overrides_is_base() {
        let sheets = Stylesheets::new("p { margin: 0; }\n", "");
        assert_eq!(sheets.combined(), "p { margin: 0; }\n");
    }

    #[test]
    fn only_export_keeps_page_geometry() {
        assert!(RenderTarget::Export.includes_page_geometry());
        assert!(!RenderTarget::Preview.includes_page_geometry());
    }
}
