//! CSS for rendered documents: the bundled base stylesheet plus per-document
//! override rules compiled from a [`StyleConfig`].

mod page;

use std::fmt::Write as _;

use once_cell::sync::Lazy;

use crate::application::render::types::{RenderTarget, Stylesheets};
use crate::domain::style::{StyleConfig, format_hundredths};

pub use page::{contains_page_rule, strip_page_rules};

/// GitHub-like document styling with the syntax theme appended at build time.
/// Carries the `@page` rule used for paginated output.
pub static BASE_STYLESHEET: &str = include_str!(env!("DOCUMENT_CSS_FILE"));

static PREVIEW_BASE_STYLESHEET: Lazy<String> = Lazy::new(|| strip_page_rules(BASE_STYLESHEET));

const BODY_SELECTOR: &str = "body";
const BLOCK_SPACING_SELECTOR: &str = "p, blockquote, ul, ol, dl, dl dd, table, pre, .highlight";
const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";
const CODE_SELECTOR: &str = "code, pre, .highlight";

/// Base stylesheet as seen by `target`: page geometry is removed for preview.
pub fn base_stylesheet(target: RenderTarget) -> &'static str {
    if target.includes_page_geometry() {
        BASE_STYLESHEET
    } else {
        PREVIEW_BASE_STYLESHEET.as_str()
    }
}

/// Compile the override rules for `style`. Absent fields emit nothing, and
/// rule blocks always appear in the same order.
pub fn compile_overrides(style: &StyleConfig, target: RenderTarget) -> String {
    let mut css = String::new();

    if let Some(family) = style.font_family() {
        push_rule(&mut css, BODY_SELECTOR, "font-family", family.css_stack());
    }
    if let Some(px) = style.font_size() {
        push_rule(&mut css, BODY_SELECTOR, "font-size", &format!("{px}px"));
    }
    if let Some(hundredths) = style.line_height() {
        push_rule(
            &mut css,
            BODY_SELECTOR,
            "line-height",
            &format_hundredths(hundredths),
        );
    }
    if let Some(px) = style.paragraph_spacing() {
        let value = format!("{px}px");
        push_rule(&mut css, BLOCK_SPACING_SELECTOR, "margin-bottom", &value);
        push_rule(&mut css, HEADING_SELECTOR, "margin-bottom", &value);
    }
    if let Some(percent) = style.code_size() {
        push_rule(&mut css, CODE_SELECTOR, "font-size", &format!("{percent}%"));
    }
    if target.includes_page_geometry()
        && let Some(margin) = style.page_margin()
    {
        push_rule(&mut css, "@page", "margin", &margin.css_margin());
    }

    css
}

/// Ordered base and override stylesheets for one render call.
pub fn stylesheets_for(style: &StyleConfig, target: RenderTarget) -> Stylesheets {
    Stylesheets::new(base_stylesheet(target), compile_overrides(style, target))
}

fn push_rule(css: &mut String, selector: &str, property: &str, value: &str) {
    let _ = write!(css, "{selector} {{\n  {property}: {value};\n}}\n");
}
