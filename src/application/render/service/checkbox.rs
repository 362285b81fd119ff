//! Task-list checkbox normalization.
//!
//! Print engines do not draw native form controls reliably, so every task
//! checkbox the markdown renderer emits is swapped for a static ballot-box
//! glyph. Preview output goes through the same pass so both targets match.

use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str};

use crate::application::render::types::RenderError;

use super::config::{TASK_CHECKBOX_CLASS, TASK_CHECKBOX_SELECTOR};

pub const CHECKED_GLYPH_HTML: &str =
    "<span class=\"task-checkbox task-checked\">&#x2611;</span>";
pub const UNCHECKED_GLYPH_HTML: &str = "<span class=\"task-checkbox\">&#x2610;</span>";

pub(crate) fn normalize_checkboxes(html: &str) -> Result<String, RenderError> {
    if !html.contains(TASK_CHECKBOX_CLASS) {
        return Ok(html.to_string());
    }

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(TASK_CHECKBOX_SELECTOR, |el| {
                // The checked variant is decided first; everything else is unchecked.
                let glyph = if el.has_attribute("checked") {
                    CHECKED_GLYPH_HTML
                } else {
                    UNCHECKED_GLYPH_HTML
                };
                el.replace(glyph, ContentType::Html);
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::rewrite(format!("checkbox normalization failed: {err}")))
}
