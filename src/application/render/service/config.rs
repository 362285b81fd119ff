use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::{ListStyleType, Options};

/// Class comrak puts on task-list checkbox inputs when `tasklist_classes`
/// is enabled. The checkbox normalizer selects on this exact class.
pub(crate) const TASK_CHECKBOX_CLASS: &str = "task-list-item-checkbox";

/// Selector for the disabled checkbox control comrak emits for task items.
/// Must stay in lockstep with the render options below.
pub(crate) const TASK_CHECKBOX_SELECTOR: &str =
    "input.task-list-item-checkbox[type=\"checkbox\"][disabled]";

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Sanitizer applied to the formatted body. Raw HTML is allowed through the
/// formatter, so document-level tags, scripts and event handlers are removed
/// here while the renderer's own markup survives.
pub(crate) fn build_body_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "code",
        "dd",
        "del",
        "details",
        "div",
        "dl",
        "dt",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "ins",
        "kbd",
        "li",
        "mark",
        "ol",
        "p",
        "pre",
        "s",
        "span",
        "strong",
        "sub",
        "summary",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> =
        HashSet::from(["class", "id", "title", "lang", "dir", "aria-hidden", "role"]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("img", &["title", "width", "height", "alt"]);
    builder.add_tag_attributes("pre", &["data-language"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.description_lists = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.tasklist_classes = true;
    render.list_style = ListStyleType::Dash;
    render.r#unsafe = true;
    render.sourcepos = false;
}

#[cfg(test)]
mod tests {
    use comrak::markdown_to_html;

    use super::*;

    #[test]
    fn fixed_extension_set_is_enabled() {
        let options = default_options();
        assert!(options.extension.table);
        assert!(options.extension.strikethrough);
        assert!(options.extension.tasklist);
        assert!(options.extension.autolink);
        assert!(options.extension.description_lists);
        assert!(options.render.tasklist_classes);
    }

    #[test]
    fn task_items_render_as_disabled_checkboxes_with_shared_class() {
        let html = markdown_to_html("- [x] done\n- [ ] todo\n", &default_options());

        assert_eq!(html.matches(TASK_CHECKBOX_CLASS).count(), 2);
        assert_eq!(html.matches("disabled").count(), 2);
        assert_eq!(html.matches("checked").count(), 1);
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn sanitizer_keeps_task_inputs_and_code_markup() {
        let raw = markdown_to_html("- [x] done\n", &default_options());
        let clean = build_body_sanitizer().clean(&raw).to_string();
        assert!(clean.contains(TASK_CHECKBOX_CLASS));
        assert!(clean.contains("disabled"));
        assert!(clean.contains("checked"));

        let block = "<div class=\"highlight\"><pre class=\"syntax-lang-rust\" data-language=\"rust\"><code class=\"language-rust syntax-code\"><span class=\"syntax-source\">fn</span>\n</code></pre></div>\n";
        let clean = build_body_sanitizer().clean(block).to_string();
        assert!(clean.contains("<div class=\"highlight\">"));
        assert!(clean.contains("<pre class=\"syntax-lang-rust\" data-language=\"rust\">"));
        assert!(clean.contains("<code class=\"language-rust syntax-code\">"));
        assert!(clean.contains("<span class=\"syntax-source\">fn</span>"));
    }

    #[test]
    fn sanitizer_drops_document_tags_and_scripts() {
        let raw = markdown_to_html(
            "<html>\n<body onload=\"x()\">\n\ntext\n\n</body>\n</html>\n<script>alert(1)</script>\n",
            &default_options(),
        );
        assert!(raw.contains("<body"));

        let clean = build_body_sanitizer().clean(&raw).to_string();
        assert!(!clean.contains("<body"));
        assert!(!clean.contains("<html"));
        assert!(!clean.contains("onload"));
        assert!(!clean.contains("<script"));
        assert!(!clean.contains("alert"));
        assert!(clean.contains("text"));
    }

    #[test]
    fn bare_urls_autolink() {
        let html = markdown_to_html("see https://example.com now\n", &default_options());
        assert!(html.contains("<a href=\"https://example.com\">"));
    }

    #[test]
    fn definition_lists_render() {
        let html = markdown_to_html("Term\n\n: Details here\n", &default_options());
        assert!(html.contains("<dl>"));
        assert!(html.contains("<dt>"));
        assert!(html.contains("<dd>"));
    }
}
