use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use syntect::{html::ClassStyle, parsing::SyntaxSet};

use super::highlight::{Lexer, resolve_lexer};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RewriteOutcome {
    pub(crate) code_blocks: usize,
    pub(crate) plain_text_blocks: usize,
}

/// Replace every code block node with pre-rendered highlighted HTML so the
/// formatter never emits a bare `<pre>` for block code.
pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> RewriteOutcome {
    let mut walker = RewriteWalker {
        syntax_set,
        class_style,
        outcome: RewriteOutcome::default(),
    };
    for node in root.descendants() {
        walker.visit(node);
    }
    walker.outcome
}

struct RewriteWalker<'a> {
    syntax_set: &'a SyntaxSet,
    class_style: &'a ClassStyle,
    outcome: RewriteOutcome,
}

impl RewriteWalker<'_> {
    fn visit(&mut self, node: &AstNode<'_>) {
        let Some((info, literal)) = extract_code_block(node) else {
            return;
        };

        let tag = info.split_whitespace().next().unwrap_or_default();
        let lexer = resolve_lexer(self.syntax_set, tag);
        if matches!(lexer, Lexer::PlainText) {
            self.outcome.plain_text_blocks += 1;
        }
        self.outcome.code_blocks += 1;

        let html = lexer.render(&literal, self.syntax_set, self.class_style);
        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal: html,
        });
    }
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comrak::{Arena, format_html, parse_document};

    use crate::application::render::service::{
        CLASS_STYLE, config::default_options, markdown_renderer,
    };

    fn render(markdown: &str) -> (String, RewriteOutcome) {
        let options = default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);
        let renderer = markdown_renderer();

        let outcome = rewrite_ast(root, renderer.syntax_set(), &CLASS_STYLE);
        let mut html = String::new();
        format_html(root, &options, &mut html).expect("html");
        (html, outcome)
    }

    #[test]
    fn fenced_blocks_are_highlighted() {
        let (html, outcome) = render("```rust\nfn main() {}\n```\n");
        assert_eq!(outcome.code_blocks, 1);
        assert_eq!(outcome.plain_text_blocks, 0);
        assert!(html.contains("<div class=\"highlight\">"));
        assert!(html.contains("language-rust"));
    }

    #[test]
    fn info_string_meta_is_ignored_for_lookup() {
        let (html, outcome) = render("```python title=\"x.py\"\nprint(1)\n```\n");
        assert_eq!(outcome.plain_text_blocks, 0);
        assert!(html.contains("language-python"));
    }

    #[test]
    fn indented_blocks_route_through_plain_text() {
        let (html, outcome) = render("para\n\n    indented <code>\n");
        assert_eq!(outcome.code_blocks, 1);
        assert_eq!(outcome.plain_text_blocks, 1);
        assert!(html.contains("indented&#32;&lt;code&gt;"));
        assert!(!html.contains("<pre><code>"));
    }

    #[test]
    fn unknown_language_renders_escaped_plain_block() {
        let (html, outcome) = render("```zzqqlang\n<not> & highlighted\n```\n");
        assert_eq!(outcome.plain_text_blocks, 1);
        assert!(html.contains("&lt;not&gt;&#32;&amp;&#32;highlighted"));
        assert!(!html.contains("<span"));
    }

    #[test]
    fn inline_code_is_not_highlighted() {
        let (html, outcome) = render("use `let x = 1;` inline\n");
        assert_eq!(outcome.code_blocks, 0);
        assert!(html.contains("<code>let x = 1;</code>"));
        assert!(!html.contains("highlight"));
    }

    #[test]
    fn unterminated_fence_still_renders() {
        let (html, outcome) = render("```rust\nfn open() {\n");
        assert_eq!(outcome.code_blocks, 1);
        assert!(html.contains("open"));
    }
}
