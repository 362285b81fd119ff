//! Removal of page-geometry at-rules for on-screen output.

use cssparser::{ParseError, Parser, ParserInput, Token};

type CssParseError<'i> = ParseError<'i, ()>;

const PAGE_AT_RULE: &str = "page";

/// Remove every `@page` at-rule, including nested margin-box rules such as
/// `@bottom-center`, from a stylesheet. Everything else is copied through
/// byte for byte. An unterminated `@page` block consumes the rest of the
/// input.
pub fn strip_page_rules(css: &str) -> String {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut stripper = PageRuleStripper {
        css,
        out: String::with_capacity(css.len()),
        copied_from: 0,
    };

    stripper.strip(&mut parser);
    stripper.finish()
}

/// Whether the stylesheet contains a page-geometry at-rule outside comments
/// and strings.
pub fn contains_page_rule(css: &str) -> bool {
    strip_page_rules(css).len() != css.len()
}

struct PageRuleStripper<'a> {
    css: &'a str,
    out: String,
    copied_from: usize,
}

impl PageRuleStripper<'_> {
    fn strip(&mut self, parser: &mut Parser<'_, '_>) {
        loop {
            let rule_start = parser.position().byte_index();
            let token = match parser.next_including_whitespace_and_comments() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };

            match token {
                Token::AtKeyword(ref name) if name.eq_ignore_ascii_case(PAGE_AT_RULE) => {
                    self.out.push_str(&self.css[self.copied_from..rule_start]);
                    skip_at_rule(parser);

                    let mut rule_end = parser.position().byte_index();
                    if self.css[rule_end..].starts_with('\n') {
                        rule_end += 1;
                    }
                    self.copied_from = rule_end;
                }
                Token::CurlyBracketBlock => {
                    let _ = parser.parse_nested_block(|nested| {
                        self.strip(nested);
                        Ok::<_, CssParseError>(())
                    });
                }
                _ => {}
            }
        }
    }

    fn finish(mut self) -> String {
        if self.copied_from < self.css.len() {
            self.out.push_str(&self.css[self.copied_from..]);
        }
        self.out
    }
}

/// Consume the prelude and block of an at-rule, or its terminating `;`.
fn skip_at_rule(parser: &mut Parser<'_, '_>) {
    while let Ok(token) = parser.next_including_whitespace_and_comments() {
        match token {
            Token::Semicolon => break,
            Token::CurlyBracketBlock => {
                let _ = parser.parse_nested_block(|nested| {
                    while nested.next_including_whitespace_and_comments().is_ok() {}
                    Ok::<_, CssParseError>(())
                });
                break;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nested_margin_boxes() {
        let css = "@page {\n  size: A4;\n  @bottom-center {\n    content: counter(page);\n  }\n}\nbody { color: red; }\n";
        assert_eq!(strip_page_rules(css), "body { color: red; }\n");
    }

    #[test]
    fn strips_page_selectors_and_case_variants() {
        let css = "@PAGE :first { margin: 0; }\np { margin: 0; }\n@page wide{margin:1cm}";
        assert_eq!(strip_page_rules(css), "p { margin: 0; }\n");
    }

    #[test]
    fn leaves_similar_identifiers_alone() {
        let css = "@page-break-rules { x: y; }\n.page { color: blue; }\n";
        assert_eq!(strip_page_rules(css), css);
    }

    #[test]
    fn ignores_keyword_inside_comments_and_strings() {
        let css = "/* @page { } */\na::after { content: \"@page {\"; }\n";
        assert_eq!(strip_page_rules(css), css);
    }

    #[test]
    fn unterminated_block_consumes_remainder() {
        let css = "p { margin: 0; }\n@page { size: A4;";
        assert_eq!(strip_page_rules(css), "p { margin: 0; }\n");
    }

    #[test]
    fn strips_page_rules_nested_in_media_blocks() {
        let css = "@media print {\n  @page { margin: 0; }\n  p { color: black; }\n}\n";
        assert_eq!(
            strip_page_rules(css),
            "@media print {\n    p { color: black; }\n}\n"
        );
    }

    #[test]
    fn keeps_braces_inside_strings() {
        let css = "a::before { content: \"}\"; }\n@page { size: A4; }\n";
        assert_eq!(strip_page_rules(css), "a::before { content: \"}\"; }\n");
    }

    #[test]
    fn detects_page_rules() {
        assert!(contains_page_rule("@page { margin: 1cm; }"));
        assert!(!contains_page_rule("body { margin: 0; }"));
    }
}
