use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use tracing::warn;

/// Class on the wrapper element around every rendered code block. The base
/// stylesheet targets it for code-block styling.
pub const CODE_BLOCK_CLASS: &str = "highlight";

const PLAIN_TEXT_TOKEN: &str = "text";

/// Tokenizer resolved from a fence's language tag. Resolution never fails:
/// anything unrecognised becomes [`Lexer::PlainText`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum Lexer<'a> {
    Syntax(&'a SyntaxReference),
    PlainText,
}

/// Resolve a fence language tag (the info string up to its first
/// whitespace) against the syntax set by token, name, then extension.
pub(crate) fn resolve_lexer<'a>(syntax_set: &'a SyntaxSet, tag: &str) -> Lexer<'a> {
    let token = tag.trim().to_ascii_lowercase();
    if token.is_empty() || token == PLAIN_TEXT_TOKEN {
        return Lexer::PlainText;
    }

    syntax_set
        .find_syntax_by_token(&token)
        .or_else(|| syntax_set.find_syntax_by_name(tag.trim()))
        .or_else(|| syntax_set.find_syntax_by_extension(&token))
        .filter(|syntax| syntax.name != "Plain Text")
        .map_or(Lexer::PlainText, Lexer::Syntax)
}

impl Lexer<'_> {
    /// Short lowercase language label used in classes and `data-language`.
    pub(crate) fn label(&self) -> String {
        match self {
            Lexer::Syntax(syntax) => class_token(&syntax.name),
            Lexer::PlainText => PLAIN_TEXT_TOKEN.to_string(),
        }
    }

    /// Render `code` into a highlighted block. Tokenizer failures degrade to
    /// the plain-text rendering instead of failing the document.
    pub(crate) fn render(
        &self,
        code: &str,
        syntax_set: &SyntaxSet,
        class_style: &ClassStyle,
    ) -> String {
        let body = match self {
            Lexer::Syntax(syntax) => {
                match highlight_lines(code, syntax, syntax_set, class_style) {
                    Ok(html) => html,
                    Err(message) => {
                        warn!(
                            target = "application::render::highlight",
                            language = %syntax.name,
                            error = %message,
                            "syntax highlighting failed; rendering plain text"
                        );
                        return Lexer::PlainText.render(code, syntax_set, class_style);
                    }
                }
            }
            Lexer::PlainText => ammonia::clean_text(&with_trailing_newline(code)),
        };

        let label = self.label();
        format!(
            "<div class=\"{CODE_BLOCK_CLASS}\"><pre class=\"syntax-lang-{label}\" data-language=\"{label}\"><code class=\"language-{label} syntax-code\">{body}</code></pre></div>\n"
        )
    }
}

fn highlight_lines(
    code: &str,
    syntax: &SyntaxReference,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, String> {
    let code_with_newline = with_trailing_newline(code);
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| err.to_string())?;
    }

    Ok(generator.finalize())
}

fn with_trailing_newline(code: &str) -> String {
    let mut owned = code.to_string();
    if !owned.ends_with('\n') {
        owned.push('\n');
    }
    owned
}

/// Reduce a syntax name to a CSS-class-safe token (`C++` → `c++` is kept,
/// `Objective-C` → `objective-c`, spaces become dashes).
fn class_token(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            'a'..='z' | '0'..='9' | '-' | '_' | '+' | '#' => ch,
            'A'..='Z' => ch.to_ascii_lowercase(),
            _ => '-',
        })
        .collect()
}
