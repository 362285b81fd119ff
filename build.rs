use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use syntect::dumps::dump_to_uncompressed_file;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, css_for_theme_with_class_style};
use two_face::syntax;

const DOCUMENT_CSS: &str = "static/document.css";
const THEME_NAME: &str = "InspiredGitHub";

fn main() {
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(err) => panic!("OUT_DIR not set: {err}"),
    };

    prepare_document_css(&out_dir).expect("failed to prepare document stylesheet");
    write_syntax_pack(&out_dir).expect("failed to write syntax pack");

    println!("cargo:rerun-if-changed={DOCUMENT_CSS}");
    println!("cargo:rerun-if-changed=build.rs");
}

fn prepare_document_css(out_dir: &Path) -> Result<(), String> {
    let source = Path::new(DOCUMENT_CSS);
    let base_css = fs::read_to_string(source)
        .map_err(|err| format!("failed to read {}: {err}", source.display()))?;
    let theme_css = render_theme_css()?;

    let mut combined = String::with_capacity(base_css.len() + theme_css.len() + 100);
    combined.push_str(base_css.trim_end());
    combined.push_str(&format!(
        "\n\n/* Syntax theme ({THEME_NAME}), generated at build time */\n"
    ));
    combined.push_str(&theme_css);
    if !combined.ends_with('\n') {
        combined.push('\n');
    }

    let dest = out_dir.join("document.css");
    fs::write(&dest, combined)
        .map_err(|err| format!("failed to write {}: {err}", dest.display()))?;

    println!("cargo:rustc-env=DOCUMENT_CSS_FILE={}", dest.display());
    Ok(())
}

fn render_theme_css() -> Result<String, String> {
    let theme_set = ThemeSet::load_defaults();
    let theme = theme_set
        .themes
        .get(THEME_NAME)
        .ok_or_else(|| format!("theme `{THEME_NAME}` not found"))?;

    css_for_theme_with_class_style(theme, ClassStyle::SpacedPrefixed { prefix: "syntax-" })
        .map_err(|err| err.to_string())
}

fn write_syntax_pack(out_dir: &Path) -> Result<(), String> {
    let syntax_set = syntax::extra_newlines();
    let pack_path = out_dir.join("syntaxes.packdump");
    dump_to_uncompressed_file(&syntax_set, &pack_path)
        .map_err(|err| format!("failed to encode syntax set: {err}"))?;

    println!("cargo:rustc-env=SYNTAX_PACK_FILE={}", pack_path.display());

    Ok(())
}
