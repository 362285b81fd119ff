//! Headless Chromium print engine.

use std::cell::Cell;
use std::io::Write;

use headless_chrome::{Browser, LaunchOptions, types::PrintToPdfOptions};
use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str};
use tracing::{debug, info};

use crate::application::render::{PrintEngine, PrintError, PrintJob, Stylesheets};
use crate::config::PrintSettings;

use super::error::InfraError;

const CREATION_DATE_KEY: &[u8] = b"/CreationDate";
const MOD_DATE_KEY: &[u8] = b"/ModDate";
const TRAILER_ID_KEY: &[u8] = b"/ID";
const EPOCH_DIGITS: &[u8] = b"19700101000000";

/// Prints assembled documents through a freshly launched headless Chromium.
/// Each call owns its browser so calls never share state.
#[derive(Debug, Clone)]
pub struct ChromePrintEngine {
    settings: PrintSettings,
}

impl ChromePrintEngine {
    pub fn new(settings: PrintSettings) -> Result<Self, InfraError> {
        if let Some(path) = settings.chrome_path.as_ref()
            && !path.is_file()
        {
            return Err(InfraError::print_setup(format!(
                "chromium executable `{}` not found",
                path.display()
            )));
        }
        Ok(Self { settings })
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>, PrintError> {
        LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.settings.sandbox)
            .path(self.settings.chrome_path.clone())
            .idle_browser_timeout(self.settings.timeout)
            .build()
            .map_err(|err| PrintError::unavailable(format!("invalid launch options: {err}")))
    }
}

impl PrintEngine for ChromePrintEngine {
    fn print(&self, job: &PrintJob) -> Result<Vec<u8>, PrintError> {
        let document = inline_stylesheets(&job.document, &job.stylesheets)?;

        let mut file = tempfile::Builder::new()
            .prefix("mdprint-")
            .suffix(".html")
            .tempfile()
            .map_err(|err| PrintError::engine(format!("failed to create temp document: {err}")))?;
        file.write_all(document.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|err| PrintError::engine(format!("failed to write temp document: {err}")))?;
        let url = format!("file://{}", file.path().display());

        let browser = Browser::new(self.launch_options()?)
            .map_err(|err| PrintError::unavailable(format!("failed to launch chromium: {err}")))?;
        info!(
            target = "infra::print",
            sandbox = self.settings.sandbox,
            "chromium launched"
        );

        let tab = browser
            .new_tab()
            .map_err(|err| PrintError::engine(format!("failed to open tab: {err}")))?;
        tab.set_default_timeout(self.settings.timeout);
        tab.navigate_to(&url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|err| PrintError::engine(format!("failed to load document: {err}")))?;

        let options = PrintToPdfOptions {
            display_header_footer: Some(false),
            print_background: Some(true),
            prefer_css_page_size: Some(true),
            ..Default::default()
        };
        let mut pdf = tab
            .print_to_pdf(Some(options))
            .map_err(|err| PrintError::engine(format!("failed to print document: {err}")))?;

        let normalized = normalize_pdf_metadata(&mut pdf);
        debug!(
            target = "infra::print",
            bytes = pdf.len(),
            normalized,
            "document printed"
        );
        Ok(pdf)
    }
}

/// Append the stylesheets, base first, to the document head.
pub fn inline_stylesheets(
    document: &str,
    stylesheets: &Stylesheets,
) -> Result<String, PrintError> {
    let mut styles = format!("<style>\n{}</style>\n", stylesheets.base);
    if !stylesheets.overrides.is_empty() {
        styles.push_str(&format!("<style>\n{}</style>\n", stylesheets.overrides));
    }

    let injected = Cell::new(false);
    let html = rewrite_str(
        document,
        RewriteStrSettings {
            element_content_handlers: vec![element!("head", |el| {
                el.append(&styles, ContentType::Html);
                injected.set(true);
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| PrintError::engine(format!("failed to inline stylesheets: {err}")))?;

    if !injected.get() {
        return Err(PrintError::engine("document has no <head> element"));
    }
    Ok(html)
}

/// Overwrite the volatile parts of a PDF (creation and modification dates,
/// trailer `/ID`) with fixed values of the same length, so cross-reference
/// offsets stay valid. Returns how many values were rewritten.
pub(crate) fn normalize_pdf_metadata(pdf: &mut [u8]) -> usize {
    let mut rewritten = 0;
    for key in [CREATION_DATE_KEY, MOD_DATE_KEY] {
        for start in find_all(pdf, key) {
            if rewrite_date(pdf, start + key.len()) {
                rewritten += 1;
            }
        }
    }
    for start in find_all(pdf, TRAILER_ID_KEY) {
        rewritten += rewrite_id(pdf, start + TRAILER_ID_KEY.len());
    }
    rewritten
}

fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(index, _)| index)
        .collect()
}

/// Rewrite a `(D:YYYYMMDDHHmmSS...)` literal following `from`.
fn rewrite_date(pdf: &mut [u8], from: usize) -> bool {
    let mut index = skip_whitespace(pdf, from);
    if pdf.get(index) != Some(&b'(') {
        return false;
    }
    index += 1;

    let mut digit = 0;
    while let Some(&byte) = pdf.get(index) {
        match byte {
            b')' => return digit > 0,
            b'0'..=b'9' => {
                pdf[index] = EPOCH_DIGITS.get(digit).copied().unwrap_or(b'0');
                digit += 1;
            }
            _ => {}
        }
        index += 1;
    }
    false
}

/// Zero every hex string in a `[<...> <...>]` array following `from`.
fn rewrite_id(pdf: &mut [u8], from: usize) -> usize {
    let mut index = skip_whitespace(pdf, from);
    if pdf.get(index) != Some(&b'[') {
        return 0;
    }
    index += 1;

    let mut rewritten = 0;
    let mut in_hex = false;
    while let Some(&byte) = pdf.get(index) {
        match byte {
            b']' => break,
            b'<' => in_hex = true,
            b'>' => {
                if in_hex {
                    rewritten += 1;
                }
                in_hex = false;
            }
            _ if in_hex && byte.is_ascii_hexdigit() => pdf[index] = b'0',
            _ => {}
        }
        index += 1;
    }
    rewritten
}

fn skip_whitespace(bytes: &[u8], mut index: usize) -> usize {
    while bytes.get(index).is_some_and(u8::is_ascii_whitespace) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheets_are_inlined_in_order() {
        let document = "<!DOCTYPE html>\n<html><head><title>t</title></head><body></body></html>";
        let sheets = Stylesheets::new("body { color: black; }\n", "body { font-size: 20px; }\n");
        let html = inline_stylesheets(document, &sheets).expect("inline");

        let base_at = html.find("color: black").expect("base");
        let override_at = html.find("font-size: 20px").expect("override");
        let head_end = html.find("</head>").expect("head");
        assert!(base_at < override_at);
        assert!(override_at < head_end);
        assert!(html.contains("<title>t</title>"));
    }

    #[test]
    fn empty_overrides_emit_a_single_style_element() {
        let document = "<html><head></head><body></body></html>";
        let sheets = Stylesheets::new("p { margin: 0; }\n", "");
        let html = inline_stylesheets(document, &sheets).expect("inline");
        assert_eq!(html.matches("<style>").count(), 1);
    }

    #[test]
    fn documents_without_head_are_rejected() {
        let sheets = Stylesheets::new("p {}", "");
        let err = inline_stylesheets("<p>no head</p>", &sheets).expect_err("missing head");
        assert!(matches!(err, PrintError::Engine { .. }));
    }

    #[test]
    fn metadata_is_normalized_in_place() {
        let original = b"<< /Producer (Skia/PDF m120) /CreationDate (D:20261019123456+00'00') \
/ModDate (D:20261019123457+00'00') >>\ntrailer\n<< /Size 9 /ID [<A1B2C3> <d4e5f6>] >>"
            .to_vec();
        let mut pdf = original.clone();

        let rewritten = normalize_pdf_metadata(&mut pdf);

        assert_eq!(rewritten, 4);
        assert_eq!(pdf.len(), original.len());
        let text = String::from_utf8(pdf).expect("ascii");
        assert!(text.contains("/CreationDate (D:19700101000000+00'00')"));
        assert!(text.contains("/ModDate (D:19700101000000+00'00')"));
        assert!(text.contains("/ID [<000000> <000000>]"));
        assert!(text.contains("(Skia/PDF m120)"));
    }

    #[test]
    fn normalization_is_stable() {
        let mut first = b"/CreationDate (D:20260101000000Z) /ID [<ff> <ee>]".to_vec();
        normalize_pdf_metadata(&mut first);
        let mut second = first.clone();
        normalize_pdf_metadata(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_chrome_binary_is_a_setup_error() {
        let settings = PrintSettings {
            chrome_path: Some("/nonexistent/mdprint-chromium".into()),
            ..PrintSettings::default()
        };
        assert!(matches!(
            ChromePrintEngine::new(settings),
            Err(InfraError::PrintSetup { .. })
        ));
    }
}
