//! Typed style configuration shared by preview and export rendering.
//!
//! Callers hand in loosely-typed [`StyleOptions`] (from a configuration file,
//! CLI flags or a request body). Resolving them into a [`StyleConfig`] clamps
//! every field into its declared domain, so nothing downstream ever sees a
//! value that could produce malformed CSS.

use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const FONT_SIZE_MIN_PX: u32 = 12;
pub const FONT_SIZE_MAX_PX: u32 = 22;
pub const DEFAULT_FONT_SIZE_PX: u32 = 16;

/// Line height is kept in hundredths to stay exact when formatted.
pub const LINE_HEIGHT_MIN: u32 = 120;
pub const LINE_HEIGHT_MAX: u32 = 220;
pub const DEFAULT_LINE_HEIGHT: u32 = 150;

pub const PARAGRAPH_SPACING_MIN_PX: u32 = 8;
pub const PARAGRAPH_SPACING_MAX_PX: u32 = 40;
pub const DEFAULT_PARAGRAPH_SPACING_PX: u32 = 20;

pub const CODE_SIZE_MIN_PERCENT: u32 = 70;
pub const CODE_SIZE_MAX_PERCENT: u32 = 100;
pub const DEFAULT_CODE_SIZE_PERCENT: u32 = 85;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {field} `{value}`")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Body font stack selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontFamily {
    #[default]
    System,
    Serif,
    Mono,
}

impl FontFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            FontFamily::System => "system",
            FontFamily::Serif => "serif",
            FontFamily::Mono => "mono",
        }
    }

    /// CSS `font-family` value for the stack.
    pub fn css_stack(self) -> &'static str {
        match self {
            FontFamily::System => {
                "-apple-system, BlinkMacSystemFont, \"Segoe UI\", \"Liberation Sans\", Helvetica, Arial, sans-serif"
            }
            FontFamily::Serif => {
                "Georgia, Cambria, \"Liberation Serif\", \"Times New Roman\", Times, serif"
            }
            FontFamily::Mono => {
                "ui-monospace, SFMono-Regular, \"SF Mono\", Menlo, Consolas, \"Liberation Mono\", monospace"
            }
        }
    }
}

impl FromStr for FontFamily {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "system" | "sans" | "sans-serif" => Ok(FontFamily::System),
            "serif" => Ok(FontFamily::Serif),
            "mono" | "monospace" => Ok(FontFamily::Mono),
            _ => Err(UnknownVariant::new("font family", value)),
        }
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete page margin presets. A smaller preset always yields more usable
/// page width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageMargin {
    Narrow,
    #[default]
    Normal,
    Wide,
}

impl PageMargin {
    pub fn as_str(self) -> &'static str {
        match self {
            PageMargin::Narrow => "narrow",
            PageMargin::Normal => "normal",
            PageMargin::Wide => "wide",
        }
    }

    /// `(vertical, horizontal)` margins in millimetres.
    pub fn margins_mm(self) -> (u32, u32) {
        match self {
            PageMargin::Narrow => (15, 15),
            PageMargin::Normal => (20, 25),
            PageMargin::Wide => (30, 40),
        }
    }

    /// CSS `margin` shorthand for an `@page` rule.
    pub fn css_margin(self) -> String {
        let (vertical, horizontal) = self.margins_mm();
        format!("{} {}", format_cm(vertical), format_cm(horizontal))
    }
}

impl FromStr for PageMargin {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "narrow" => Ok(PageMargin::Narrow),
            "normal" => Ok(PageMargin::Normal),
            "wide" => Ok(PageMargin::Wide),
            _ => Err(UnknownVariant::new("page margin", value)),
        }
    }
}

impl fmt::Display for PageMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn format_cm(mm: u32) -> String {
    if mm % 10 == 0 {
        format!("{}cm", mm / 10)
    } else {
        format!("{}.{}cm", mm / 10, mm % 10)
    }
}

/// Caller-supplied style knobs before validation. Every field is optional;
/// an absent field keeps the base stylesheet's value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StyleOptions {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub line_height: Option<f64>,
    pub paragraph_spacing: Option<f64>,
    pub code_size: Option<f64>,
    pub page_margin: Option<String>,
}

impl StyleOptions {
    /// Layer `overrides` on top of `self`; fields set in `overrides` win.
    pub fn merge(self, overrides: StyleOptions) -> StyleOptions {
        StyleOptions {
            font_family: overrides.font_family.or(self.font_family),
            font_size: overrides.font_size.or(self.font_size),
            line_height: overrides.line_height.or(self.line_height),
            paragraph_spacing: overrides.paragraph_spacing.or(self.paragraph_spacing),
            code_size: overrides.code_size.or(self.code_size),
            page_margin: overrides.page_margin.or(self.page_margin),
        }
    }

    pub fn resolve(&self) -> StyleConfig {
        StyleConfig::from(self)
    }
}

/// Validated style configuration. Fields are private so every value that
/// exists has already been clamped into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleConfig {
    font_family: Option<FontFamily>,
    font_size: Option<u32>,
    line_height: Option<u32>,
    paragraph_spacing: Option<u32>,
    code_size: Option<u32>,
    page_margin: Option<PageMargin>,
}

impl StyleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_family(mut self, family: FontFamily) -> Self {
        self.font_family = Some(family);
        self
    }

    pub fn with_font_size(mut self, px: f64) -> Self {
        self.font_size = Some(clamp_integer(
            "font_size",
            px,
            1.0,
            FONT_SIZE_MIN_PX,
            FONT_SIZE_MAX_PX,
            DEFAULT_FONT_SIZE_PX,
        ));
        self
    }

    pub fn with_line_height(mut self, ratio: f64) -> Self {
        self.line_height = Some(clamp_integer(
            "line_height",
            ratio,
            100.0,
            LINE_HEIGHT_MIN,
            LINE_HEIGHT_MAX,
            DEFAULT_LINE_HEIGHT,
        ));
        self
    }

    pub fn with_paragraph_spacing(mut self, px: f64) -> Self {
        self.paragraph_spacing = Some(clamp_integer(
            "paragraph_spacing",
            px,
            1.0,
            PARAGRAPH_SPACING_MIN_PX,
            PARAGRAPH_SPACING_MAX_PX,
            DEFAULT_PARAGRAPH_SPACING_PX,
        ));
        self
    }

    pub fn with_code_size(mut self, percent: f64) -> Self {
        self.code_size = Some(clamp_integer(
            "code_size",
            percent,
            1.0,
            CODE_SIZE_MIN_PERCENT,
            CODE_SIZE_MAX_PERCENT,
            DEFAULT_CODE_SIZE_PERCENT,
        ));
        self
    }

    pub fn with_page_margin(mut self, margin: PageMargin) -> Self {
        self.page_margin = Some(margin);
        self
    }

    pub fn font_family(&self) -> Option<FontFamily> {
        self.font_family
    }

    /// Body font size in px.
    pub fn font_size(&self) -> Option<u32> {
        self.font_size
    }

    /// Line height in hundredths (150 = 1.5).
    pub fn line_height(&self) -> Option<u32> {
        self.line_height
    }

    pub fn paragraph_spacing(&self) -> Option<u32> {
        self.paragraph_spacing
    }

    pub fn code_size(&self) -> Option<u32> {
        self.code_size
    }

    pub fn page_margin(&self) -> Option<PageMargin> {
        self.page_margin
    }
}

impl From<&StyleOptions> for StyleConfig {
    fn from(options: &StyleOptions) -> Self {
        let mut config = StyleConfig::new();
        if let Some(family) = options.font_family.as_deref() {
            config = config.with_font_family(parse_or_default("font_family", family));
        }
        if let Some(px) = options.font_size {
            config = config.with_font_size(px);
        }
        if let Some(ratio) = options.line_height {
            config = config.with_line_height(ratio);
        }
        if let Some(px) = options.paragraph_spacing {
            config = config.with_paragraph_spacing(px);
        }
        if let Some(percent) = options.code_size {
            config = config.with_code_size(percent);
        }
        if let Some(margin) = options.page_margin.as_deref() {
            config = config.with_page_margin(parse_or_default("page_margin", margin));
        }
        config
    }
}

fn parse_or_default<T>(field: &'static str, raw: &str) -> T
where
    T: FromStr<Err = UnknownVariant> + Default + fmt::Display,
{
    raw.parse().unwrap_or_else(|err: UnknownVariant| {
        let fallback = T::default();
        debug!(
            target = "domain::style",
            field,
            error = %err,
            fallback = %fallback,
            "style value replaced with default"
        );
        fallback
    })
}

/// Clamp `value` (in caller units) into `[min, max] / scale`, then scale and
/// round into stored units.
fn clamp_integer(
    field: &'static str,
    value: f64,
    scale: f64,
    min: u32,
    max: u32,
    default: u32,
) -> u32 {
    if !value.is_finite() {
        debug!(
            target = "domain::style",
            field, default, "non-finite style value replaced with default"
        );
        return default;
    }

    let lower = f64::from(min) / scale;
    let upper = f64::from(max) / scale;
    let bounded = value.clamp(lower, upper);
    if bounded != value {
        debug!(
            target = "domain::style",
            field,
            requested = value,
            min = lower,
            max = upper,
            "style value clamped into range"
        );
    }
    // In range [min, max] after clamping, so the cast is lossless.
    (bounded * scale).round().clamp(f64::from(min), f64::from(max)) as u32
}

/// Formats hundredths as a unitless CSS number (`150` → `1.5`).
pub fn format_hundredths(value: u32) -> String {
    let whole = value / 100;
    let fraction = value % 100;
    if fraction == 0 {
        whole.to_string()
    } else if fraction % 10 == 0 {
        format!("{whole}.{}", fraction / 10)
    } else {
        format!("{whole}.{fraction:02}")
    }
}
