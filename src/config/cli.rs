use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::application::render::RenderTarget;
use crate::domain::style::StyleOptions;

/// Path value meaning standard input (or standard output for `-o`).
pub const STDIO_PATH: &str = "-";

/// Command-line arguments for the mdprint binary.
#[derive(Debug, Parser)]
#[command(
    name = "mdprint",
    version,
    about = "Render Markdown into a styled HTML preview or a paginated PDF"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MDPRINT_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a standalone HTML preview document.
    Preview(PreviewArgs),
    /// Render a paginated PDF through headless Chromium.
    Export(Box<ExportArgs>),
    /// Print the compiled stylesheets for a render target.
    Css(CssArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PreviewArgs {
    /// Markdown input file, or `-` for standard input.
    #[arg(value_name = "INPUT", default_value = STDIO_PATH, value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Write the preview here instead of standard output.
    #[arg(short = 'o', long = "output", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub style: StyleOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    /// Markdown input file, or `-` for standard input.
    #[arg(value_name = "INPUT", default_value = STDIO_PATH, value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output path; defaults to `<input stem>.pdf` (or `-` for standard output).
    #[arg(short = 'o', long = "output", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Document title; defaults to the input file stem.
    #[arg(long = "title", value_name = "TITLE")]
    pub title: Option<String>,

    /// Emit the assembled HTML document instead of printing a PDF.
    #[arg(long = "html", action = clap::ArgAction::SetTrue)]
    pub html: bool,

    #[command(flatten)]
    pub style: StyleOverrides,

    #[command(flatten)]
    pub print: PrintOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct CssArgs {
    /// Render target whose stylesheets are printed.
    #[arg(long = "target", value_enum, default_value_t = TargetArg::Export)]
    pub target: TargetArg,

    #[command(flatten)]
    pub style: StyleOverrides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    Preview,
    Export,
}

impl From<TargetArg> for RenderTarget {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Preview => RenderTarget::Preview,
            TargetArg::Export => RenderTarget::Export,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct StyleOverrides {
    /// Body font family (system|serif|mono).
    #[arg(long = "font-family", value_name = "FAMILY")]
    pub font_family: Option<String>,

    /// Body font size in px (12-22).
    #[arg(long = "font-size", value_name = "PX")]
    pub font_size: Option<f64>,

    /// Unitless body line height (1.2-2.2).
    #[arg(long = "line-height", value_name = "RATIO")]
    pub line_height: Option<f64>,

    /// Space below paragraphs and other blocks in px (8-40).
    #[arg(long = "paragraph-spacing", value_name = "PX")]
    pub paragraph_spacing: Option<f64>,

    /// Code font size relative to body text, in percent (70-100).
    #[arg(long = "code-size", value_name = "PERCENT")]
    pub code_size: Option<f64>,

    /// Page margin preset for export (narrow|normal|wide).
    #[arg(long = "page-margin", value_name = "PRESET")]
    pub page_margin: Option<String>,
}

impl StyleOverrides {
    pub fn to_options(&self) -> StyleOptions {
        StyleOptions {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            line_height: self.line_height,
            paragraph_spacing: self.paragraph_spacing,
            code_size: self.code_size,
            page_margin: self.page_margin.clone(),
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct PrintOverrides {
    /// Override the Chromium executable used for printing.
    #[arg(long = "chrome-path", value_name = "PATH", value_hint = ValueHint::ExecutablePath)]
    pub chrome_path: Option<PathBuf>,

    /// Toggle the Chromium sandbox.
    #[arg(
        long = "sandbox",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub sandbox: Option<bool>,

    /// Override the export timeout.
    #[arg(long = "timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        global = true,
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}
