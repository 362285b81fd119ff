//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::style::{StyleConfig, StyleOptions};

pub use cli::{
    CliArgs, Command, CssArgs, ExportArgs, LoggingOverrides, PreviewArgs, PrintOverrides,
    STDIO_PATH, StyleOverrides, TargetArg,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "mdprint";
const ENV_PREFIX: &str = "MDPRINT";
const DEFAULT_PRINT_TIMEOUT_SECS: u64 = 60;
const MAX_PRINT_TIMEOUT_SECS: u64 = 60 * 60;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub print: PrintSettings,
    pub style: StyleConfig,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct PrintSettings {
    /// Explicit Chromium executable; `None` lets the engine search the system.
    pub chrome_path: Option<PathBuf>,
    pub sandbox: bool,
    pub timeout: Duration,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            sandbox: true,
            timeout: Duration::from_secs(DEFAULT_PRINT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli_overrides(cli);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    print: RawPrintSettings,
    style: StyleOptions,
}

impl RawSettings {
    fn apply_cli_overrides(&mut self, cli: &CliArgs) {
        self.apply_logging_overrides(&cli.logging);
        match &cli.command {
            Command::Preview(args) => self.apply_style_overrides(&args.style),
            Command::Export(args) => {
                self.apply_style_overrides(&args.style);
                self.apply_print_overrides(&args.print);
            }
            Command::Css(args) => self.apply_style_overrides(&args.style),
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_print_overrides(&mut self, overrides: &PrintOverrides) {
        if let Some(path) = overrides.chrome_path.as_ref() {
            self.print.chrome_path = Some(path.clone());
        }
        if let Some(sandbox) = overrides.sandbox {
            self.print.sandbox = Some(sandbox);
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.print.timeout_seconds = Some(seconds);
        }
    }

    fn apply_style_overrides(&mut self, overrides: &StyleOverrides) {
        let base = std::mem::take(&mut self.style);
        self.style = base.merge(overrides.to_options());
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            print,
            style,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let print = build_print_settings(print)?;

        Ok(Self {
            logging,
            print,
            style: style.resolve(),
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_print_settings(print: RawPrintSettings) -> Result<PrintSettings, LoadError> {
    let chrome_path = match print.chrome_path {
        Some(path) if path.as_os_str().is_empty() => {
            return Err(LoadError::invalid(
                "print.chrome_path",
                "path must not be empty",
            ));
        }
        other => other,
    };

    let timeout_secs = print
        .timeout_seconds
        .unwrap_or(DEFAULT_PRINT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "print.timeout_seconds",
            "must be greater than zero",
        ));
    }
    if timeout_secs > MAX_PRINT_TIMEOUT_SECS {
        return Err(LoadError::invalid(
            "print.timeout_seconds",
            format!("must not exceed {MAX_PRINT_TIMEOUT_SECS}"),
        ));
    }

    Ok(PrintSettings {
        chrome_path,
        sandbox: print.sandbox.unwrap_or(true),
        timeout: Duration::from_secs(timeout_secs),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPrintSettings {
    chrome_path: Option<PathBuf>,
    sandbox: Option<bool>,
    timeout_seconds: Option<u64>,
}
