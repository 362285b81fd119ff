use std::{
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use mdprint::{
    application::error::AppError,
    application::render::{
        DEFAULT_TITLE, RenderError, RenderPipeline, RenderTarget, style::stylesheets_for,
    },
    config::{self, CssArgs, ExportArgs, PreviewArgs, STDIO_PATH, Settings},
    infra::{
        error::InfraError,
        print::{ChromePrintEngine, inline_stylesheets},
        telemetry,
    },
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(origin = report.source, error = %report.summary(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(origin = report.source, error = %report.summary(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Preview(args) => run_preview(settings, args).await,
        config::Command::Export(args) => run_export(settings, *args).await,
        config::Command::Css(args) => run_css(settings, args).await,
    }
}

async fn run_preview(settings: Settings, args: PreviewArgs) -> Result<(), AppError> {
    let input = read_input(&args.input).await?;
    let pipeline = RenderPipeline::preview_only();
    let html = pipeline.render_preview(&input.markdown, &settings.style)?;

    let output = args.output.unwrap_or_else(|| PathBuf::from(STDIO_PATH));
    write_output(&output, html.as_bytes()).await
}

async fn run_export(settings: Settings, args: ExportArgs) -> Result<(), AppError> {
    let input = read_input(&args.input).await?;
    let title = args.title.clone().unwrap_or_else(|| input.stem.clone());
    let extension = if args.html { "html" } else { "pdf" };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.{extension}", input.stem)));

    if args.html {
        let pipeline = RenderPipeline::preview_only();
        let job = pipeline.export_document(&input.markdown, &settings.style, &title)?;
        let document = inline_stylesheets(&job.document, &job.stylesheets)
            .map_err(RenderError::from)?;
        return write_output(&output, document.as_bytes()).await;
    }

    let engine = ChromePrintEngine::new(settings.print.clone())?;
    let pipeline = RenderPipeline::new(Arc::new(engine));
    let timeout = settings.print.timeout;
    let style = settings.style;
    let markdown = input.markdown;

    let task = tokio::task::spawn_blocking(move || {
        pipeline.render_export(&markdown, &style, &title)
    });
    let bytes = match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined
            .map_err(|err| AppError::unexpected(format!("export task failed: {err}")))??,
        Err(_) => {
            return Err(AppError::Timeout {
                seconds: timeout.as_secs(),
            });
        }
    };

    write_output(&output, &bytes).await?;
    info!(
        output = %output.display(),
        bytes = bytes.len(),
        "export written"
    );
    Ok(())
}

async fn run_css(settings: Settings, args: CssArgs) -> Result<(), AppError> {
    let target = RenderTarget::from(args.target);
    let css = stylesheets_for(&settings.style, target).combined();
    write_output(Path::new(STDIO_PATH), css.as_bytes()).await
}

#[derive(Debug)]
struct Input {
    markdown: String,
    /// File stem used for default titles and output names.
    stem: String,
}

async fn read_input(path: &Path) -> Result<Input, AppError> {
    if path == Path::new(STDIO_PATH) {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .map_err(InfraError::from)?;
        return Ok(Input {
            markdown: decode_markdown(bytes)?,
            stem: DEFAULT_TITLE.to_string(),
        });
    }

    check_extension(path)?;
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        AppError::input(format!("failed to read `{}`: {err}", path.display()))
    })?;
    Ok(Input {
        markdown: decode_markdown(bytes)?,
        stem: input_stem(path),
    })
}

fn check_extension(path: &Path) -> Result<(), AppError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AppError::input(format!(
            "`{}` is not a markdown file (expected .md, .markdown or .txt)",
            path.display()
        ))),
    }
}

fn decode_markdown(bytes: Vec<u8>) -> Result<String, AppError> {
    String::from_utf8(bytes).map_err(|_| AppError::input("input is not valid UTF-8"))
}

fn input_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::trim)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    if path == Path::new(STDIO_PATH) {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(bytes)
            .await
            .map_err(InfraError::from)?;
        stdout
            .flush()
            .await
            .map_err(InfraError::from)?;
        return Ok(());
    }

    tokio::fs::write(path, bytes).await.map_err(|err| {
        AppError::input(format!("failed to write `{}`: {err}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_extensions_are_accepted_case_insensitively() {
        assert!(check_extension(Path::new("notes.md")).is_ok());
        assert!(check_extension(Path::new("README.MARKDOWN")).is_ok());
        assert!(check_extension(Path::new("plain.txt")).is_ok());
    }

    #[test]
    fn other_extensions_are_rejected() {
        assert!(matches!(
            check_extension(Path::new("slides.pdf")),
            Err(AppError::Input(_))
        ));
        assert!(matches!(
            check_extension(Path::new("Makefile")),
            Err(AppError::Input(_))
        ));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(matches!(
            decode_markdown(vec![0x66, 0xff, 0xfe]),
            Err(AppError::Input(_))
        ));
        assert_eq!(decode_markdown(b"# ok".to_vec()).expect("utf8"), "# ok");
    }

    #[test]
    fn stems_default_to_document() {
        assert_eq!(input_stem(Path::new("/tmp/report.md")), "report");
        assert_eq!(input_stem(Path::new("/")), DEFAULT_TITLE);
    }
}
