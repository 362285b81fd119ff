use std::error::Error as StdError;

use thiserror::Error;

use crate::{application::render::RenderError, config::LoadError, infra::error::InfraError};

/// Flattened view of an error and its source chain, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    /// Messages joined outermost first. A source whose text is already part
    /// of the message before it is skipped.
    pub fn summary(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.messages.len());
        for message in &self.messages {
            if !parts.last().is_some_and(|last| last.contains(message.as_str())) {
                parts.push(message);
            }
        }
        parts.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("invalid input: {0}")]
    Input(String),
    #[error("export timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Short name of the layer the error originated in, used as a log field.
    pub fn origin(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Infra(_) => "infra",
            AppError::Render(_) | AppError::Timeout { .. } => "render",
            AppError::Input(_) => "input",
            AppError::Unexpected(_) => "unexpected",
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error(self.origin(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::PrintError;

    #[test]
    fn report_walks_the_source_chain() {
        let error = AppError::from(InfraError::from(std::io::Error::other("disk full")));
        let report = error.report();

        assert_eq!(report.source, "infra");
        assert_eq!(report.summary(), "io error: disk full");
    }

    #[test]
    fn render_errors_keep_print_detail() {
        let error = AppError::from(RenderError::from(PrintError::engine("tab crashed")));
        let report = error.report();

        assert_eq!(report.source, "render");
        assert!(report.summary().contains("tab crashed"));
    }

    #[test]
    fn timeout_names_the_limit() {
        let error = AppError::Timeout { seconds: 60 };
        assert_eq!(error.to_string(), "export timed out after 60s");
    }
}
