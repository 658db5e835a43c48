//! Error types for contribscout.
//!
//! Library crates use [`ContribScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all contribscout operations.
#[derive(Debug, thiserror::Error)]
pub enum ContribScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during discovery or API calls.
    #[error("network error: {0}")]
    Network(String),

    /// GitHub API returned a non-success status.
    #[error("api error: {url}: HTTP {status}")]
    Api { url: String, status: u16 },

    /// CSV, HTML, or API payload parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Workbook read or write error.
    #[error("export error: {0}")]
    Export(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (invalid URL, bad row range, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ContribScoutError>;

impl ContribScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an API error for a URL and HTTP status.
    pub fn api(url: impl Into<String>, status: u16) -> Self {
        Self::Api {
            url: url.into(),
            status,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ContribScoutError::config("missing token env");
        assert_eq!(err.to_string(), "config error: missing token env");

        let err = ContribScoutError::api("https://api.github.com/repos/a/b", 404);
        assert!(err.to_string().contains("HTTP 404"));

        let err = ContribScoutError::validation("end_row before start_row");
        assert!(err.to_string().contains("end_row"));
    }
}
