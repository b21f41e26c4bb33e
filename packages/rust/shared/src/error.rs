//! Error types for BrochureKit.
//!
//! Library crates use [`BrochureKitError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all BrochureKit operations.
#[derive(Debug, thiserror::Error)]
pub enum BrochureKitError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// HTTP-layer failure while fetching a site page (timeout, connection, non-2xx).
    #[error("fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Text-generation endpoint failure (network, API status, bad envelope).
    #[error("model error: {0}")]
    Llm(String),

    /// The model replied with text that is not JSON of the expected shape.
    ///
    /// `raw` holds the reply verbatim so the operator can inspect it.
    #[error("model reply is not valid link JSON: {message}")]
    Decode { message: String, raw: String },

    /// An intermediate artifact produced by an earlier stage is absent.
    #[error("missing input {path:?}: run `{prerequisite}` first to create it")]
    MissingInput {
        path: PathBuf,
        prerequisite: &'static str,
    },

    /// Malformed artifact content or unparseable URL.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input values.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BrochureKitError>;

impl BrochureKitError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error for `url`.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a decode error, keeping the raw model text.
    pub fn decode(msg: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
            raw: raw.into(),
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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Raw model output attached to a decode error, if any.
    pub fn raw_model_output(&self) -> Option<&str> {
        match self {
            Self::Decode { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BrochureKitError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = BrochureKitError::fetch("https://example.com/", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "fetch error for https://example.com/: HTTP 503"
        );
    }

    #[test]
    fn missing_input_names_prerequisite() {
        let err = BrochureKitError::MissingInput {
            path: PathBuf::from("outputs/candidate_urls.json"),
            prerequisite: "brochurekit discover",
        };
        let msg = err.to_string();
        assert!(msg.contains("candidate_urls.json"));
        assert!(msg.contains("brochurekit discover"));
    }

    #[test]
    fn decode_error_keeps_raw_text() {
        let err = BrochureKitError::decode("expected value", "Sure! Here are the links");
        assert_eq!(err.raw_model_output(), Some("Sure! Here are the links"));
        assert!(BrochureKitError::parse("x").raw_model_output().is_none());
    }
}
