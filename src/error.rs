// src/error.rs

//! Unified error handling for the feed builder.

use std::fmt;

use thiserror::Error;

/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A raw scrape entry could not be turned into a chapter record
    #[error("Malformed entry '{title}': {reason}")]
    MalformedEntry { title: String, reason: String },

    /// A host listing could not be retrieved or parsed
    #[error("Fetch failed for {novel}: {message}")]
    Fetch { novel: String, message: String },

    /// Persisted history exists but cannot be read back
    #[error("History for {novel_id} is corrupt: {message}")]
    HistoryCorrupt { novel_id: String, message: String },

    /// Feed output could not be rendered or written
    #[error("Feed serialization failed: {0}")]
    Serialization(String),

    /// No adapter is registered for the host
    #[error("Unknown or unimplemented host: {0}")]
    UnknownHost(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed-entry error.
    pub fn malformed(title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEntry {
            title: title.into(),
            reason: reason.into(),
        }
    }

    /// Create a fetch error with the novel it belongs to.
    pub fn fetch(novel: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            novel: novel.into(),
            message: message.to_string(),
        }
    }

    /// Create a corrupt-history error.
    pub fn history_corrupt(novel_id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::HistoryCorrupt {
            novel_id: novel_id.into(),
            message: message.to_string(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl fmt::Display) -> Self {
        Self::Serialization(message.to_string())
    }
}
