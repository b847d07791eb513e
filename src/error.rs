// Error types module

use std::path::PathBuf;
use thiserror::Error;

use crate::settings::OutputFormat;

/// Centralized error type for photomark
///
/// Only `UnreadableSourceImage` is surfaced by a direct composite call.
/// Export errors are collected per file, store errors are recovered with a
/// warning, and `MissingWatermarkAsset` is only produced by preview
/// diagnostics.
#[derive(Error, Debug)]
pub enum PhotomarkError {
    /// Base image could not be opened or decoded
    #[error("Cannot read source image {}: {message}", path.display())]
    UnreadableSourceImage { path: PathBuf, message: String },

    /// Image mode without a usable watermark image
    #[error("Watermark image unavailable{}: {message}", display_opt_path(path))]
    MissingWatermarkAsset {
        path: Option<PathBuf>,
        message: String,
    },

    /// No encoder registered for the requested output format
    #[error("No encoder available for {format}")]
    EncoderUnavailable { format: OutputFormat },

    /// The encoder rejected the image
    #[error("Failed to encode to {format}: {message}")]
    EncodeFailed {
        format: OutputFormat,
        message: String,
    },

    /// Template or last-used store is unreadable or malformed
    #[error("Settings store {} is corrupt: {message}", path.display())]
    StoreCorrupt { path: PathBuf, message: String },

    /// Out-of-range setting without a safe clamp
    #[error("Invalid setting '{field}': {message}")]
    InvalidConfiguration { field: String, message: String },

    /// Application configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using PhotomarkError.
pub type PhotomarkResult<T> = Result<T, PhotomarkError>;

impl PhotomarkError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unreadable_source(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::UnreadableSourceImage {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn missing_asset(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::MissingWatermarkAsset {
            path,
            message: message.into(),
        }
    }

    /// Whether this error only affects the file being processed.
    ///
    /// Batch export keeps going after any per-file error.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::UnreadableSourceImage { .. }
                | Self::EncoderUnavailable { .. }
                | Self::EncodeFailed { .. }
                | Self::Io(_)
        )
    }
}

fn display_opt_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" ({})", p.display()),
        None => String::new(),
    }
}
