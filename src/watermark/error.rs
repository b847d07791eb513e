//! Watermark error types.
//!
//! Errors raised while preparing a watermark layer. None of these escape a
//! composite call: the compositor logs them and returns a pass-through copy.

use crate::error::PhotomarkError;
use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while preparing a watermark layer.
#[derive(Debug)]
pub enum WatermarkError {
    /// Image mode without a configured watermark path
    AssetNotConfigured,

    /// Watermark image could not be opened or decoded
    AssetUnreadable { path: PathBuf, message: String },

    /// No installed font could satisfy the request
    FontUnavailable { family: String },

    /// Failed to render text watermark
    RenderError(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssetNotConfigured => write!(f, "No watermark image configured"),
            Self::AssetUnreadable { path, message } => write!(
                f,
                "Failed to read watermark image {}: {}",
                path.display(),
                message
            ),
            Self::FontUnavailable { family } => {
                write!(f, "No font available for family '{}'", family)
            }
            Self::RenderError(msg) => write!(f, "Failed to render text watermark: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}

impl From<WatermarkError> for PhotomarkError {
    fn from(err: WatermarkError) -> Self {
        match err {
            WatermarkError::AssetNotConfigured => {
                PhotomarkError::missing_asset(None, "no watermark image configured")
            }
            WatermarkError::AssetUnreadable { path, message } => {
                PhotomarkError::missing_asset(Some(path), message)
            }
            other => PhotomarkError::invalid("text", other.to_string()),
        }
    }
}
