//! Watermark settings model.
//!
//! A [`WatermarkSettings`] value describes one complete watermark
//! configuration: the mode (text or image), the text and image options,
//! placement, and export options. Settings are plain data; they never embed
//! decoded image data, so they stay cheap to clone and serialize.
//!
//! Every field has a default, which keeps persisted settings
//! forward-compatible: documents written before a field existed load with the
//! default value filled in.
//!
//! # Example
//!
//! ```
//! use photomark::settings::{WatermarkSettings, NamingRule, OutputFormat};
//!
//! let mut settings = WatermarkSettings::default();
//! settings.text.content = "© 2024".to_string();
//! settings.placement.position_x = 100;
//! settings.export.output_format = OutputFormat::Png;
//! settings.export.naming_rule = NamingRule::Suffix;
//!
//! let json = settings.to_json().unwrap();
//! assert_eq!(WatermarkSettings::from_json(&json).unwrap(), settings);
//! ```

mod color;

pub use color::{parse_hex_color, Color};

use crate::error::{PhotomarkError, PhotomarkResult};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// Default values
fn default_text() -> String {
    "Watermark".to_string()
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_font_size() -> u32 {
    24
}

fn default_opacity() -> f32 {
    0.7
}

fn default_scale() -> f32 {
    0.5
}

fn default_position() -> u8 {
    50
}

/// Reads any integer percentage and clamps it into [0, 100], so an
/// out-of-range stored value does not invalidate the whole document.
fn deserialize_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    Ok(value.clamp(0, 100) as u8)
}

fn default_jpeg_quality() -> f32 {
    0.9
}

fn default_custom_text() -> String {
    "watermarked".to_string()
}

/// Which kind of watermark is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkMode {
    #[default]
    Text,
    Image,
}

bitflags! {
    /// Combinable font style tags. The empty set is the plain style.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FontStyle: u8 {
        const BOLD = 0b01;
        const ITALIC = 0b10;
    }
}

/// Text watermark options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    /// Text to draw. Empty text draws nothing.
    pub content: String,

    /// Font family name, resolved against installed fonts at render time.
    pub font_family: String,

    /// Font size in points (1pt = 1px).
    pub font_size_pt: u32,

    pub bold: bool,
    pub italic: bool,

    pub color: Color,

    /// Opacity from 0.0 (transparent) to 1.0 (opaque)
    pub opacity: f32,

    /// Draw a copy of the text offset by (2, 2) behind the main text
    pub shadow_enabled: bool,

    pub shadow_color: Color,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            content: default_text(),
            font_family: default_font_family(),
            font_size_pt: default_font_size(),
            bold: false,
            italic: false,
            color: Color::black(),
            opacity: default_opacity(),
            shadow_enabled: false,
            shadow_color: Color::white(),
        }
    }
}

impl TextSettings {
    /// Combined style flags from `bold` and `italic`.
    pub fn font_style(&self) -> FontStyle {
        let mut style = FontStyle::empty();
        style.set(FontStyle::BOLD, self.bold);
        style.set(FontStyle::ITALIC, self.italic);
        style
    }
}

/// Image watermark options.
///
/// Only the path is stored; the compositor loads the file lazily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Multiplier applied to the watermark image's dimensions (> 0)
    pub scale: f32,

    /// Opacity from 0.0 (transparent) to 1.0 (opaque)
    pub opacity: f32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            path: None,
            scale: default_scale(),
            opacity: default_opacity(),
        }
    }
}

/// Resolution-independent placement.
///
/// `position_x`/`position_y` are percentages of the travel range
/// `(base - watermark)`, not pixel offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    #[serde(deserialize_with = "deserialize_percent")]
    pub position_x: u8,
    #[serde(deserialize_with = "deserialize_percent")]
    pub position_y: u8,

    /// Clockwise rotation in degrees, in [0, 360)
    pub rotation_deg: u16,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position_x: default_position(),
            position_y: default_position(),
            rotation_deg: 0,
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
}

impl OutputFormat {
    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => ".jpg",
            OutputFormat::Png => ".png",
        }
    }

    pub fn supports_transparency(&self) -> bool {
        matches!(self, OutputFormat::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Jpeg => f.write_str("jpeg"),
            OutputFormat::Png => f.write_str("png"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = PhotomarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(PhotomarkError::invalid(
                "output_format",
                format!("unsupported format '{}'", other),
            )),
        }
    }
}

/// How an output file name is derived from the source name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingRule {
    /// Keep the source stem.
    #[default]
    #[serde(rename = "original", alias = "keep-original")]
    KeepOriginal,
    /// `custom_text + stem`
    Prefix,
    /// `stem + custom_text`
    Suffix,
    /// Any rule this build does not recognize: `stem + "_" + custom_text`.
    #[serde(other)]
    Other,
}

impl FromStr for NamingRule {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "original" | "keep-original" => NamingRule::KeepOriginal,
            "prefix" => NamingRule::Prefix,
            "suffix" => NamingRule::Suffix,
            _ => NamingRule::Other,
        })
    }
}

/// Export options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub output_format: OutputFormat,

    /// JPEG quality from 0.0 to 1.0, passed to the encoder explicitly
    pub jpeg_quality: f32,

    pub naming_rule: NamingRule,

    /// Prefix or suffix text for the naming rule
    pub custom_text: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            jpeg_quality: default_jpeg_quality(),
            naming_rule: NamingRule::default(),
            custom_text: default_custom_text(),
        }
    }
}

/// One complete watermark configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkSettings {
    pub mode: WatermarkMode,
    pub text: TextSettings,
    pub image: ImageSettings,
    pub placement: Placement,
    pub export: ExportSettings,
}

impl WatermarkSettings {
    /// Settings for a text watermark with otherwise default options.
    pub fn text(content: impl Into<String>) -> Self {
        let mut settings = Self::default();
        settings.text.content = content.into();
        settings
    }

    /// Settings for an image watermark with otherwise default options.
    pub fn image(path: impl Into<PathBuf>) -> Self {
        let mut settings = Self::default();
        settings.mode = WatermarkMode::Image;
        settings.image.path = Some(path.into());
        settings
    }

    /// Opacity of the active mode, clamped to [0, 1].
    pub fn resolved_opacity(&self) -> f32 {
        let opacity = match self.mode {
            WatermarkMode::Text => self.text.opacity,
            WatermarkMode::Image => self.image.opacity,
        };
        clamp_unit(opacity)
    }

    /// JPEG quality clamped to [0, 1].
    pub fn resolved_jpeg_quality(&self) -> f32 {
        clamp_unit(self.export.jpeg_quality)
    }

    /// Clockwise rotation reduced to [0, 360).
    pub fn resolved_rotation(&self) -> u16 {
        self.placement.rotation_deg % 360
    }

    /// Validate and clamp into the canonical form.
    ///
    /// Values with a safe default are clamped: opacities and quality into
    /// [0, 1], positions into [0, 100], rotation modulo 360. Values without
    /// one are rejected: non-positive or non-finite scale, zero font size,
    /// NaN opacity or quality.
    pub fn normalized(mut self) -> PhotomarkResult<Self> {
        if !self.image.scale.is_finite() || self.image.scale <= 0.0 {
            return Err(PhotomarkError::invalid(
                "image.scale",
                format!("must be a finite number greater than 0, got {}", self.image.scale),
            ));
        }
        if self.text.font_size_pt == 0 {
            return Err(PhotomarkError::invalid("text.font_size_pt", "must be at least 1"));
        }
        for (field, value) in [
            ("text.opacity", self.text.opacity),
            ("image.opacity", self.image.opacity),
            ("export.jpeg_quality", self.export.jpeg_quality),
        ] {
            if value.is_nan() {
                return Err(PhotomarkError::invalid(field, "must be a number"));
            }
        }

        self.text.opacity = clamp_unit(self.text.opacity);
        self.image.opacity = clamp_unit(self.image.opacity);
        self.export.jpeg_quality = clamp_unit(self.export.jpeg_quality);
        self.placement.position_x = self.placement.position_x.min(100);
        self.placement.position_y = self.placement.position_y.min(100);
        self.placement.rotation_deg %= 360;

        Ok(self)
    }

    /// Parse settings from JSON, filling missing fields and normalizing.
    pub fn from_json(json: &str) -> PhotomarkResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.normalized()
    }

    pub fn to_json(&self) -> PhotomarkResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
