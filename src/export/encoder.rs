//! Image encoder abstraction
//!
//! Encoders turn a composited RGBA raster into file bytes. They sit behind the
//! [`ImageEncoder`] trait and are looked up per output format in an
//! [`EncoderRegistry`], so a registry can be assembled without a format (the
//! format then reports `EncoderUnavailable`) or with a replacement encoder.

use crate::error::{PhotomarkError, PhotomarkResult};
use crate::settings::{Color, OutputFormat, WatermarkSettings};
use image::{ImageEncoder as _, Rgb, RgbImage, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

/// Options passed to an encoder for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {
    /// Quality value (1-100, where 100 is best quality). Lossless formats
    /// ignore it.
    pub quality: u8,
    /// Colour that transparent pixels are flattened onto for formats
    /// without alpha.
    pub background: Color,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: 90,
            background: Color::white(),
        }
    }
}

impl EncodeOptions {
    pub fn from_settings(settings: &WatermarkSettings, background: Color) -> Self {
        Self {
            quality: quality_percent(settings.resolved_jpeg_quality()),
            background,
        }
    }
}

/// Map a quality in [0, 1] onto the codec's 1..=100 scale.
pub fn quality_percent(quality: f32) -> u8 {
    let quality = if quality.is_nan() { 0.0 } else { quality };
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    /// The encoded image data
    pub data: Vec<u8>,
    /// The output format
    pub format: OutputFormat,
}

/// Trait for image encoders
///
/// The trait is object-safe so registries can hold any encoder.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode an RGBA image to the target format
    fn encode(&self, image: &RgbaImage, options: &EncodeOptions) -> PhotomarkResult<EncodedImage>;

    /// Check if this encoder supports transparency
    fn supports_transparency(&self) -> bool;
}

/// JPEG encoder using the image crate
///
/// Alpha is flattened onto [`EncodeOptions::background`] before encoding.
#[derive(Debug, Default)]
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(&self, image: &RgbaImage, options: &EncodeOptions) -> PhotomarkResult<EncodedImage> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;

        let rgb = flatten_alpha(image, options.background);

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, options.quality.clamp(1, 100));

        encoder
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
            .map_err(|e| PhotomarkError::EncodeFailed {
                format: OutputFormat::Jpeg,
                message: e.to_string(),
            })?;

        Ok(EncodedImage {
            data: output.into_inner(),
            format: OutputFormat::Jpeg,
        })
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// PNG encoder using the image crate
#[derive(Debug, Default)]
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(&self, image: &RgbaImage, _options: &EncodeOptions) -> PhotomarkResult<EncodedImage> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;

        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new(&mut output);

        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )
            .map_err(|e| PhotomarkError::EncodeFailed {
                format: OutputFormat::Png,
                message: e.to_string(),
            })?;

        Ok(EncodedImage {
            data: output.into_inner(),
            format: OutputFormat::Png,
        })
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Composite `image` over an opaque `background`, dropping alpha.
pub fn flatten_alpha(image: &RgbaImage, background: Color) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let alpha = p[3] as u32;
        let over = |fg: u8, bg: u8| ((fg as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255) as u8;
        Rgb([
            over(p[0], background.r),
            over(p[1], background.g),
            over(p[2], background.b),
        ])
    })
}

/// Encoders available to an export, keyed by output format.
#[derive(Clone)]
pub struct EncoderRegistry {
    encoders: HashMap<OutputFormat, Arc<dyn ImageEncoder>>,
}

impl std::fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut formats: Vec<String> = self.encoders.keys().map(|f| f.to_string()).collect();
        formats.sort();
        f.debug_struct("EncoderRegistry")
            .field("formats", &formats)
            .finish()
    }
}

impl Default for EncoderRegistry {
    /// JPEG and PNG encoders from the image crate.
    fn default() -> Self {
        Self::empty()
            .with_encoder(Arc::new(JpegEncoder))
            .with_encoder(Arc::new(PngEncoder))
    }
}

impl EncoderRegistry {
    /// A registry with no encoders.
    pub fn empty() -> Self {
        Self {
            encoders: HashMap::new(),
        }
    }

    /// Register `encoder` for its format, replacing any existing one.
    pub fn with_encoder(mut self, encoder: Arc<dyn ImageEncoder>) -> Self {
        self.encoders.insert(encoder.format(), encoder);
        self
    }

    /// Remove the encoder for `format`.
    pub fn without(mut self, format: OutputFormat) -> Self {
        self.encoders.remove(&format);
        self
    }

    pub fn get(&self, format: OutputFormat) -> PhotomarkResult<Arc<dyn ImageEncoder>> {
        self.encoders
            .get(&format)
            .cloned()
            .ok_or(PhotomarkError::EncoderUnavailable { format })
    }

    pub fn supports(&self, format: OutputFormat) -> bool {
        self.encoders.contains_key(&format)
    }
}
