//! Watermark compositor: the high-level composite API.
//!
//! [`WatermarkCompositor::composite`] turns a base image and a
//! [`WatermarkSettings`] into a new RGBA image of the same size with the
//! watermark blended on top. The base image is never modified.
//!
//! Composition degrades instead of failing. A missing or undecodable
//! watermark image, a missing font, or empty text all produce an unmodified
//! copy of the base, logged at warn level. Callers that need to report those
//! conditions (preview diagnostics) use [`WatermarkCompositor::check_asset`].
//!
//! # Example
//!
//! ```no_run
//! use photomark::settings::WatermarkSettings;
//! use photomark::watermark::WatermarkCompositor;
//!
//! let compositor = WatermarkCompositor::default();
//! let base = image::open("photo.jpg").unwrap();
//! let output = compositor.composite(&base, &WatermarkSettings::text("© 2024"));
//! assert_eq!(output.dimensions(), (base.width(), base.height()));
//! ```

use super::asset::AssetCache;
use super::compositor::{Compositor, WatermarkLayer};
use super::fonts::FontBook;
use super::position::{calculate_anchor, ImageDimensions, WatermarkDimensions};
use super::text_renderer::{layer_padding, measure_text, render_text_layer};
use super::WatermarkError;
use crate::error::PhotomarkResult;
use crate::settings::{WatermarkMode, WatermarkSettings};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;
use tracing::{debug, warn};

/// Offset of the text shadow from the main text, in pixels.
pub const SHADOW_OFFSET: i32 = 2;

/// Composites text or image watermarks onto base images.
///
/// Cheap to clone; clones share the font book and the asset cache.
#[derive(Debug, Clone)]
pub struct WatermarkCompositor {
    fonts: Arc<FontBook>,
    assets: Arc<AssetCache>,
}

impl Default for WatermarkCompositor {
    fn default() -> Self {
        Self::new(FontBook::system(), Arc::new(AssetCache::default()))
    }
}

impl WatermarkCompositor {
    pub fn new(fonts: Arc<FontBook>, assets: Arc<AssetCache>) -> Self {
        Self { fonts, assets }
    }

    pub fn fonts(&self) -> &Arc<FontBook> {
        &self.fonts
    }

    pub fn assets(&self) -> &Arc<AssetCache> {
        &self.assets
    }

    /// Composite the watermark described by `settings` onto `base`.
    pub fn composite(&self, base: &DynamicImage, settings: &WatermarkSettings) -> RgbaImage {
        self.composite_rgba(base.to_rgba8(), settings)
    }

    /// Composite onto an owned RGBA buffer.
    pub fn composite_rgba(&self, mut output: RgbaImage, settings: &WatermarkSettings) -> RgbaImage {
        if settings.resolved_opacity() <= 0.0 {
            return output;
        }

        let dims = ImageDimensions {
            width: output.width(),
            height: output.height(),
        };

        match self.layers(dims, settings) {
            Ok(layers) => {
                let mut compositor = Compositor::new();
                for layer in layers {
                    compositor.add_layer(layer);
                }
                debug!(
                    layers = compositor.layer_count(),
                    width = dims.width,
                    height = dims.height,
                    "Compositing watermark"
                );
                compositor.apply(&mut output);
            }
            Err(e) => {
                warn!(error = %e, "Watermark skipped");
            }
        }

        output
    }

    /// Build the layers for `settings` on an image of `dims`, bottom first.
    ///
    /// An empty list means nothing is drawn.
    pub fn layers(
        &self,
        dims: ImageDimensions,
        settings: &WatermarkSettings,
    ) -> Result<Vec<WatermarkLayer>, WatermarkError> {
        match settings.mode {
            WatermarkMode::Text => self.text_layers(dims, settings),
            WatermarkMode::Image => self.image_layers(dims, settings),
        }
    }

    /// Size of the unrotated watermark box for `settings`, if anything would
    /// be drawn.
    pub fn watermark_box(
        &self,
        settings: &WatermarkSettings,
    ) -> Result<Option<WatermarkDimensions>, WatermarkError> {
        match settings.mode {
            WatermarkMode::Text => {
                let text = &settings.text;
                if text.content.is_empty() {
                    return Ok(None);
                }
                let font = self.fonts.resolve(&text.font_family, text.font_style())?;
                let metrics = measure_text(&font, &text.content, text.font_size_pt.max(1));
                Ok(Some(WatermarkDimensions {
                    width: metrics.width,
                    height: metrics.height,
                }))
            }
            WatermarkMode::Image => Ok(self.scaled_asset(settings)?.map(|image| {
                WatermarkDimensions {
                    width: image.width(),
                    height: image.height(),
                }
            })),
        }
    }

    /// Report whether Image mode has a usable watermark image.
    ///
    /// Always `Ok` in Text mode.
    pub fn check_asset(&self, settings: &WatermarkSettings) -> PhotomarkResult<()> {
        if settings.mode != WatermarkMode::Image {
            return Ok(());
        }
        let path = settings
            .image
            .path
            .as_deref()
            .ok_or(WatermarkError::AssetNotConfigured)?;
        self.assets.load(path)?;
        Ok(())
    }

    fn text_layers(
        &self,
        dims: ImageDimensions,
        settings: &WatermarkSettings,
    ) -> Result<Vec<WatermarkLayer>, WatermarkError> {
        let text = &settings.text;
        if text.content.is_empty() {
            return Ok(Vec::new());
        }

        let size = text.font_size_pt.max(1);
        let font = self.fonts.resolve(&text.font_family, text.font_style())?;
        let metrics = measure_text(&font, &text.content, size);
        let anchor = calculate_anchor(
            &dims,
            &WatermarkDimensions {
                width: metrics.width,
                height: metrics.height,
            },
            settings.placement.position_x,
            settings.placement.position_y,
        );

        let pad = layer_padding(size);
        let pivot = (
            pad as f32 + metrics.width as f32 / 2.0,
            pad as f32 + metrics.height as f32 / 2.0,
        );
        let rotation = settings.resolved_rotation();
        let opacity = settings.resolved_opacity();
        let origin = anchor.offset(-(pad as i32), -(pad as i32));

        let mut layers = Vec::with_capacity(2);
        if text.shadow_enabled {
            // Same absolute pivot as the main text so the offset turns with it
            let shadow = render_text_layer(&font, &text.content, size, text.shadow_color, pad)?;
            let shadow_pivot = (
                pivot.0 - SHADOW_OFFSET as f32,
                pivot.1 - SHADOW_OFFSET as f32,
            );
            layers.push(
                WatermarkLayer::new(shadow, origin.offset(SHADOW_OFFSET, SHADOW_OFFSET), opacity)
                    .with_rotation(rotation, shadow_pivot),
            );
        }
        let main = render_text_layer(&font, &text.content, size, text.color, pad)?;
        layers.push(WatermarkLayer::new(main, origin, opacity).with_rotation(rotation, pivot));

        Ok(layers)
    }

    fn image_layers(
        &self,
        dims: ImageDimensions,
        settings: &WatermarkSettings,
    ) -> Result<Vec<WatermarkLayer>, WatermarkError> {
        let Some(image) = self.scaled_asset(settings)? else {
            return Ok(Vec::new());
        };

        let anchor = calculate_anchor(
            &dims,
            &WatermarkDimensions {
                width: image.width(),
                height: image.height(),
            },
            settings.placement.position_x,
            settings.placement.position_y,
        );
        let pivot = (image.width() as f32 / 2.0, image.height() as f32 / 2.0);

        Ok(vec![WatermarkLayer::new(image, anchor, settings.resolved_opacity())
            .with_rotation(settings.resolved_rotation(), pivot)])
    }

    /// The watermark image resized by `scale`, or `None` when a scaled
    /// dimension truncates to zero.
    fn scaled_asset(&self, settings: &WatermarkSettings) -> Result<Option<RgbaImage>, WatermarkError> {
        let path = settings
            .image
            .path
            .as_deref()
            .ok_or(WatermarkError::AssetNotConfigured)?;
        let source = self.assets.load(path)?;

        let scale = settings.image.scale;
        if !scale.is_finite() || scale <= 0.0 {
            warn!(scale, "Ignoring watermark with non-positive scale");
            return Ok(None);
        }

        let width = (source.width() as f32 * scale) as u32;
        let height = (source.height() as f32 * scale) as u32;
        if width == 0 || height == 0 {
            return Ok(None);
        }

        if (width, height) == source.dimensions() {
            Ok(Some((*source).clone()))
        } else {
            Ok(Some(imageops::resize(
                &*source,
                width,
                height,
                FilterType::Triangle,
            )))
        }
    }
}
