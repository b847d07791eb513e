//! Preview session for an interactive shell.
//!
//! A shell holds one [`PreviewSession`] per displayed image. Each settings
//! change calls [`PreviewSession::apply_settings`], which recomposites
//! synchronously and returns the new preview raster. Previewing has no side
//! effects: nothing is written and the settings are not persisted.

use crate::error::{PhotomarkError, PhotomarkResult};
use crate::import::load_image;
use crate::settings::WatermarkSettings;
use crate::watermark::WatermarkCompositor;
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use tracing::warn;

pub struct PreviewSession {
    compositor: WatermarkCompositor,
    base: DynamicImage,
    settings: WatermarkSettings,
}

impl std::fmt::Debug for PreviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSession")
            .field("compositor", &self.compositor)
            .field("dimensions", &(self.base.width(), self.base.height()))
            .field("settings", &self.settings)
            .finish()
    }
}

impl PreviewSession {
    pub fn new(compositor: WatermarkCompositor, base: DynamicImage) -> Self {
        Self {
            compositor,
            base,
            settings: WatermarkSettings::default(),
        }
    }

    /// Open a preview of the image at `path`.
    pub fn open(compositor: WatermarkCompositor, path: &Path) -> PhotomarkResult<Self> {
        Ok(Self::new(compositor, load_image(path)?))
    }

    pub fn compositor(&self) -> &WatermarkCompositor {
        &self.compositor
    }

    pub fn base(&self) -> &DynamicImage {
        &self.base
    }

    pub fn settings(&self) -> &WatermarkSettings {
        &self.settings
    }

    /// Replace the current settings and recomposite.
    pub fn apply_settings(&mut self, settings: WatermarkSettings) -> RgbaImage {
        self.settings = settings;
        if let Some(err) = self.diagnostics() {
            warn!(error = %err, "Preview drawn without watermark");
        }
        self.render()
    }

    /// Composite the current settings onto the base image.
    pub fn render(&self) -> RgbaImage {
        self.compositor.composite(&self.base, &self.settings)
    }

    /// Why the current settings draw no watermark, if they should draw one.
    pub fn diagnostics(&self) -> Option<PhotomarkError> {
        self.compositor.check_asset(&self.settings).err()
    }
}
