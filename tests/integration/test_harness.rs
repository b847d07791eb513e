//! Shared fixtures for the integration tests.

use image::{DynamicImage, Rgba, RgbaImage};
use photomark::watermark::{AssetCache, FontBook, WatermarkCompositor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A compositor that never touches system fonts.
pub fn offline_compositor() -> WatermarkCompositor {
    WatermarkCompositor::new(Arc::new(FontBook::empty()), Arc::new(AssetCache::default()))
}

/// A compositor over the system fonts, or `None` when the host has none.
pub fn system_compositor() -> Option<WatermarkCompositor> {
    let fonts = FontBook::system();
    if fonts.face_count() == 0 {
        return None;
    }
    Some(WatermarkCompositor::new(fonts, Arc::new(AssetCache::default())))
}

/// Opaque gradient so that misplaced pixels show up in comparisons.
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

pub fn gradient_base(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(gradient(width, height))
}

pub fn write_solid_png(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 4]) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(width, height, Rgba(color))
        .save(&path)
        .unwrap();
    path
}

pub fn write_gradient_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    gradient(width, height).save(&path).unwrap();
    path
}
