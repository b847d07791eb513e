//! Watermark engine: places, rotates and blends a text or image watermark
//! onto a base image.
//!
//! # Features
//!
//! - **Text watermarks** rendered from installed fonts, with bold/italic
//!   faces, colour, opacity and an optional drop shadow
//! - **Image watermarks** loaded lazily from a path, scaled, and cached
//!   across a batch
//! - **Percentage placement** that reproduces the same relative position on
//!   any image size
//! - **Rotation** about the watermark's own centre, clipped only by the base
//!   image edges
//!
//! Composition never fails: unusable assets or fonts leave the base image
//! unchanged and are logged.

pub mod asset;
pub mod compositor;
pub mod error;
pub mod fonts;
pub mod position;
pub mod processor;
pub mod text_renderer;

// Re-export main types for convenience
pub use asset::{AssetCache, AssetCacheConfig};
pub use compositor::{blend_layer, blend_pixels, Compositor, WatermarkLayer};
pub use error::WatermarkError;
pub use fonts::FontBook;
pub use position::{
    calculate_anchor, is_visible, ImageDimensions, PlacementPosition, WatermarkDimensions,
};
pub use processor::{WatermarkCompositor, SHADOW_OFFSET};
pub use text_renderer::{layer_padding, measure_text, render_text_layer, TextMetrics};
