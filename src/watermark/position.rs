//! Position calculation for watermark placement.
//!
//! Placement is expressed as a percentage of the travel range: the space
//! left over once the watermark is subtracted from the base image. The anchor
//! is the watermark's top-left corner:
//!
//! ```text
//! x = (base_width  - wm_width)  * position_x / 100
//! y = (base_height - wm_height) * position_y / 100
//! ```
//!
//! 0 aligns with the left/top edge, 100 with the right/bottom edge and 50
//! centres the watermark, whatever the image size.
//!
//! # Example
//!
//! ```
//! use photomark::watermark::position::{calculate_anchor, ImageDimensions, WatermarkDimensions};
//!
//! let image = ImageDimensions { width: 800, height: 600 };
//! let watermark = WatermarkDimensions { width: 100, height: 50 };
//!
//! let pos = calculate_anchor(&image, &watermark, 100, 100);
//! assert_eq!((pos.x, pos.y), (700, 550));
//! ```

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of the watermark to be placed (its unrotated bounding box).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner of a watermark in target pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Calculate the anchor (top-left corner) for a watermark.
///
/// Integer arithmetic truncating toward zero. The result is negative on an
/// axis where the watermark is larger than the image, so that the overflow
/// is split according to the percentage. Percentages above 100 are treated
/// as 100.
pub fn calculate_anchor(
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    position_x: u8,
    position_y: u8,
) -> PlacementPosition {
    PlacementPosition::new(
        axis_offset(image.width, watermark.width, position_x),
        axis_offset(image.height, watermark.height, position_y),
    )
}

fn axis_offset(image: u32, watermark: u32, percent: u8) -> i32 {
    let travel = image as i64 - watermark as i64;
    let offset = travel * percent.min(100) as i64 / 100;
    offset.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Check if a position is at least partially visible within the image.
pub fn is_visible(
    pos: &PlacementPosition,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
) -> bool {
    let wm_right = pos.x + watermark.width as i32;
    let wm_bottom = pos.y + watermark.height as i32;

    pos.x < image.width as i32 && pos.y < image.height as i32 && wm_right > 0 && wm_bottom > 0
}
