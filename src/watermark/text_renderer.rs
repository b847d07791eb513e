//! Text watermark rendering.
//!
//! Text is measured and rasterized with `ab_glyph`. Font size in points maps
//! 1:1 to pixels per em. The watermark box for text is the advance width of
//! the string (with kerning) by the line height `ascent - descent + line_gap`,
//! and the first baseline sits `ascent` pixels below the top of the box so
//! that glyph tops, not the baseline, align with the anchor.
//!
//! Rendered layers carry a transparent margin of `pad` pixels on every side,
//! because italic and some display glyphs overhang their advance box.

use super::WatermarkError;
use crate::settings::Color;
use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

/// Size of a string's watermark box, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: u32,
    pub height: u32,
    /// Distance from the top of the box to the baseline.
    pub ascent: f32,
}

/// Scale at which one em is `font_size_pt` pixels.
pub fn scale_for_points(font: &FontVec, font_size_pt: u32) -> PxScale {
    let px_per_em = font_size_pt as f32;
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(px_per_em * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(px_per_em),
    }
}

/// Measure the watermark box of `text`.
pub fn measure_text(font: &FontVec, text: &str, font_size_pt: u32) -> TextMetrics {
    let scaled = font.as_scaled(scale_for_points(font, font_size_pt));

    let mut width = 0.0f32;
    let mut prev_glyph: Option<GlyphId> = None;
    for c in text.chars() {
        let glyph_id = scaled.glyph_id(c);
        if let Some(prev) = prev_glyph {
            width += scaled.kern(prev, glyph_id);
        }
        width += scaled.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    let height = scaled.ascent() - scaled.descent() + scaled.line_gap();
    TextMetrics {
        width: width.max(0.0).ceil() as u32,
        height: height.max(0.0).ceil() as u32,
        ascent: scaled.ascent(),
    }
}

/// Margin added around a rendered text layer.
pub fn layer_padding(font_size_pt: u32) -> u32 {
    font_size_pt / 4 + 1
}

/// Render `text` in `color` onto a transparent layer.
///
/// The layer is `metrics.width + 2 * pad` by `metrics.height + 2 * pad`; the
/// box's top-left corner is at `(pad, pad)` in layer coordinates.
pub fn render_text_layer(
    font: &FontVec,
    text: &str,
    font_size_pt: u32,
    color: Color,
    pad: u32,
) -> Result<RgbaImage, WatermarkError> {
    if text.is_empty() {
        return Err(WatermarkError::RenderError(
            "Cannot render empty text".to_string(),
        ));
    }

    let scale = scale_for_points(font, font_size_pt);
    let scaled = font.as_scaled(scale);
    let metrics = measure_text(font, text, font_size_pt);

    let canvas_width = (metrics.width + 2 * pad).max(1);
    let canvas_height = (metrics.height + 2 * pad).max(1);
    let mut coverage = vec![0.0f32; (canvas_width * canvas_height) as usize];

    let baseline_y = pad as f32 + metrics.ascent;
    let mut cursor_x = pad as f32;
    let mut prev_glyph: Option<GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled.glyph_id(c);
        if let Some(prev) = prev_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, point(cursor_x, baseline_y));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, cov| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && y >= 0 && x < canvas_width as i32 && y < canvas_height as i32 {
                    let cell = &mut coverage[(y as u32 * canvas_width + x as u32) as usize];
                    // Overlapping glyph edges accumulate like stacked coverage.
                    *cell += cov.clamp(0.0, 1.0) * (1.0 - *cell);
                }
            });
        }

        cursor_x += scaled.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    Ok(RgbaImage::from_fn(canvas_width, canvas_height, |x, y| {
        let c = coverage[(y * canvas_width + x) as usize];
        Rgba([color.r, color.g, color.b, (c * 255.0).round() as u8])
    }))
}
