//! Watermark placement and degradation through `WatermarkCompositor`.

use super::test_harness::{gradient_base, offline_compositor, system_compositor, write_solid_png};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use photomark::settings::WatermarkSettings;
use photomark::watermark::{
    blend_layer, calculate_anchor, layer_padding, measure_text, render_text_layer,
    ImageDimensions, PlacementPosition, WatermarkDimensions, WatermarkLayer,
};
use rstest::rstest;

const RED: [u8; 4] = [255, 0, 0, 255];

#[rstest]
fn test_anchor_formula_holds_for_every_edge_and_centre(
    #[values(0, 50, 100)] position_x: u8,
    #[values(0, 50, 100)] position_y: u8,
    #[values((640, 480, 64, 32), (101, 77, 10, 9), (30, 20, 50, 40), (1, 1, 1, 1))] sizes: (
        u32,
        u32,
        u32,
        u32,
    ),
) {
    let (bw, bh, ww, wh) = sizes;
    let anchor = calculate_anchor(
        &ImageDimensions {
            width: bw,
            height: bh,
        },
        &WatermarkDimensions {
            width: ww,
            height: wh,
        },
        position_x,
        position_y,
    );

    let expected_x = (bw as i64 - ww as i64) * position_x as i64 / 100;
    let expected_y = (bh as i64 - wh as i64) * position_y as i64 / 100;
    assert_eq!(anchor, PlacementPosition::new(expected_x as i32, expected_y as i32));
}

#[rstest]
fn test_image_watermark_lands_on_the_anchor(
    #[values(0, 50, 100)] position_x: u8,
    #[values(0, 50, 100)] position_y: u8,
) {
    let dir = tempfile::tempdir().unwrap();
    let logo = write_solid_png(dir.path(), "logo.png", 12, 6, RED);

    let mut settings = WatermarkSettings::image(&logo);
    settings.image.scale = 1.0;
    settings.image.opacity = 1.0;
    settings.placement.position_x = position_x;
    settings.placement.position_y = position_y;

    let base = gradient_base(61, 41);
    let output = offline_compositor().composite(&base, &settings);

    let x = (61 - 12) * position_x as u32 / 100;
    let y = (41 - 6) * position_y as u32 / 100;
    assert_eq!(*output.get_pixel(x, y), Rgba(RED));
    assert_eq!(*output.get_pixel(x + 11, y + 5), Rgba(RED));
    if x > 0 {
        assert_eq!(output.get_pixel(x - 1, y), base.as_rgba8().unwrap().get_pixel(x - 1, y));
    }
    if y + 6 < 41 {
        assert_eq!(output.get_pixel(x, y + 6), base.as_rgba8().unwrap().get_pixel(x, y + 6));
    }
}

#[rstest]
#[case::text(WatermarkSettings::text("© 2024 Example"))]
#[case::image(WatermarkSettings::image("logo.png"))]
fn test_zero_opacity_returns_identical_copy(#[case] settings: WatermarkSettings) {
    let mut settings = settings;
    settings.text.opacity = 0.0;
    settings.image.opacity = 0.0;
    settings.text.shadow_enabled = true;
    settings.placement.rotation_deg = 45;

    let base = gradient_base(48, 32);
    let compositor = system_compositor().unwrap_or_else(offline_compositor);

    assert_eq!(compositor.composite(&base, &settings), base.to_rgba8());
}

#[test]
fn test_missing_watermark_image_equals_zero_opacity() {
    let dir = tempfile::tempdir().unwrap();
    let base = gradient_base(40, 40);
    let compositor = offline_compositor();

    let missing = WatermarkSettings::image(dir.path().join("does-not-exist.png"));
    let mut invisible = WatermarkSettings::image(write_solid_png(dir.path(), "l.png", 8, 8, RED));
    invisible.image.opacity = 0.0;

    assert_eq!(
        compositor.composite(&base, &missing),
        compositor.composite(&base, &invisible)
    );
    assert_eq!(compositor.composite(&base, &missing), base.to_rgba8());
}

#[test]
fn test_composite_never_mutates_the_base() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = WatermarkSettings::image(write_solid_png(dir.path(), "l.png", 8, 8, RED));
    settings.image.opacity = 1.0;

    let base = gradient_base(20, 20);
    let before = base.clone();
    let output = offline_compositor().composite(&base, &settings);

    assert_ne!(output, base.to_rgba8());
    assert_eq!(base, before);
}

#[test]
fn test_rotation_zero_matches_unrotated_placement() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = WatermarkSettings::image(write_solid_png(dir.path(), "l.png", 20, 10, RED));
    settings.image.scale = 0.5;
    settings.image.opacity = 0.8;
    settings.placement.position_x = 100;
    settings.placement.position_y = 0;
    settings.placement.rotation_deg = 0;

    let base = gradient_base(50, 30);
    let output = offline_compositor().composite(&base, &settings);

    // 20x10 at scale 0.5 is 10x5; anchor ((50-10)*100/100, 0)
    let mut expected = base.to_rgba8();
    blend_layer(
        &mut expected,
        &WatermarkLayer::new(
            imageops::resize(
                &RgbaImage::from_pixel(20, 10, Rgba(RED)),
                10,
                5,
                FilterType::Triangle,
            ),
            PlacementPosition::new(40, 0),
            0.8,
        ),
    );
    assert_eq!(output, expected);
}

#[rstest]
#[case::zero(0)]
#[case::full_turn(360)]
fn test_text_rotation_zero_matches_unrotated_placement(#[case] rotation: u16) {
    let Some(compositor) = system_compositor() else {
        return;
    };

    let mut settings = WatermarkSettings::text("Proof 42");
    settings.text.font_size_pt = 28;
    settings.text.opacity = 0.7;
    settings.text.color = "#20A0FF".parse().unwrap();
    settings.placement.position_x = 75;
    settings.placement.position_y = 20;
    settings.placement.rotation_deg = rotation;

    let base = gradient_base(320, 160);
    let output = compositor.composite(&base, &settings);

    let font = compositor
        .fonts()
        .resolve(&settings.text.font_family, settings.text.font_style())
        .unwrap();
    let metrics = measure_text(&font, "Proof 42", 28);
    let anchor = calculate_anchor(
        &ImageDimensions {
            width: 320,
            height: 160,
        },
        &WatermarkDimensions {
            width: metrics.width,
            height: metrics.height,
        },
        75,
        20,
    );
    let pad = layer_padding(28);
    let layer = render_text_layer(&font, "Proof 42", 28, settings.text.color, pad).unwrap();

    let mut expected = base.to_rgba8();
    blend_layer(
        &mut expected,
        &WatermarkLayer::new(layer, anchor.offset(-(pad as i32), -(pad as i32)), 0.7),
    );
    assert_eq!(output, expected);
    assert_ne!(output, base.to_rgba8());
}

#[test]
fn test_rotated_watermark_may_leave_its_box() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = WatermarkSettings::image(write_solid_png(dir.path(), "l.png", 30, 4, RED));
    settings.image.scale = 1.0;
    settings.image.opacity = 1.0;
    settings.placement.rotation_deg = 90;

    let base = gradient_base(40, 40);
    let output = offline_compositor().composite(&base, &settings);

    // Box is (5, 18)..(35, 22); rotated about (20, 20) it spans x 18..22, y 5..35
    assert_eq!(*output.get_pixel(20, 7), Rgba(RED));
    assert_eq!(*output.get_pixel(20, 32), Rgba(RED));
    assert_eq!(output.get_pixel(7, 20), base.as_rgba8().unwrap().get_pixel(7, 20));
}

#[test]
fn test_text_watermark_draws_when_fonts_exist() {
    let Some(compositor) = system_compositor() else {
        return;
    };

    let mut settings = WatermarkSettings::text("WATERMARK");
    settings.text.font_size_pt = 32;
    settings.text.opacity = 1.0;
    settings.text.color = "#FF0000".parse().unwrap();

    let base = gradient_base(300, 120);
    let output = compositor.composite(&base, &settings);

    assert_eq!(output.dimensions(), (300, 120));
    assert_ne!(output, base.to_rgba8());
}

#[test]
fn test_empty_text_draws_nothing() {
    let compositor = system_compositor().unwrap_or_else(offline_compositor);
    let base = gradient_base(30, 30);

    let mut settings = WatermarkSettings::text("");
    settings.text.opacity = 1.0;
    assert_eq!(compositor.composite(&base, &settings), base.to_rgba8());
}
