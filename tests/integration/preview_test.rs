//! Preview sessions recomposite on every settings change and write nothing.

use super::test_harness::{gradient, offline_compositor, write_gradient_png, write_solid_png};
use image::Rgba;
use photomark::error::PhotomarkError;
use photomark::preview::PreviewSession;
use photomark::settings::WatermarkSettings;
use std::fs;

#[test]
fn test_preview_follows_settings_and_has_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let photo = write_gradient_png(dir.path(), "photo.png", 50, 40);
    let logo = write_solid_png(dir.path(), "logo.png", 10, 10, [0, 255, 0, 255]);
    let entries_before = fs::read_dir(dir.path()).unwrap().count();

    let mut session = PreviewSession::open(offline_compositor(), &photo).unwrap();

    let mut settings = WatermarkSettings::image(&logo);
    settings.image.scale = 1.0;
    settings.image.opacity = 1.0;
    settings.placement.position_x = 100;
    settings.placement.position_y = 100;
    let frame = session.apply_settings(settings.clone());
    assert_eq!(*frame.get_pixel(45, 35), Rgba([0, 255, 0, 255]));
    assert_eq!(frame.get_pixel(5, 5), gradient(50, 40).get_pixel(5, 5));

    settings.placement.position_x = 0;
    settings.placement.position_y = 0;
    let frame = session.apply_settings(settings);
    assert_eq!(*frame.get_pixel(5, 5), Rgba([0, 255, 0, 255]));
    assert_eq!(frame.get_pixel(45, 35), gradient(50, 40).get_pixel(45, 35));

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), entries_before);
}

#[test]
fn test_preview_reports_missing_asset() {
    let dir = tempfile::tempdir().unwrap();
    let photo = write_gradient_png(dir.path(), "photo.png", 8, 8);
    let mut session = PreviewSession::open(offline_compositor(), &photo).unwrap();

    let mut settings = WatermarkSettings::default();
    settings.mode = photomark::settings::WatermarkMode::Image;
    let frame = session.apply_settings(settings);

    assert_eq!(frame, gradient(8, 8));
    assert!(matches!(
        session.diagnostics(),
        Some(PhotomarkError::MissingWatermarkAsset { path: None, .. })
    ));
}

#[test]
fn test_preview_of_unreadable_image_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.png");
    fs::write(&bogus, b"\x89PNG but not really").unwrap();

    assert!(matches!(
        PreviewSession::open(offline_compositor(), &bogus),
        Err(PhotomarkError::UnreadableSourceImage { .. })
    ));
}
