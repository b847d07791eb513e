// Source image import tests

use image::{DynamicImage, Rgba, RgbaImage};
use photomark::import::{collect_sources, is_importable, load_image, scan_folder, thumbnail};
use std::fs;

#[test]
fn test_every_importable_format_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 4, Rgba([200, 100, 50, 255])));

    for name in ["a.png", "b.jpg", "c.jpeg", "d.bmp", "e.tiff"] {
        let path = dir.path().join(name);
        image.to_rgb8().save(&path).unwrap();
        assert!(is_importable(&path), "{}", name);

        let loaded = load_image(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (6, 4), "{}", name);
    }

    assert_eq!(scan_folder(dir.path()).unwrap().len(), 5);
}

#[test]
fn test_collect_sources_from_nested_folders_is_shallow() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    fs::write(dir.path().join("top.png"), b"").unwrap();
    fs::write(nested.join("deep.png"), b"").unwrap();

    let sources = collect_sources(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(sources, vec![dir.path().join("top.png")]);

    assert!(collect_sources(&[dir.path().join("missing-dir").join("x.png")]).is_ok());
}

#[test]
fn test_thumbnail_keeps_aspect_ratio() {
    let image = DynamicImage::ImageRgba8(RgbaImage::new(1920, 1080));
    let thumb = thumbnail(&image, 150, 100);
    assert_eq!(thumb.width(), 150);
    assert_eq!(thumb.height(), 84);
}
