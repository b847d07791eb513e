//! Batch export: naming, encoding and per-file failure isolation.

use super::test_harness::{gradient, offline_compositor, write_gradient_png, write_solid_png};
use image::RgbaImage;
use photomark::error::{PhotomarkError, PhotomarkResult};
use photomark::export::{
    export_file_name, EncodeOptions, EncodedImage, EncoderRegistry, Execution, ExportPipeline,
    ImageEncoder, PngEncoder,
};
use photomark::settings::{NamingRule, OutputFormat, WatermarkSettings};
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// PNG encoder that claims to be unavailable for images of one width.
struct UnavailableForWidth(u32);

impl ImageEncoder for UnavailableForWidth {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(&self, image: &RgbaImage, options: &EncodeOptions) -> PhotomarkResult<EncodedImage> {
        if image.width() == self.0 {
            return Err(PhotomarkError::EncoderUnavailable {
                format: OutputFormat::Png,
            });
        }
        PngEncoder.encode(image, options)
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

fn png_settings() -> WatermarkSettings {
    let mut settings = WatermarkSettings::text("");
    settings.export.output_format = OutputFormat::Png;
    settings.export.naming_rule = NamingRule::Suffix;
    settings.export.custom_text = "_wm".to_string();
    settings
}

#[rstest]
#[case(Execution::Sequential)]
#[case(Execution::Parallel)]
fn test_one_unavailable_encoder_does_not_stop_the_batch(#[case] execution: Execution) {
    let dir = tempfile::tempdir().unwrap();
    let widths = [10, 13, 16, 19, 22];
    let sources: Vec<PathBuf> = widths
        .iter()
        .map(|&w| write_gradient_png(dir.path(), &format!("img{}.png", w), w, 9))
        .collect();

    let out = dir.path().join("out");
    let pipeline = ExportPipeline::new(offline_compositor(), &out).with_encoders(
        EncoderRegistry::default().with_encoder(Arc::new(UnavailableForWidth(16))),
    );

    let report = pipeline.export_batch(&sources, &png_settings(), execution);

    assert_eq!(report.len(), widths.len());
    assert_eq!(report.success_count(), widths.len() - 1);

    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, sources[2].as_path());
    assert!(matches!(failed[0].1, PhotomarkError::EncoderUnavailable { .. }));
    assert!(!out.join("img16_wm.png").exists());

    // Outcomes stay in source order whatever the execution
    let order: Vec<_> = report.outcomes.iter().map(|o| o.source.clone()).collect();
    assert_eq!(order, sources);

    for &w in widths.iter().filter(|&&w| w != 16) {
        let written = image::open(out.join(format!("img{}_wm.png", w)))
            .unwrap()
            .to_rgba8();
        assert_eq!(written, gradient(w, 9));
    }
}

#[test]
fn test_same_named_sources_in_parallel_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let sources: Vec<PathBuf> = (0..40)
        .map(|i| {
            let folder = dir.path().join(format!("d{}", i));
            fs::create_dir_all(&folder).unwrap();
            write_gradient_png(&folder, "photo.png", 6 + i % 5, 6)
        })
        .collect();

    let out = dir.path().join("out");
    let mut settings = png_settings();
    settings.export.naming_rule = NamingRule::KeepOriginal;
    let pipeline = ExportPipeline::new(offline_compositor(), &out).with_threads(Some(8));
    assert_eq!(
        pipeline.colliding_outputs(&sources, &settings),
        vec![out.join("photo.png")]
    );

    for _ in 0..5 {
        let report = pipeline.export_batch(&sources, &settings, Execution::Parallel);
        assert_eq!(report.failure_count(), 0);
        assert_eq!(report.success_count(), 40);
    }

    let names: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["photo.png".to_string()]);
    assert_eq!(image::open(out.join("photo.png")).unwrap().height(), 6);
}

#[test]
fn test_missing_encoder_fails_every_file_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let sources = vec![
        write_gradient_png(dir.path(), "a.png", 5, 5),
        write_gradient_png(dir.path(), "b.png", 6, 6),
    ];

    let pipeline = ExportPipeline::new(offline_compositor(), dir.path().join("out"))
        .with_encoders(EncoderRegistry::default().without(OutputFormat::Png));
    let report = pipeline.export_batch(&sources, &png_settings(), Execution::Parallel);

    assert_eq!(report.failure_count(), 2);
    assert!(report
        .failed()
        .all(|(_, e)| matches!(e, PhotomarkError::EncoderUnavailable { .. }) && e.is_per_file()));
    assert!(!dir.path().join("out").join("a_wm.png").exists());
}

#[test]
fn test_unreadable_source_is_reported_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.jpg");
    fs::write(&broken, b"not an image").unwrap();
    let sources = vec![
        write_gradient_png(dir.path(), "first.png", 4, 4),
        broken.clone(),
        dir.path().join("vanished.png"),
        write_gradient_png(dir.path(), "last.png", 4, 4),
    ];

    let out = dir.path().join("out");
    let report = ExportPipeline::new(offline_compositor(), &out).export_batch(
        &sources,
        &png_settings(),
        Execution::Sequential,
    );

    assert_eq!(report.success_count(), 2);
    let failed: Vec<_> = report.failed().map(|(source, _)| source.to_path_buf()).collect();
    assert_eq!(failed, vec![broken, dir.path().join("vanished.png")]);
    assert!(report
        .failed()
        .all(|(_, e)| matches!(e, PhotomarkError::UnreadableSourceImage { .. })));
    assert!(out.join("first_wm.png").exists());
    assert!(out.join("last_wm.png").exists());
}

#[test]
fn test_jpeg_export_flattens_transparency() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_solid_png(dir.path(), "clear.png", 16, 16, [0, 0, 0, 0]);

    let mut settings = WatermarkSettings::text("");
    settings.export.output_format = OutputFormat::Jpeg;
    settings.export.jpeg_quality = 1.0;

    let pipeline = ExportPipeline::new(offline_compositor(), dir.path().join("out"));
    let output = pipeline.export_file(&source, &settings).unwrap();

    assert_eq!(output, dir.path().join("out/clear.jpg"));
    let decoded = image::open(&output).unwrap().to_rgb8();
    for pixel in decoded.pixels() {
        assert!(pixel.0.iter().all(|&c| c >= 250), "{:?}", pixel);
    }
}

#[test]
fn test_png_export_keeps_alpha_and_watermark() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_solid_png(dir.path(), "half.png", 20, 20, [0, 0, 255, 128]);
    let logo = write_solid_png(dir.path(), "logo.png", 4, 4, [255, 255, 255, 255]);

    let mut settings = WatermarkSettings::image(&logo);
    settings.image.scale = 1.0;
    settings.image.opacity = 1.0;
    settings.placement.position_x = 0;
    settings.placement.position_y = 0;
    settings.export.output_format = OutputFormat::Png;
    settings.export.naming_rule = NamingRule::Prefix;
    settings.export.custom_text = "wm_".to_string();

    let pipeline = ExportPipeline::new(offline_compositor(), dir.path().join("out"));
    let output = pipeline.export_file(&source, &settings).unwrap();

    assert_eq!(output.file_name().unwrap(), "wm_half.png");
    let decoded = image::open(&output).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(1, 1).0, [255, 255, 255, 255]);
    assert_eq!(decoded.get_pixel(10, 10).0, [0, 0, 255, 128]);
}

#[test]
fn test_export_file_name_examples() {
    let mut settings = WatermarkSettings::default();
    settings.export.naming_rule = NamingRule::Prefix;
    settings.export.custom_text = "wm_".to_string();
    settings.export.output_format = OutputFormat::Jpeg;
    assert_eq!(export_file_name("photo.PNG", &settings), "wm_photo.jpg");

    settings.export.naming_rule = NamingRule::Suffix;
    settings.export.custom_text = "_done".to_string();
    settings.export.output_format = OutputFormat::Png;
    assert_eq!(export_file_name("a.b.jpg", &settings), "a.b_done.png");
}
