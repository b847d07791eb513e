//! Source image import.
//!
//! Which files can be imported, folder scanning, decoding and thumbnails.

use crate::error::{PhotomarkError, PhotomarkResult};
use image::imageops::FilterType;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions (lowercase, without dot) of files that can be imported.
const IMPORTABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff"];

/// Thumbnail bounds used by the file list of a shell.
pub const THUMBNAIL_MAX_WIDTH: u32 = 150;
pub const THUMBNAIL_MAX_HEIGHT: u32 = 100;

/// Extensions of importable files, lowercase and without the dot.
pub fn list_importable_extensions() -> &'static [&'static str] {
    IMPORTABLE_EXTENSIONS
}

/// Whether `path` has an importable extension (case-insensitive).
pub fn is_importable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMPORTABLE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Importable files directly inside `dir`, sorted by path.
///
/// Subdirectories are not descended into.
pub fn scan_folder(dir: &Path) -> PhotomarkResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_importable(&path) {
            files.push(path);
        }
    }
    files.sort();
    debug!(dir = %dir.display(), count = files.len(), "Scanned folder");
    Ok(files)
}

/// Expand a mix of files and folders into the list of files to process.
///
/// Folders contribute their importable files; files are kept as given, so
/// an unreadable file is reported by the export rather than dropped here.
pub fn collect_sources(inputs: &[PathBuf]) -> PhotomarkResult<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for input in inputs {
        if input.is_dir() {
            sources.extend(scan_folder(input)?);
        } else {
            sources.push(input.clone());
        }
    }
    Ok(sources)
}

/// Decode the image at `path`, detecting the format from its content.
pub fn load_image(path: &Path) -> PhotomarkResult<DynamicImage> {
    image::io::Reader::open(path)
        .map_err(|e| PhotomarkError::unreadable_source(path, e))?
        .with_guessed_format()
        .map_err(|e| PhotomarkError::unreadable_source(path, e))?
        .decode()
        .map_err(|e| PhotomarkError::unreadable_source(path, e))
}

/// Scale `image` to fit inside `max_width` x `max_height`, keeping its aspect
/// ratio. Small images are scaled up.
pub fn thumbnail(image: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = (image.width().max(1), image.height().max(1));
    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    resize_image(
        image,
        ((width as f64 * scale) as u32).max(1),
        ((height as f64 * scale) as u32).max(1),
    )
}

/// Resize to exactly `width` x `height` with bilinear filtering.
pub fn resize_image(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_exact(width.max(1), height.max(1), FilterType::Triangle)
}
