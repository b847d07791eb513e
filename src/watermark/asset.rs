//! Watermark image loading with caching.
//!
//! Watermark images are decoded once and kept in memory as RGBA buffers so a
//! batch export decodes its asset a single time. Entries are keyed by path and
//! invalidated when the file's modification time changes, so editing the logo
//! between two exports is picked up without restarting.

use super::WatermarkError;
use image::RgbaImage;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::debug;

/// Configuration for the asset cache.
#[derive(Debug, Clone)]
pub struct AssetCacheConfig {
    /// Maximum number of cached images.
    pub max_entries: usize,
}

impl Default for AssetCacheConfig {
    fn default() -> Self {
        Self { max_entries: 16 }
    }
}

/// Cached watermark image with metadata.
#[derive(Clone)]
pub struct CachedAsset {
    /// The decoded RGBA image.
    pub image: Arc<RgbaImage>,
    modified: Option<SystemTime>,
    loaded_at: Instant,
}

impl std::fmt::Debug for CachedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedAsset")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("modified", &self.modified)
            .finish()
    }
}

/// Decoded watermark images keyed by path.
#[derive(Debug, Default)]
pub struct AssetCache {
    config: AssetCacheConfig,
    entries: RwLock<HashMap<PathBuf, CachedAsset>>,
}

impl AssetCache {
    pub fn new(config: AssetCacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Load the image at `path`, decoding it only if it is not cached or the
    /// file changed since it was cached.
    pub fn load(&self, path: &Path) -> Result<Arc<RgbaImage>, WatermarkError> {
        let modified = std::fs::metadata(path)
            .map_err(|e| unreadable(path, e))?
            .modified()
            .ok();

        if let Some(cached) = self.entries.read().get(path) {
            if cached.modified == modified {
                return Ok(Arc::clone(&cached.image));
            }
        }

        debug!(path = %path.display(), "Decoding watermark image");
        let image = Arc::new(image::open(path).map_err(|e| unreadable(path, e))?.to_rgba8());

        let mut entries = self.entries.write();
        if entries.len() >= self.config.max_entries && !entries.contains_key(path) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, cached)| cached.loaded_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }
        entries.insert(
            path.to_path_buf(),
            CachedAsset {
                image: Arc::clone(&image),
                modified,
                loaded_at: Instant::now(),
            },
        );

        Ok(image)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

fn unreadable(path: &Path, err: impl ToString) -> WatermarkError {
    WatermarkError::AssetUnreadable {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
