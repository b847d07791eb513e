//! Batch export: decode, composite, encode and write each source image.
//!
//! [`ExportPipeline::export_file`] is the per-file task. Batches run it over
//! every source either sequentially or on a rayon pool; failures are
//! collected per file in a [`BatchReport`] and never stop the other files.

use super::encoder::{EncodeOptions, EncodedImage, EncoderRegistry};
use super::naming::export_file_name;
use crate::error::{PhotomarkError, PhotomarkResult};
use crate::import::load_image;
use crate::settings::{Color, WatermarkSettings};
use crate::watermark::WatermarkCompositor;
use image::RgbaImage;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// How a batch is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    Sequential,
    /// On a rayon pool. Completion order is unspecified.
    #[default]
    Parallel,
}

/// Outcome of exporting one source file.
#[derive(Debug)]
pub struct FileOutcome {
    pub source: PathBuf,
    /// The written output path, or why the file failed.
    pub result: PhotomarkResult<PathBuf>,
}

/// Per-file outcomes of a batch, in source order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Ok(output) => Some((o.source.as_path(), output.as_path())),
            Err(_) => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Path, &PhotomarkError)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Ok(_) => None,
            Err(e) => Some((o.source.as_path(), e)),
        })
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// True when every file was exported.
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Writes watermarked copies of source images into an output directory.
#[derive(Debug, Clone)]
pub struct ExportPipeline {
    compositor: WatermarkCompositor,
    encoders: EncoderRegistry,
    output_dir: PathBuf,
    background: Color,
    threads: Option<usize>,
}

impl ExportPipeline {
    pub fn new(compositor: WatermarkCompositor, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            compositor,
            encoders: EncoderRegistry::default(),
            output_dir: output_dir.into(),
            background: Color::white(),
            threads: None,
        }
    }

    pub fn with_encoders(mut self, encoders: EncoderRegistry) -> Self {
        self.encoders = encoders;
        self
    }

    /// Colour that transparent pixels are flattened onto for JPEG output.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Worker threads for parallel batches. `None` or 0 uses rayon's global
    /// pool.
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads.filter(|&n| n > 0);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn compositor(&self) -> &WatermarkCompositor {
        &self.compositor
    }

    /// Encode a composited image in the format selected by `settings`.
    pub fn encode(
        &self,
        image: &RgbaImage,
        settings: &WatermarkSettings,
    ) -> PhotomarkResult<EncodedImage> {
        let encoder = self.encoders.get(settings.export.output_format)?;
        encoder.encode(image, &EncodeOptions::from_settings(settings, self.background))
    }

    /// Encode and atomically write a composited image to `path`.
    pub fn encode_to_path(
        &self,
        image: &RgbaImage,
        settings: &WatermarkSettings,
        path: &Path,
    ) -> PhotomarkResult<()> {
        let encoded = self.encode(image, settings)?;
        write_file_atomic(path, &encoded.data)
    }

    /// Output path for `source` under the output directory.
    pub fn output_path(&self, source: &Path, settings: &WatermarkSettings) -> PathBuf {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.output_dir.join(export_file_name(&name, settings))
    }

    /// Export one source file and return the written path.
    pub fn export_file(&self, source: &Path, settings: &WatermarkSettings) -> PhotomarkResult<PathBuf> {
        let started = Instant::now();

        let base = load_image(source)?;
        let composited = self.compositor.composite(&base, settings);
        let output = self.output_path(source, settings);
        self.encode_to_path(&composited, settings, &output)?;

        debug!(
            source = %source.display(),
            output = %output.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Exported file"
        );
        Ok(output)
    }

    /// Output paths that more than one source maps to, in first-seen order.
    pub fn colliding_outputs(
        &self,
        sources: &[PathBuf],
        settings: &WatermarkSettings,
    ) -> Vec<PathBuf> {
        let mut counts: HashMap<PathBuf, usize> = HashMap::new();
        let mut order = Vec::new();
        for source in sources {
            let output = self.output_path(source, settings);
            let count = counts.entry(output.clone()).or_insert(0);
            *count += 1;
            if *count == 2 {
                order.push(output);
            }
        }
        order
    }

    /// Export every source. Failures are reported per file.
    ///
    /// Sources that map to the same output path are all exported; the file
    /// left on disk is whichever write finished last.
    pub fn export_batch(
        &self,
        sources: &[PathBuf],
        settings: &WatermarkSettings,
        execution: Execution,
    ) -> BatchReport {
        let started = Instant::now();
        for output in self.colliding_outputs(sources, settings) {
            warn!(output = %output.display(), "Several sources export to the same file");
        }
        let run = |source: &PathBuf| {
            let result = self.export_file(source, settings);
            if let Err(e) = &result {
                warn!(source = %source.display(), error = %e, "Export failed");
            }
            FileOutcome {
                source: source.clone(),
                result,
            }
        };

        let outcomes: Vec<FileOutcome> = match execution {
            Execution::Sequential => sources.iter().map(run).collect(),
            Execution::Parallel => match self.thread_pool() {
                Some(pool) => pool.install(|| sources.par_iter().map(run).collect()),
                None => sources.par_iter().map(run).collect(),
            },
        };

        let report = BatchReport { outcomes };
        info!(
            total = report.len(),
            succeeded = report.success_count(),
            failed = report.failure_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch export finished"
        );
        report
    }

    fn thread_pool(&self) -> Option<rayon::ThreadPool> {
        let threads = self.threads?;
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(threads, error = %e, "Falling back to the global thread pool");
                None
            }
        }
    }
}

/// Whether exporting `sources` into `output_dir` could overwrite one of them.
///
/// True when `output_dir` is the parent directory of any source.
pub fn overwrites_source(sources: &[PathBuf], output_dir: &Path) -> bool {
    let output_dir = normalize_dir(output_dir);
    sources.iter().any(|source| {
        source
            .parent()
            .map(|parent| normalize_dir(parent) == output_dir)
            .unwrap_or(false)
    })
}

fn normalize_dir(dir: &Path) -> PathBuf {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

/// Write `data` to `path` via a temporary file and a rename, so a failed or
/// interrupted write never leaves a truncated output behind.
///
/// Each call writes its own uniquely named temporary file, so concurrent
/// writes to the same path never collide; the last rename wins.
pub fn write_file_atomic(path: &Path, data: &[u8]) -> PhotomarkResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // Create parent directory if needed
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".photomark-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(data)?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
