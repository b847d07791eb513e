//! Export pipeline
//!
//! Turns composited images into files:
//! - Output file naming from the source name and a naming rule
//! - JPEG (quality-controlled, alpha flattened) and PNG (lossless) encoding
//! - Per-file and batch export with per-file error reporting

pub mod encoder;
pub mod naming;
pub mod pipeline;

// Re-export commonly used types
pub use encoder::{
    flatten_alpha, quality_percent, EncodeOptions, EncodedImage, EncoderRegistry, ImageEncoder,
    JpegEncoder, PngEncoder,
};
pub use naming::{export_file_name, split_file_name};
pub use pipeline::{
    overwrites_source, write_file_atomic, BatchReport, Execution, ExportPipeline, FileOutcome,
};
