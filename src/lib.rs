// photomark: batch photo watermarking library

pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod preview;
pub mod settings;
pub mod store;
pub mod watermark;

pub use error::{PhotomarkError, PhotomarkResult};
