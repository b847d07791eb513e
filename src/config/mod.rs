// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PhotomarkError, PhotomarkResult};
use crate::settings::Color;

/// Name of the per-user directory holding the configuration and the store.
pub const APP_DIR_NAME: &str = "photomark";

/// File name of the configuration inside the per-user directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `export.threads`.
const MAX_THREADS: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub fonts: FontsConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

/// Where templates and last-used settings live
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory override (default: `<user config dir>/photomark`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Font directories searched in addition to the system fonts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    pub dirs: Vec<PathBuf>,
}

fn default_parallel() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Export batches on a thread pool (default: true)
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Worker threads; unset uses one per CPU
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Colour transparent pixels are flattened onto for JPEG (default: white)
    #[serde(default = "Color::white")]
    pub jpeg_background: Color,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            threads: None,
            jpeg_background: Color::white(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level, overridden by `RUST_LOG` (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> PhotomarkResult<Self> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| PhotomarkError::Config(e.to_string()))?;

        let mut missing = Vec::new();
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                missing.push(var_name.to_string());
                String::new()
            })
        });

        if let Some(var_name) = missing.first() {
            return Err(PhotomarkError::Config(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            )));
        }

        // An empty or comment-only document means all defaults
        if substituted.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| PhotomarkError::Config(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> PhotomarkResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            PhotomarkError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Load `path` if it exists, otherwise return the defaults.
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> PhotomarkResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PhotomarkResult<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(PhotomarkError::Config(format!(
                "Invalid logging.level '{}'. Supported levels: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if let Some(threads) = self.export.threads {
            if threads == 0 || threads > MAX_THREADS {
                return Err(PhotomarkError::Config(format!(
                    "export.threads must be between 1 and {}, got {}",
                    MAX_THREADS, threads
                )));
            }
        }

        if let Some(dir) = &self.store.dir {
            if dir.as_os_str().is_empty() {
                return Err(PhotomarkError::Config(
                    "store.dir cannot be empty".to_string(),
                ));
            }
        }

        for dir in &self.fonts.dirs {
            if dir.as_os_str().is_empty() {
                return Err(PhotomarkError::Config(
                    "fonts.dirs cannot contain an empty path".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Directory of the template store, honouring `store.dir`.
    pub fn store_dir(&self) -> PathBuf {
        self.store.dir.clone().unwrap_or_else(default_app_dir)
    }
}

/// `<user config dir>/photomark`, or `./.photomark` when the platform has no
/// config directory.
pub fn default_app_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{}", APP_DIR_NAME)))
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    default_app_dir().join(CONFIG_FILE_NAME)
}
