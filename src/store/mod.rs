//! Template store: named watermark settings plus a "last used" slot.
//!
//! Both are persisted as JSON documents in a per-user directory:
//!
//! - `templates.json`: every named template, rewritten as a whole after each
//!   save or delete
//! - `last_used.json`: the single last-used settings
//!
//! The in-memory map is loaded once when the store is opened and is the
//! source of truth for the rest of the session. Files that are missing start
//! the store empty; files that are unreadable or malformed also start it
//! empty, with a warning, and [`TemplateStore::load_status`] reports
//! [`LoadStatus::Reset`].

use crate::error::{PhotomarkError, PhotomarkResult};
use crate::export::write_file_atomic;
use crate::settings::WatermarkSettings;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Schema version written to both documents.
pub const STORE_VERSION: u32 = 1;

pub const TEMPLATES_FILE: &str = "templates.json";
pub const LAST_USED_FILE: &str = "last_used.json";

/// Locations of the two store documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub templates: PathBuf,
    pub last_used: PathBuf,
}

impl StorePaths {
    /// Both documents inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            templates: dir.join(TEMPLATES_FILE),
            last_used: dir.join(LAST_USED_FILE),
        }
    }
}

/// What opening the store found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// No store files yet; a normal first run.
    Fresh,
    /// Everything on disk was loaded.
    Loaded,
    /// Some stored data was unreadable or invalid and was discarded.
    Reset,
}

#[derive(Debug, Serialize, Deserialize)]
struct TemplatesDocument<M> {
    version: u32,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    templates: M,
}

#[derive(Debug, Serialize, Deserialize)]
struct LastUsedDocument<T> {
    version: u32,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    settings: T,
}

#[derive(Debug, Default)]
struct StoreState {
    templates: BTreeMap<String, WatermarkSettings>,
    last_used: Option<WatermarkSettings>,
}

/// Persistent named templates and last-used settings.
///
/// Mutations hold a lock across the in-memory update and the file write, so
/// concurrent saves never interleave their writes.
#[derive(Debug)]
pub struct TemplateStore {
    paths: StorePaths,
    state: Mutex<StoreState>,
    status: LoadStatus,
}

impl TemplateStore {
    /// Open the store at `paths`. Never fails: unreadable data is discarded.
    pub fn open(paths: StorePaths) -> Self {
        let (templates, templates_status) = load_templates(&paths.templates);
        let (last_used, last_used_status) = load_last_used(&paths.last_used);

        let status = match (templates_status, last_used_status) {
            (LoadStatus::Reset, _) | (_, LoadStatus::Reset) => LoadStatus::Reset,
            (LoadStatus::Fresh, LoadStatus::Fresh) => LoadStatus::Fresh,
            _ => LoadStatus::Loaded,
        };

        info!(
            path = %paths.templates.display(),
            templates = templates.len(),
            last_used = last_used.is_some(),
            status = ?status,
            "Template store opened"
        );

        Self {
            paths,
            state: Mutex::new(StoreState {
                templates,
                last_used,
            }),
            status,
        }
    }

    /// Open the store in `dir`.
    pub fn open_dir(dir: impl AsRef<Path>) -> Self {
        Self::open(StorePaths::in_dir(dir))
    }

    pub fn load_status(&self) -> LoadStatus {
        self.status
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Save `settings` under `name`, replacing any existing template.
    ///
    /// If the write fails the template stays saved in memory and the error
    /// is returned.
    pub fn save(&self, name: &str, settings: &WatermarkSettings) -> PhotomarkResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PhotomarkError::invalid("name", "template name cannot be empty"));
        }
        let settings = settings.clone().normalized()?;

        let mut state = self.state.lock();
        state.templates.insert(name.to_string(), settings);
        debug!(name, "Template saved");
        self.flush_templates(&state.templates)
    }

    pub fn load(&self, name: &str) -> Option<WatermarkSettings> {
        self.state.lock().templates.get(name.trim()).cloned()
    }

    /// Delete the template `name`. Returns whether it existed.
    pub fn delete(&self, name: &str) -> PhotomarkResult<bool> {
        let mut state = self.state.lock();
        if state.templates.remove(name.trim()).is_none() {
            return Ok(false);
        }
        debug!(name, "Template deleted");
        self.flush_templates(&state.templates)?;
        Ok(true)
    }

    /// Template names in sorted order.
    pub fn list_names(&self) -> Vec<String> {
        self.state.lock().templates.keys().cloned().collect()
    }

    pub fn save_last_used(&self, settings: &WatermarkSettings) -> PhotomarkResult<()> {
        let settings = settings.clone().normalized()?;

        let mut state = self.state.lock();
        let document = LastUsedDocument {
            version: STORE_VERSION,
            saved_at: Some(Utc::now()),
            settings: &settings,
        };
        state.last_used = Some(settings.clone());
        write_json(&self.paths.last_used, &document)
    }

    pub fn load_last_used(&self) -> Option<WatermarkSettings> {
        self.state.lock().last_used.clone()
    }

    fn flush_templates(&self, templates: &BTreeMap<String, WatermarkSettings>) -> PhotomarkResult<()> {
        let document = TemplatesDocument {
            version: STORE_VERSION,
            saved_at: Some(Utc::now()),
            templates,
        };
        write_json(&self.paths.templates, &document)
    }
}

fn write_json<T: Serialize>(path: &Path, document: &T) -> PhotomarkResult<()> {
    let json = serde_json::to_string_pretty(document)?;
    write_file_atomic(path, json.as_bytes()).map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to write settings store");
        e
    })
}

/// Read and parse a store document. `Ok(None)` when the file does not exist.
fn read_document<T: DeserializeOwned>(path: &Path) -> PhotomarkResult<Option<T>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PhotomarkError::StoreCorrupt {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    serde_json::from_str(&data)
        .map(Some)
        .map_err(|e| PhotomarkError::StoreCorrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn load_templates(path: &Path) -> (BTreeMap<String, WatermarkSettings>, LoadStatus) {
    let document: TemplatesDocument<BTreeMap<String, serde_json::Value>> =
        match read_document(path) {
            Ok(Some(document)) => document,
            Ok(None) => return (BTreeMap::new(), LoadStatus::Fresh),
            Err(e) => {
                warn!(error = %e, "Starting with no templates");
                return (BTreeMap::new(), LoadStatus::Reset);
            }
        };

    check_version(path, document.version, document.saved_at);

    let mut status = LoadStatus::Loaded;
    let mut templates = BTreeMap::new();
    for (name, value) in document.templates {
        match parse_settings(value) {
            Ok(settings) => {
                templates.insert(name, settings);
            }
            Err(e) => {
                warn!(name = %name, error = %e, "Dropping invalid template");
                status = LoadStatus::Reset;
            }
        }
    }

    (templates, status)
}

fn load_last_used(path: &Path) -> (Option<WatermarkSettings>, LoadStatus) {
    let document: LastUsedDocument<serde_json::Value> = match read_document(path) {
        Ok(Some(document)) => document,
        Ok(None) => return (None, LoadStatus::Fresh),
        Err(e) => {
            warn!(error = %e, "Starting with no last-used settings");
            return (None, LoadStatus::Reset);
        }
    };

    check_version(path, document.version, document.saved_at);

    match parse_settings(document.settings) {
        Ok(settings) => (Some(settings), LoadStatus::Loaded),
        Err(e) => {
            warn!(error = %e, "Discarding invalid last-used settings");
            (None, LoadStatus::Reset)
        }
    }
}

/// Newer documents are still loaded; unknown fields are ignored.
fn check_version(path: &Path, version: u32, saved_at: Option<DateTime<Utc>>) {
    if version > STORE_VERSION {
        warn!(
            path = %path.display(),
            version,
            supported = STORE_VERSION,
            "Settings store written by a newer version"
        );
    }
    debug!(path = %path.display(), version, saved_at = ?saved_at, "Settings store loaded");
}

fn parse_settings(value: serde_json::Value) -> PhotomarkResult<WatermarkSettings> {
    let settings: WatermarkSettings = serde_json::from_value(value)?;
    settings.normalized()
}
