//! Font lookup for text watermarks.
//!
//! Faces are resolved by family name from the system font database plus any
//! extra directories from the configuration file. A request that names an
//! uninstalled family falls back to the generic sans-serif family, then to
//! any installed face. Loaded faces are kept per (family, style) so a batch
//! parses each font file once.

use super::WatermarkError;
use crate::settings::FontStyle;
use ab_glyph::FontVec;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

static SYSTEM_FONTS: OnceLock<Arc<FontBook>> = OnceLock::new();

/// Installed fonts and the faces loaded from them so far.
pub struct FontBook {
    db: fontdb::Database,
    loaded: RwLock<HashMap<(String, FontStyle), Arc<FontVec>>>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.db.len())
            .field("loaded", &self.loaded.read().len())
            .finish()
    }
}

impl FontBook {
    /// System fonts plus the given extra directories.
    ///
    /// Directories that do not exist are skipped.
    pub fn with_dirs(dirs: &[PathBuf]) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        for dir in dirs {
            db.load_fonts_dir(dir);
        }
        debug!(faces = db.len(), "Font database loaded");
        Self::from_database(db)
    }

    /// Process-wide book of system fonts, loaded on first use.
    pub fn system() -> Arc<FontBook> {
        Arc::clone(SYSTEM_FONTS.get_or_init(|| Arc::new(FontBook::with_dirs(&[]))))
    }

    /// A book with no fonts at all. Every lookup fails.
    pub fn empty() -> Self {
        Self::from_database(fontdb::Database::new())
    }

    fn from_database(db: fontdb::Database) -> Self {
        Self {
            db,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Number of installed faces known to the book.
    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// Installed family names, sorted and without duplicates.
    pub fn family_names(&self) -> Vec<String> {
        self.db
            .faces()
            .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Resolve a face for `family` in `style`.
    pub fn resolve(&self, family: &str, style: FontStyle) -> Result<Arc<FontVec>, WatermarkError> {
        let key = (family.to_lowercase(), style);
        if let Some(font) = self.loaded.read().get(&key) {
            return Ok(Arc::clone(font));
        }

        let font = Arc::new(self.load_face(family, style)?);
        self.loaded.write().insert(key, Arc::clone(&font));
        Ok(font)
    }

    fn load_face(&self, family: &str, style: FontStyle) -> Result<FontVec, WatermarkError> {
        let families = [fontdb::Family::Name(family), fontdb::Family::SansSerif];
        let query = fontdb::Query {
            families: &families,
            weight: if style.contains(FontStyle::BOLD) {
                fontdb::Weight::BOLD
            } else {
                fontdb::Weight::NORMAL
            },
            stretch: fontdb::Stretch::Normal,
            style: if style.contains(FontStyle::ITALIC) {
                fontdb::Style::Italic
            } else {
                fontdb::Style::Normal
            },
        };

        let id = match self.db.query(&query) {
            Some(id) => id,
            None => {
                let any = self.db.faces().next().map(|face| face.id);
                if any.is_some() {
                    warn!(family, "Font family not installed, using first available face");
                }
                any.ok_or_else(|| WatermarkError::FontUnavailable {
                    family: family.to_string(),
                })?
            }
        };

        self.db
            .with_face_data(id, |data, index| {
                FontVec::try_from_vec_and_index(data.to_vec(), index)
            })
            .ok_or_else(|| WatermarkError::FontUnavailable {
                family: family.to_string(),
            })?
            .map_err(|e| WatermarkError::RenderError(format!("invalid font data: {}", e)))
    }
}
