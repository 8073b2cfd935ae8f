use ab_glyph::FontArc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::canvas::FontFamily;
use crate::settings::EditorSettings;

/// Weight layers are drawn at (CSS `font-weight: 900`).
pub const DISPLAY_WEIGHT: u16 = 900;

/// Stem keywords ranked from heaviest to lightest; earlier wins.
const WEIGHT_KEYWORDS: &[&str] = &["black", "heavy", "extrabold", "ultrabold", "bold", "semibold", "medium", "regular"];

#[derive(Clone)]
struct LoadedFont {
    font: FontArc,
    bytes: Arc<Vec<u8>>,
}

/// Resolves `FontFamily` values to font data, caching every lookup.
///
/// Font directories from the settings are searched first (file stems like
/// `Inter-Black.ttf`), then the system font database. Clones share the cache.
#[derive(Clone)]
pub struct FontBook {
    directories: Vec<PathBuf>,
    use_system_fonts: bool,
    cache: Arc<Mutex<HashMap<FontFamily, Option<LoadedFont>>>>,
}

impl FontBook {
    pub fn new(directories: Vec<PathBuf>, use_system_fonts: bool) -> Self {
        Self { directories, use_system_fonts, cache: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self::new(settings.font_directories.clone(), settings.use_system_fonts)
    }

    /// Only the given directories are consulted; output does not depend on
    /// what is installed on the machine.
    pub fn without_system_fonts(directories: Vec<PathBuf>) -> Self {
        Self::new(directories, false)
    }

    pub fn font(&self, family: FontFamily) -> Option<FontArc> {
        self.resolve(family).map(|f| f.font)
    }

    /// Raw font file bytes, for registering with the UI toolkit.
    pub fn font_bytes(&self, family: FontFamily) -> Option<Arc<Vec<u8>>> {
        self.resolve(family).map(|f| f.bytes)
    }

    fn resolve(&self, family: FontFamily) -> Option<LoadedFont> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(entry) = cache.get(&family) {
                return entry.clone();
            }
        }

        let loaded = self.load_from_directories(family).or_else(|| {
            if self.use_system_fonts { load_system_font(family) } else { None }
        });
        if loaded.is_none() {
            log::warn!("No font found for family '{}'", family.family_name());
        }

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(family, loaded.clone());
        }
        loaded
    }

    fn load_from_directories(&self, family: FontFamily) -> Option<LoadedFont> {
        let key = family.file_key();
        let mut candidates: Vec<(usize, PathBuf)> = Vec::new();
        for dir in &self.directories {
            let Ok(entries) = std::fs::read_dir(dir) else {
                log::debug!("Font directory {} not readable", dir.display());
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !is_font_file(&path) {
                    continue;
                }
                let stem = normalized_stem(&path);
                if !stem.starts_with(&key) {
                    continue;
                }
                if stem.contains("italic") {
                    continue;
                }
                candidates.push((weight_rank(&stem), path));
            }
        }
        candidates.sort();

        candidates.into_iter().find_map(|(_, path)| {
            let bytes = std::fs::read(&path).ok()?;
            let font = FontArc::try_from_vec(bytes.clone()).ok()?;
            log::debug!("Font '{}' from {}", family.family_name(), path.display());
            Some(LoadedFont { font, bytes: Arc::new(bytes) })
        })
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf"))
        .unwrap_or(false)
}

fn normalized_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Lower is heavier. Variable fonts and unmarked files rank after named weights.
fn weight_rank(stem: &str) -> usize {
    WEIGHT_KEYWORDS
        .iter()
        .position(|kw| stem.contains(kw))
        .unwrap_or(WEIGHT_KEYWORDS.len())
}

/// Load a family from the system at display weight, falling back to the
/// generic serif / sans-serif family the way a browser would.
fn load_system_font(family: FontFamily) -> Option<LoadedFont> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight(DISPLAY_WEIGHT as f32);

    let generic = if family.is_serif() { FamilyName::Serif } else { FamilyName::SansSerif };
    let source = SystemSource::new();
    let handle = source
        .select_best_match(&[FamilyName::Title(family.family_name().to_string()), generic], &props)
        .ok()?;

    let font_data = handle.load().ok()?;
    let bytes: Vec<u8> = (*font_data.copy_font_data()?).clone();
    let font = FontArc::try_from_vec(bytes.clone()).ok()?;
    log::debug!("Font '{}' from system ({})", family.family_name(), font_data.full_name());
    Some(LoadedFont { font, bytes: Arc::new(bytes) })
}
