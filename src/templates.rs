//! Named, reusable layer layouts scoped to an aspect ratio.
//!
//! The store keeps the whole list in memory and rewrites the backing
//! repository in full after every change. Storage is behind the
//! `TemplateRepository` trait; the editor never sees the medium.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

use crate::canvas::{AspectRatio, LayerCollection};
use crate::error::TemplateError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub layers: LayerCollection,
    pub aspect_ratio: AspectRatio,
}

impl Template {
    /// Copy of the layers with a new id per layer, ready to drop into a session.
    pub fn instantiate(&self) -> LayerCollection {
        self.layers.with_fresh_ids()
    }
}

/// How applying a template combines with the working layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ApplyMode {
    /// Working layers are replaced by the template's.
    #[default]
    Replace,
    /// Template layers are added on top of the working layers.
    Append,
}

// ============================================================================
// REPOSITORIES
// ============================================================================

/// Durable storage for the flat template list.
pub trait TemplateRepository: Send {
    /// Everything stored. An absent store is an empty list, not an error.
    fn list(&self) -> Result<Vec<Template>, TemplateError>;
    /// Overwrite the stored list with `templates`.
    fn replace_all(&self, templates: &[Template]) -> Result<(), TemplateError>;
}

/// JSON file holding the whole list. Writes go through a temp file + rename.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemplateRepository for JsonFileRepository {
    fn list(&self) -> Result<Vec<Template>, TemplateError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(TemplateError::Io { path: self.path.clone(), error }),
        };
        if raw.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&raw).map_err(|e| TemplateError::Corrupt(e.to_string()))
    }

    fn replace_all(&self, templates: &[Template]) -> Result<(), TemplateError> {
        let json = serde_json::to_vec_pretty(templates)?;
        crate::io::write_atomic(&self.path, &json)
            .map_err(|error| TemplateError::Io { path: self.path.clone(), error })
    }
}

/// Non-durable repository for tests and sessions without a store file.
#[derive(Default)]
pub struct MemoryRepository {
    templates: Mutex<Vec<Template>>,
    fail_writes: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: Vec<Template>) -> Self {
        Self { templates: Mutex::new(templates), fail_writes: false }
    }

    /// A repository whose writes always fail.
    pub fn read_only(templates: Vec<Template>) -> Self {
        Self { templates: Mutex::new(templates), fail_writes: true }
    }
}

impl TemplateRepository for MemoryRepository {
    fn list(&self) -> Result<Vec<Template>, TemplateError> {
        self.templates
            .lock()
            .map(|t| t.clone())
            .map_err(|_| TemplateError::Corrupt("repository lock poisoned".to_string()))
    }

    fn replace_all(&self, templates: &[Template]) -> Result<(), TemplateError> {
        if self.fail_writes {
            return Err(TemplateError::Io {
                path: PathBuf::from("<memory>"),
                error: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only repository"),
            });
        }
        let mut stored = self
            .templates
            .lock()
            .map_err(|_| TemplateError::Corrupt("repository lock poisoned".to_string()))?;
        *stored = templates.to_vec();
        Ok(())
    }
}

// ============================================================================
// TEMPLATE STORE
// ============================================================================

pub struct TemplateStore {
    repository: Box<dyn TemplateRepository>,
    templates: Vec<Template>,
}

impl TemplateStore {
    /// Load the list once. An unreadable or corrupt store degrades to empty.
    pub fn open(repository: Box<dyn TemplateRepository>) -> Self {
        let templates = match repository.list() {
            Ok(templates) => templates,
            Err(e) => {
                log::warn!("Template store unavailable, starting empty: {}", e);
                Vec::new()
            }
        };
        log::info!("Loaded {} template(s)", templates.len());
        Self { repository, templates }
    }

    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::open(Box::new(JsonFileRepository::new(path)))
    }

    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryRepository::new()))
    }

    /// All templates, newest first.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn for_aspect(&self, aspect: AspectRatio) -> impl Iterator<Item = &Template> {
        self.templates.iter().filter(move |t| t.aspect_ratio == aspect)
    }

    pub fn find(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// First template named `name` (case-insensitive), preferring `aspect`.
    pub fn find_by_name(&self, name: &str, aspect: Option<AspectRatio>) -> Option<&Template> {
        let name = name.trim();
        let matches = |t: &&Template| t.name.eq_ignore_ascii_case(name);
        aspect
            .and_then(|a| self.for_aspect(a).find(matches))
            .or_else(|| self.templates.iter().find(matches))
    }

    /// Save `layers` under `name`. A blank name saves nothing and returns
    /// `Ok(None)`. If persisting fails the store is left as it was.
    pub fn save(
        &mut self,
        name: &str,
        layers: &LayerCollection,
        aspect_ratio: AspectRatio,
    ) -> Result<Option<Template>, TemplateError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let template = Template {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            layers: layers.clone(),
            aspect_ratio,
        };
        self.templates.insert(0, template.clone());
        if let Err(e) = self.repository.replace_all(&self.templates) {
            self.templates.remove(0);
            return Err(e);
        }
        log::info!("Saved template '{}' ({} layers, {})", template.name, template.layers.len(), aspect_ratio);
        Ok(Some(template))
    }

    /// Remove a template. Returns false when no template has `id`.
    pub fn delete(&mut self, id: &str) -> Result<bool, TemplateError> {
        let Some(idx) = self.templates.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        let removed = self.templates.remove(idx);
        if let Err(e) = self.repository.replace_all(&self.templates) {
            self.templates.insert(idx, removed);
            return Err(e);
        }
        log::info!("Deleted template '{}'", removed.name);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Layer;

    fn three_layers() -> LayerCollection {
        vec![Layer::default_text(), Layer::default_text(), Layer::default_button()].into()
    }

    #[test]
    fn save_prepends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        let mut store = TemplateStore::open_file(&path);
        assert!(store.is_empty());

        store.save("First", &three_layers(), AspectRatio::Square).unwrap();
        store.save("Second", &three_layers(), AspectRatio::Story9x16).unwrap();
        assert_eq!(store.templates()[0].name, "Second");

        let reopened = TemplateStore::open_file(&path);
        assert_eq!(reopened.templates(), store.templates());
        assert_eq!(reopened.for_aspect(AspectRatio::Square).count(), 1);
    }

    #[test]
    fn blank_name_saves_nothing() {
        let mut store = TemplateStore::in_memory();
        assert_eq!(store.save("", &three_layers(), AspectRatio::Square).unwrap(), None);
        assert_eq!(store.save("   ", &three_layers(), AspectRatio::Square).unwrap(), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn corrupt_store_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        std::fs::write(&path, b"[{\"id\": 3, \"bogus\"").unwrap();
        let store = TemplateStore::open_file(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn failed_persist_rolls_back() {
        let existing = Template {
            id: "t1".to_string(),
            name: "Keep".to_string(),
            layers: three_layers(),
            aspect_ratio: AspectRatio::Square,
        };
        let mut store = TemplateStore::open(Box::new(MemoryRepository::read_only(vec![existing])));
        assert!(store.save("New", &three_layers(), AspectRatio::Square).is_err());
        assert_eq!(store.len(), 1);
        assert!(store.delete("t1").is_err());
        assert_eq!(store.templates()[0].id, "t1");
    }

    #[test]
    fn delete_removes_and_reports() {
        let mut store = TemplateStore::in_memory();
        let saved = store.save("Promo", &three_layers(), AspectRatio::Wide16x9).unwrap().unwrap();
        assert!(!store.delete("nope").unwrap());
        assert!(store.delete(&saved.id).unwrap());
        assert!(store.find(&saved.id).is_none());
    }

    #[test]
    fn instantiate_gives_fresh_ids() {
        let mut store = TemplateStore::in_memory();
        let saved = store.save("Promo A", &three_layers(), AspectRatio::Square).unwrap().unwrap();
        let a = saved.instantiate();
        let b = saved.instantiate();
        for layer in a.iter() {
            assert!(!b.contains(&layer.id));
            assert!(!saved.layers.contains(&layer.id));
        }
        assert_eq!(store.find_by_name("promo a", Some(AspectRatio::Portrait4x5)).map(|t| &t.id), Some(&saved.id));
    }
}
