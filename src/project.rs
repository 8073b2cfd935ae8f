use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::canvas::{AspectRatio, LayerCollection};

/// A generated creative as handed over by the generation pipeline.
///
/// The editor borrows `layers` and hands them back on apply; `image`,
/// `id` and every field it does not know about pass through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creative {
    pub id: String,
    /// Base image reference: a path, `file://` URI or `data:` URI.
    #[serde(rename = "imageUrl", alias = "image")]
    pub image: String,
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub layers: LayerCollection,
    /// Copy, platform, timestamp and anything else the generator attached.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Creative {
    pub fn new(id: impl Into<String>, image: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self {
            id: id.into(),
            image: image.into(),
            aspect_ratio,
            layers: LayerCollection::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Deterministic export name: `creative-<id>.png`, with the id reduced
    /// to `[A-Za-z0-9_-]`.
    pub fn export_file_name(&self) -> String {
        let safe: String = self
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if safe.is_empty() {
            "creative.png".to_string()
        } else {
            format!("creative-{}.png", safe)
        }
    }
}

/// A creative opened from disk.
pub struct CreativeDocument {
    pub creative: Creative,
    /// `None` when the creative did not come from a file.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,
    pub name: String,
}

impl CreativeDocument {
    pub fn new(creative: Creative, path: Option<PathBuf>) -> Self {
        let name = path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| creative.id.clone());
        Self { creative, path, is_dirty: false, name }
    }

    /// Directory relative image paths resolve against.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.path.as_ref().and_then(|p| p.parent()).map(|p| p.to_path_buf())
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_marks_unsaved_changes() {
        let creative = Creative::new("c1", "a.png", AspectRatio::Square);
        let mut doc = CreativeDocument::new(creative, Some(PathBuf::from("/ads/spring.json")));
        assert_eq!(doc.display_title(), "spring.json");
        doc.mark_dirty();
        assert_eq!(doc.display_title(), "spring.json*");
        doc.mark_clean();
        assert_eq!(doc.display_title(), "spring.json");
    }

    #[test]
    fn export_name_is_sanitized() {
        let c = Creative::new("ad 7/../x", "a.png", AspectRatio::Square);
        assert_eq!(c.export_file_name(), "creative-ad_7____x.png");
        let c = Creative::new("k3j_9-a", "a.png", AspectRatio::Square);
        assert_eq!(c.export_file_name(), "creative-k3j_9-a.png");
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let json = r#"{
            "id": "abc",
            "imageUrl": "data:image/png;base64,AAAA",
            "aspectRatio": "9:16",
            "platform": "Meta",
            "timestamp": 1700000000,
            "copy": {"headline": "Hi", "cta": "Buy"}
        }"#;
        let creative: Creative = serde_json::from_str(json).unwrap();
        assert_eq!(creative.aspect_ratio, AspectRatio::Story9x16);
        assert!(creative.layers.is_empty());

        let back = serde_json::to_value(&creative).unwrap();
        assert_eq!(back["platform"], "Meta");
        assert_eq!(back["copy"]["cta"], "Buy");
        assert_eq!(back["imageUrl"], "data:image/png;base64,AAAA");
    }
}
