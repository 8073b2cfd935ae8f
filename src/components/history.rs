use eframe::egui;
use std::collections::VecDeque;

use crate::canvas::LayerCollection;

pub const DEFAULT_MAX_HISTORY: usize = 50;

// ============================================================================
// HISTORY ENTRY
// ============================================================================

/// Full snapshot of the layer collection taken after one discrete action.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub description: String,
    pub layers: LayerCollection,
}

// ============================================================================
// HISTORY MANAGER - Bounded snapshot list with a cursor
// ============================================================================

/// Undo/redo history over whole-collection snapshots.
///
/// `entries[cursor]` is always the state the working collection is in.
/// Entries after the cursor are the redo branch; they are discarded by the
/// next `push`.
pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
    cursor: usize,
    max_history_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(LayerCollection::new(), DEFAULT_MAX_HISTORY)
    }
}

impl HistoryManager {
    /// Start a history whose only entry is `initial` (the opened state).
    pub fn new(initial: LayerCollection, max_history_size: usize) -> Self {
        let mut entries = VecDeque::with_capacity(max_history_size.min(64));
        entries.push_back(HistoryEntry { description: "Open".to_string(), layers: initial });
        Self { entries, cursor: 0, max_history_size: max_history_size.max(1) }
    }

    /// Record `snapshot` as the newest state.
    pub fn push(&mut self, description: impl Into<String>, snapshot: &LayerCollection) {
        // Drop the redo branch
        self.entries.truncate(self.cursor + 1);

        self.entries.push_back(HistoryEntry {
            description: description.into(),
            layers: snapshot.clone(),
        });

        while self.entries.len() > self.max_history_size {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;

        log::debug!(
            "history push '{}' ({} of {})",
            self.entries[self.cursor].description,
            self.cursor + 1,
            self.entries.len()
        );
    }

    /// Step back one entry. Returns an independent copy of the restored state,
    /// or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<LayerCollection> {
        if self.cursor == 0 {
            return None;
        }
        let undone = &self.entries[self.cursor].description;
        log::debug!("history undo '{}'", undone);
        self.cursor -= 1;
        Some(self.entries[self.cursor].layers.clone())
    }

    /// Step forward one entry, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<LayerCollection> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        log::debug!("history redo '{}'", self.entries[self.cursor].description);
        Some(self.entries[self.cursor].layers.clone())
    }

    /// Undo `steps` times, stopping early at the oldest entry.
    pub fn undo_to(&mut self, steps: usize) -> Option<LayerCollection> {
        let mut restored = None;
        for _ in 0..steps {
            match self.undo() {
                Some(layers) => restored = Some(layers),
                None => break,
            }
        }
        restored
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Label of the action the next `undo` reverts.
    pub fn undo_description(&self) -> Option<&str> {
        if self.can_undo() {
            Some(self.entries[self.cursor].description.as_str())
        } else {
            None
        }
    }

    /// Label of the action the next `redo` reapplies.
    pub fn redo_description(&self) -> Option<&str> {
        self.entries.get(self.cursor + 1).map(|e| e.description.as_str())
    }

    /// Descriptions up to and including the cursor, most recent first.
    pub fn undo_history(&self) -> Vec<&str> {
        self.entries
            .iter()
            .take(self.cursor + 1)
            .rev()
            .map(|e| e.description.as_str())
            .collect()
    }

    pub fn current(&self) -> &LayerCollection {
        &self.entries[self.cursor].layers
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    pub fn redo_count(&self) -> usize {
        self.entries.len() - self.cursor - 1
    }
}

// ============================================================================
// HISTORY PANEL
// ============================================================================

#[derive(Default)]
pub struct HistoryPanel;

impl HistoryPanel {
    /// Draw the history list. Returns how many steps back the clicked entry
    /// is, for `EditorSession::revert`.
    pub fn show(&mut self, ui: &mut egui::Ui, history: &HistoryManager) -> Option<usize> {
        ui.label(format!("Undo: {} | Redo: {}", history.undo_count(), history.redo_count()));

        let mut revert_to: Option<usize> = None;
        egui::ScrollArea::vertical()
            .id_source("history_scroll")
            .max_height(160.0)
            .show(ui, |ui| {
                let items = history.undo_history();
                for (i, desc) in items.iter().enumerate() {
                    let text = if i == 0 {
                        egui::RichText::new(format!("▶ {}", desc)).strong().size(11.0)
                    } else {
                        egui::RichText::new(format!("  {}", desc)).weak().size(11.0)
                    };
                    let response = ui.add(egui::Label::new(text).sense(egui::Sense::click()));
                    if i > 0 && response.on_hover_text("Click to revert to this state").clicked() {
                        revert_to = Some(i);
                    }
                }
            });

        revert_to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Layer;

    fn one_layer(x: f32) -> LayerCollection {
        let mut layer = Layer::default_text();
        layer.x = x;
        vec![layer].into()
    }

    #[test]
    fn undo_and_redo_walk_the_cursor() {
        let mut history = HistoryManager::new(one_layer(0.0), 50);
        history.push("Move layer", &one_layer(1.0));
        history.push("Move layer", &one_layer(2.0));

        assert_eq!(history.undo().unwrap().get(0).unwrap().x, 1.0);
        assert_eq!(history.undo().unwrap().get(0).unwrap().x, 0.0);
        assert!(history.undo().is_none());
        assert_eq!(history.redo().unwrap().get(0).unwrap().x, 1.0);
        assert_eq!(history.redo().unwrap().get(0).unwrap().x, 2.0);
        assert!(history.redo().is_none());
    }

    #[test]
    fn push_after_undo_discards_redo_branch() {
        let mut history = HistoryManager::new(one_layer(0.0), 50);
        history.push("a", &one_layer(1.0));
        history.push("b", &one_layer(2.0));
        history.undo();
        history.push("c", &one_layer(3.0));

        assert!(!history.can_redo());
        assert!(history.redo().is_none());
        assert_eq!(history.len(), 3);
        assert_eq!(history.current().get(0).unwrap().x, 3.0);
    }

    #[test]
    fn oldest_entries_are_evicted_at_capacity() {
        let mut history = HistoryManager::new(one_layer(0.0), 50);
        for i in 1..=50 {
            history.push("Move layer", &one_layer(i as f32));
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.cursor(), 49);

        let mut oldest = None;
        while let Some(layers) = history.undo() {
            oldest = Some(layers);
        }
        // The opened state (x = 0) was evicted by the 50th push
        assert_eq!(oldest.unwrap().get(0).unwrap().x, 1.0);
    }

    #[test]
    fn returned_snapshots_are_independent() {
        let mut history = HistoryManager::new(one_layer(0.0), 50);
        history.push("Move layer", &one_layer(5.0));
        let mut restored = history.undo().unwrap();
        restored.clear();
        assert_eq!(history.current().len(), 1);
        assert_eq!(history.redo().unwrap().len(), 1);
    }

    #[test]
    fn descriptions_track_cursor() {
        let mut history = HistoryManager::new(LayerCollection::new(), 50);
        assert_eq!(history.undo_description(), None);
        history.push("Add text", &one_layer(0.0));
        assert_eq!(history.undo_description(), Some("Add text"));
        history.undo();
        assert_eq!(history.redo_description(), Some("Add text"));
        assert_eq!(history.undo_history(), vec!["Open"]);
    }
}
