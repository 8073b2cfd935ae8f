//! One open editing session over a creative's layers.
//!
//! `EditorSession` owns the working `LayerCollection`, its history, the
//! selection and the interaction engine. Every discrete user action is one
//! method here and pushes exactly one history entry; continuous input
//! (pointer moves, slider drags) mutates the working copy without history
//! until the action completes.

use crate::canvas::{AspectRatio, Layer, LayerCollection, LayerId};
use crate::components::history::HistoryManager;
use crate::error::TemplateError;
use crate::ops::coords::{CoordinateMapper, PixelPoint};
use crate::ops::interaction::{CompletedGesture, InteractionEngine, PointerSource, PressOutcome};
use crate::project::Creative;
use crate::templates::{ApplyMode, Template, TemplateStore};

pub struct EditorSession {
    creative_id: String,
    aspect_ratio: AspectRatio,
    layers: LayerCollection,
    history: HistoryManager,
    selected: Option<LayerId>,
    interaction: InteractionEngine,
    /// Label of a property edit being previewed but not yet committed.
    pending_edit: Option<String>,
    dirty: bool,
}

impl EditorSession {
    /// Start editing a copy of `creative`'s layers.
    pub fn open(creative: &Creative, max_history: usize) -> Self {
        log::info!("Editing creative {} ({} layers)", creative.id, creative.layers.len());
        Self {
            creative_id: creative.id.clone(),
            aspect_ratio: creative.aspect_ratio,
            layers: creative.layers.clone(),
            history: HistoryManager::new(creative.layers.clone(), max_history),
            selected: None,
            interaction: InteractionEngine::new(),
            pending_edit: None,
            dirty: false,
        }
    }

    pub fn creative_id(&self) -> &str {
        &self.creative_id
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn layers(&self) -> &LayerCollection {
        &self.layers
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn interaction(&self) -> &InteractionEngine {
        &self.interaction
    }

    pub fn gesture_active(&self) -> bool {
        self.interaction.is_active()
    }

    /// True once anything was committed since opening or the last apply.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn selected(&self) -> Option<&LayerId> {
        self.selected.as_ref()
    }

    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selected.as_ref().and_then(|id| self.layers.find(id))
    }

    /// Select a layer by id, or clear the selection. Unknown ids clear it.
    pub fn select(&mut self, id: Option<&LayerId>) {
        self.commit_edit();
        self.selected = id.filter(|id| self.layers.contains(id)).cloned();
    }

    // ------------------------------------------------------------------
    // Pointer gestures
    // ------------------------------------------------------------------

    /// `mapper` must describe the container's bounds at this moment.
    pub fn pointer_pressed(&mut self, mapper: CoordinateMapper, p: PixelPoint, source: PointerSource) -> PressOutcome {
        if !self.interaction.is_active() {
            self.commit_edit();
        }
        let outcome = self.interaction.press(&self.layers, self.selected.as_ref(), mapper, p, source);
        match &outcome {
            PressOutcome::Started { layer_id, .. } => self.selected = Some(layer_id.clone()),
            PressOutcome::Missed => self.selected = None,
            PressOutcome::Ignored => {}
        }
        outcome
    }

    pub fn pointer_moved(&mut self, p: PixelPoint) -> bool {
        self.interaction.pointer_move(&mut self.layers, p)
    }

    pub fn pointer_released(&mut self) -> Option<CompletedGesture> {
        let done = self.interaction.release(&self.layers)?;
        self.record(done.kind.description());
        Some(done)
    }

    /// The pointer left the window or input was lost mid-gesture.
    pub fn pointer_cancelled(&mut self) -> Option<CompletedGesture> {
        let done = self.interaction.cancel(&self.layers)?;
        self.record(done.kind.description());
        Some(done)
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    pub fn add_text_layer(&mut self) -> LayerId {
        self.add_layer(Layer::default_text(), "Add text")
    }

    pub fn add_button_layer(&mut self) -> LayerId {
        self.add_layer(Layer::default_button(), "Add button")
    }

    /// Append `layer` on top and select it.
    pub fn add_layer(&mut self, layer: Layer, description: &str) -> LayerId {
        self.settle();
        let id = layer.id.clone();
        self.layers.push(layer);
        self.selected = Some(id.clone());
        self.record(description);
        id
    }

    pub fn delete_layer(&mut self, id: &LayerId) -> bool {
        self.commit_edit();
        if self.layers.remove(id).is_none() {
            return false;
        }
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        self.record("Delete layer");
        true
    }

    pub fn delete_selected(&mut self) -> bool {
        match self.selected.clone() {
            Some(id) => self.delete_layer(&id),
            None => false,
        }
    }

    /// Move the layer at paint index `from` to paint index `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        self.settle();
        if !self.layers.move_layer(from, to) {
            return false;
        }
        self.record("Reorder layers");
        true
    }

    // ------------------------------------------------------------------
    // Property edits
    // ------------------------------------------------------------------

    /// Change a layer live without recording history. Consecutive previews
    /// collapse into one entry on `commit_edit`.
    pub fn preview_edit(&mut self, id: &LayerId, description: &str, edit: impl FnOnce(&mut Layer)) -> bool {
        if !self.layers.contains(id) {
            return false;
        }
        // A different property closes the previous edit before this one lands
        if self.pending_edit.as_deref() != Some(description) {
            self.commit_edit();
        }
        let Some(layer) = self.layers.find_mut(id) else {
            return false;
        };
        let before = layer.clone();
        edit(layer);
        if *layer == before {
            return false;
        }
        if self.pending_edit.is_none() {
            self.pending_edit = Some(description.to_string());
        }
        true
    }

    /// Record the pending property edit, if any.
    pub fn commit_edit(&mut self) -> bool {
        match self.pending_edit.take() {
            Some(description) => {
                self.record(&description);
                true
            }
            None => false,
        }
    }

    /// A one-shot property edit: applied and recorded immediately.
    pub fn edit_layer(&mut self, id: &LayerId, description: &str, edit: impl FnOnce(&mut Layer)) -> bool {
        let changed = self.preview_edit(id, description, edit);
        self.commit_edit();
        changed
    }

    pub fn has_pending_edit(&self) -> bool {
        self.pending_edit.is_some()
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.settle();
        match self.history.undo() {
            Some(layers) => {
                self.restore(layers);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.settle();
        match self.history.redo() {
            Some(layers) => {
                self.restore(layers);
                true
            }
            None => false,
        }
    }

    /// Jump back `steps` entries from the current one, as listed by the
    /// history panel. Work in flight is recorded first and stays reachable
    /// through redo.
    pub fn revert(&mut self, steps: usize) -> bool {
        if steps == 0 {
            return false;
        }
        let recorded = self.settle();
        match self.history.undo_to(steps + recorded) {
            Some(layers) => {
                self.restore(layers);
                true
            }
            None => false,
        }
    }

    /// Replace the working collection with a restored snapshot.
    fn restore(&mut self, layers: LayerCollection) {
        self.layers = layers;
        if let Some(id) = &self.selected {
            if !self.layers.contains(id) {
                self.selected = None;
            }
        }
        self.dirty = true;
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// Bring `template`'s layers in with fresh ids. Returns the new ids.
    pub fn apply_template(&mut self, template: &Template, mode: ApplyMode) -> Vec<LayerId> {
        self.settle();
        let incoming = template.instantiate();
        let ids: Vec<LayerId> = incoming.iter().map(|l| l.id.clone()).collect();
        match mode {
            ApplyMode::Replace => {
                self.layers = incoming;
                self.selected = None;
            }
            ApplyMode::Append => self.layers.extend(incoming),
        }
        log::info!("Applied template '{}' ({:?}, {} layers)", template.name, mode, ids.len());
        self.record(&format!("Apply template {}", template.name));
        ids
    }

    /// Save the working layers as a template. Does not touch history.
    pub fn save_as_template(&mut self, store: &mut TemplateStore, name: &str) -> Result<Option<Template>, TemplateError> {
        self.commit_edit();
        store.save(name, &self.layers, self.aspect_ratio)
    }

    // ------------------------------------------------------------------
    // Hand-off
    // ------------------------------------------------------------------

    /// Write the working layers into `creative`. Only the layers change.
    pub fn apply_to(&mut self, creative: &mut Creative) {
        self.settle();
        creative.layers = self.layers.clone();
        self.dirty = false;
        log::info!("Applied {} layers to creative {}", self.layers.len(), creative.id);
    }

    /// Close the session and hand back the working layers.
    pub fn finish(mut self) -> LayerCollection {
        self.settle();
        log::info!("Closed editor for {}", self.creative_id);
        self.layers
    }

    /// End anything in flight: an active gesture is committed like a release
    /// and a pending property edit is recorded. Returns the number of
    /// history entries this added.
    fn settle(&mut self) -> usize {
        let mut recorded = 0;
        if self.interaction.is_active() && self.pointer_cancelled().is_some() {
            recorded += 1;
        }
        if self.commit_edit() {
            recorded += 1;
        }
        recorded
    }

    fn record(&mut self, description: &str) {
        self.history.push(description, &self.layers);
        self.dirty = true;
    }
}
