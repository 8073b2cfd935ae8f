use crate::canvas::{LayerCollection, LayerId, MIN_LAYER_HEIGHT, MIN_LAYER_WIDTH};
use crate::ops::coords::{CoordinateMapper, HitRegion, PixelPoint};

// ============================================================================
// GESTURE TYPES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    Touch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    Drag,
    Resize,
}

impl GestureKind {
    /// History label for a completed gesture of this kind.
    pub fn description(&self) -> &'static str {
        match self {
            GestureKind::Drag => "Move layer",
            GestureKind::Resize => "Resize layer",
        }
    }
}

/// A gesture in progress. Holds everything move events need so nothing is
/// read from outside between press and release; the mapper is captured at
/// press time from the container's current bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveGesture {
    pub kind: GestureKind,
    pub layer_id: LayerId,
    pub source: PointerSource,
    pub start: PixelPoint,
    /// Position (drag) or size (resize) at press time, in percent.
    pub initial: (f32, f32),
    pub mapper: CoordinateMapper,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Dragging,
    Resizing,
}

/// Result of a pointer press.
#[derive(Clone, Debug, PartialEq)]
pub enum PressOutcome {
    /// A gesture started on this layer; it becomes the selection.
    Started { layer_id: LayerId, kind: GestureKind },
    /// The press hit empty canvas; selection should be cleared.
    Missed,
    /// Another gesture is already active.
    Ignored,
}

/// A finished gesture whose layer still exists.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedGesture {
    pub layer_id: LayerId,
    pub kind: GestureKind,
    pub moved: bool,
}

// ============================================================================
// INTERACTION ENGINE
// ============================================================================

/// Turns press → move* → release sequences into layer mutations.
///
/// At most one gesture is active. The engine never touches history; the
/// caller pushes one entry per `CompletedGesture`.
#[derive(Debug, Default)]
pub struct InteractionEngine {
    active: Option<ActiveGesture>,
    moved: bool,
}

impl InteractionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        match self.active.as_ref().map(|g| g.kind) {
            None => InteractionState::Idle,
            Some(GestureKind::Drag) => InteractionState::Dragging,
            Some(GestureKind::Resize) => InteractionState::Resizing,
        }
    }

    pub fn active(&self) -> Option<&ActiveGesture> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Pointer went down at `p` (in the mapper's coordinate space).
    pub fn press(
        &mut self,
        layers: &LayerCollection,
        selected: Option<&LayerId>,
        mapper: CoordinateMapper,
        p: PixelPoint,
        source: PointerSource,
    ) -> PressOutcome {
        if self.active.is_some() {
            return PressOutcome::Ignored;
        }
        let Some(hit) = mapper.hit_test(layers, selected, p) else {
            return PressOutcome::Missed;
        };
        let Some(layer) = layers.find(&hit.id) else {
            return PressOutcome::Missed;
        };

        let (kind, initial) = match hit.region {
            HitRegion::Body => (GestureKind::Drag, layer.position()),
            HitRegion::ResizeHandle => (GestureKind::Resize, layer.size()),
        };
        log::debug!("{:?} gesture start on {} ({:?})", kind, hit.id, source);

        self.active = Some(ActiveGesture {
            kind,
            layer_id: hit.id.clone(),
            source,
            start: p,
            initial,
            mapper,
        });
        self.moved = false;
        PressOutcome::Started { layer_id: hit.id, kind }
    }

    /// Apply a move event. Returns true when a layer changed.
    /// Moves for a layer that no longer exists are ignored.
    pub fn pointer_move(&mut self, layers: &mut LayerCollection, p: PixelPoint) -> bool {
        let Some(gesture) = self.active.as_ref() else {
            return false;
        };
        let Some(layer) = layers.find_mut(&gesture.layer_id) else {
            return false;
        };

        let (dx, dy) = gesture.mapper.delta_to_percent(p.x - gesture.start.x, p.y - gesture.start.y);
        let (ix, iy) = gesture.initial;
        match gesture.kind {
            GestureKind::Drag => {
                // Unclamped: layers may hang off-canvas
                layer.x = ix + dx;
                layer.y = iy + dy;
            }
            GestureKind::Resize => {
                layer.width = (ix + dx).max(MIN_LAYER_WIDTH);
                layer.height = (iy + dy).max(MIN_LAYER_HEIGHT);
            }
        }
        self.moved = true;
        true
    }

    /// Pointer went up. Ends the gesture; `None` when idle or when the
    /// gesture's layer was removed meanwhile.
    pub fn release(&mut self, layers: &LayerCollection) -> Option<CompletedGesture> {
        let gesture = self.active.take()?;
        let moved = std::mem::take(&mut self.moved);
        if !layers.contains(&gesture.layer_id) {
            log::debug!("gesture on removed layer {} dropped", gesture.layer_id);
            return None;
        }
        log::debug!("{:?} gesture finished on {}", gesture.kind, gesture.layer_id);
        Some(CompletedGesture { layer_id: gesture.layer_id, kind: gesture.kind, moved })
    }

    /// Abnormal end (pointer left the window, focus lost, touch cancelled).
    /// Keeps whatever the last move produced, exactly like a release.
    pub fn cancel(&mut self, layers: &LayerCollection) -> Option<CompletedGesture> {
        if self.active.is_some() {
            log::debug!("gesture cancelled");
        }
        self.release(layers)
    }
}
