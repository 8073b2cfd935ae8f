use eframe::egui;
use egui::{Color32, CursorIcon, Id, Pos2, Rect, Sense, Vec2};

use crate::canvas::LayerId;
use crate::editor::EditorSession;

/// State for drag-and-drop layer reordering
#[derive(Default)]
struct DragState {
    /// Display index currently being dragged (0 = topmost in UI).
    dragging_display_idx: Option<usize>,
    drag_offset_y: f32,
}

enum RowAction {
    Select(LayerId),
    Delete(LayerId),
    BeginDrag(usize),
}

/// Layer list, topmost layer first.
#[derive(Default)]
pub struct LayersPanel {
    drag_state: DragState,
}

impl LayersPanel {
    pub fn show(&mut self, ui: &mut egui::Ui, session: &mut EditorSession) {
        let layer_count = session.layers().len();
        if layer_count == 0 {
            self.drag_state = DragState::default();
            ui.weak("No layers. Add text or a button.");
            return;
        }

        let row_height = 26.0;
        let row_stride = row_height + 2.0;

        egui::ScrollArea::vertical()
            .id_source("layer_scroll")
            .max_height(220.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                let available_w = ui.available_width();
                let (total_rect, _) =
                    ui.allocate_exact_size(Vec2::new(available_w, layer_count as f32 * row_stride), Sense::hover());

                let pointer_down = ui.input(|i| i.pointer.primary_down());
                let drag_delta_y = ui.input(|i| i.pointer.delta().y);

                let target_for = |origin: usize, offset: f32| -> usize {
                    let center = origin as f32 * row_stride + row_stride * 0.5 + offset;
                    ((center / row_stride).floor().max(0.0) as usize).min(layer_count - 1)
                };

                let mut drop_target: Option<usize> = None;
                if let Some(drag_didx) = self.drag_state.dragging_display_idx {
                    if pointer_down {
                        self.drag_state.drag_offset_y += drag_delta_y;
                        drop_target = Some(target_for(drag_didx, self.drag_state.drag_offset_y));
                        ui.ctx().set_cursor_icon(CursorIcon::Grabbing);
                        ui.ctx().request_repaint();
                    } else {
                        let target = target_for(drag_didx, self.drag_state.drag_offset_y);
                        if target != drag_didx && drag_didx < layer_count {
                            // Display order is reversed paint order
                            let from = layer_count - 1 - drag_didx;
                            let to = layer_count - 1 - target;
                            session.reorder(from, to);
                        }
                        self.drag_state = DragState::default();
                    }
                }

                let is_dragging = self.drag_state.dragging_display_idx.is_some();
                let selection_color = ui.visuals().selection.bg_fill;
                let text_color = ui.visuals().text_color();
                let mut action: Option<RowAction> = None;

                let rows: Vec<(usize, LayerId, String, bool)> = session
                    .layers()
                    .display_order()
                    .enumerate()
                    .map(|(display_idx, (_, layer))| {
                        (display_idx, layer.id.clone(), layer.label(), session.selected() == Some(&layer.id))
                    })
                    .collect();

                for (display_idx, id, label, is_selected) in rows {
                    let is_dragged = self.drag_state.dragging_display_idx == Some(display_idx);
                    let mut y = total_rect.top() + display_idx as f32 * row_stride;
                    if is_dragged {
                        y += self.drag_state.drag_offset_y;
                    }
                    let row_rect = Rect::from_min_size(Pos2::new(total_rect.left(), y), Vec2::new(available_w, row_height));

                    let row_response = ui.interact(row_rect, Id::new("layer_row").with(display_idx), Sense::click_and_drag());
                    if !is_dragging && row_response.drag_started() {
                        action = Some(RowAction::BeginDrag(display_idx));
                    } else if row_response.clicked() {
                        action = Some(RowAction::Select(id.clone()));
                    }
                    if !is_dragging && row_response.hovered() {
                        ui.ctx().set_cursor_icon(CursorIcon::Grab);
                    }

                    let painter = if is_dragged {
                        ui.painter().clone().with_layer_id(egui::LayerId::new(egui::Order::Tooltip, Id::new("layer_drag")))
                    } else {
                        ui.painter().clone()
                    };
                    let bg = if is_selected {
                        selection_color
                    } else if row_response.hovered() || is_dragged {
                        ui.visuals().widgets.hovered.bg_fill
                    } else {
                        Color32::TRANSPARENT
                    };
                    painter.rect_filled(row_rect, 4.0, bg);
                    if is_dragged {
                        painter.rect_stroke(row_rect, 4.0, egui::Stroke::new(1.5, selection_color));
                    }
                    painter.text(
                        Pos2::new(row_rect.left() + 8.0, row_rect.center().y),
                        egui::Align2::LEFT_CENTER,
                        label,
                        egui::FontId::proportional(13.0),
                        text_color,
                    );

                    // Delete button on the right edge of the row
                    let del_rect = Rect::from_center_size(
                        Pos2::new(row_rect.right() - 14.0, row_rect.center().y),
                        Vec2::splat(18.0),
                    );
                    if !is_dragging {
                        let del = ui.put(del_rect, egui::Button::new("✕").small().frame(false));
                        if del.on_hover_text("Delete layer").clicked() {
                            action = Some(RowAction::Delete(id.clone()));
                        }
                    }
                }

                if let Some(target) = drop_target {
                    let indicator_y = total_rect.top() + target as f32 * row_stride + row_stride * 0.5;
                    ui.painter().line_segment(
                        [
                            Pos2::new(total_rect.left() + 4.0, indicator_y),
                            Pos2::new(total_rect.right() - 4.0, indicator_y),
                        ],
                        egui::Stroke::new(2.0, selection_color),
                    );
                }

                match action {
                    Some(RowAction::Select(id)) => session.select(Some(&id)),
                    Some(RowAction::Delete(id)) => {
                        session.delete_layer(&id);
                    }
                    Some(RowAction::BeginDrag(display_idx)) => {
                        self.drag_state.dragging_display_idx = Some(display_idx);
                        self.drag_state.drag_offset_y = 0.0;
                    }
                    None => {}
                }
            });
    }
}
