use eframe::egui;
use egui::Color32;

use crate::canvas::{Color, FontFamily, Layer};
use crate::editor::EditorSession;

pub const FONT_SIZE_RANGE: std::ops::RangeInclusive<f32> = 5.0..=150.0;

pub fn to_color32(c: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

pub fn from_color32(c: Color32) -> Color {
    let [r, g, b, a] = c.to_srgba_unmultiplied();
    Color::rgba(r, g, b, a)
}

/// Properties of the selected layer.
///
/// Widgets edit a copy of the layer; whenever the copy differs the change is
/// previewed on the session, and the edit is committed once the widget lets
/// go (slider released, text field unfocused, picker closed).
#[derive(Default)]
pub struct PropertiesPanel;

impl PropertiesPanel {
    pub fn show(&mut self, ui: &mut egui::Ui, session: &mut EditorSession) {
        let Some(layer) = session.selected_layer().cloned() else {
            ui.weak("Select a layer to edit its properties.");
            return;
        };
        let id = layer.id.clone();
        let mut edit = layer.clone();
        let mut changed: Option<&'static str> = None;
        let mut released = false;

        egui::Grid::new("layer_properties").num_columns(2).spacing([8.0, 6.0]).show(ui, |ui| {
            ui.label("Text");
            let r = ui.add(egui::TextEdit::multiline(&mut edit.content).desired_rows(2).desired_width(180.0));
            if r.changed() {
                changed = Some("Edit text");
            }
            released |= r.lost_focus();
            ui.end_row();

            ui.label("Font size");
            let r = ui.add(egui::Slider::new(&mut edit.font_size, FONT_SIZE_RANGE).step_by(1.0));
            if r.changed() {
                changed = Some("Font size");
            }
            released |= r.drag_released() || (r.changed() && !r.dragged());
            ui.end_row();

            ui.label("Font");
            egui::ComboBox::from_id_source("font_family")
                .selected_text(edit.font_family.family_name())
                .show_ui(ui, |ui| {
                    for family in FontFamily::all() {
                        ui.selectable_value(&mut edit.font_family, *family, family.family_name());
                    }
                });
            if edit.font_family != layer.font_family {
                changed = Some("Font");
                released = true;
            }
            ui.end_row();

            ui.label("Text color");
            let mut c = to_color32(edit.color);
            if ui.color_edit_button_srgba(&mut c).changed() {
                edit.color = from_color32(c);
                changed = Some("Text color");
            }
            ui.end_row();

            if edit.is_button() {
                ui.label("Background");
                let mut c = to_color32(edit.background().unwrap_or(Color::BLACK));
                if ui.color_edit_button_srgba(&mut c).changed() {
                    edit.background_color = Some(from_color32(c));
                    changed = Some("Background color");
                }
                ui.end_row();

                ui.label("Corner radius");
                let mut radius = edit.radius();
                let r = ui.add(egui::Slider::new(&mut radius, 0.0..=100.0).step_by(1.0));
                if r.changed() {
                    edit.border_radius = Some(radius);
                    changed = Some("Corner radius");
                }
                released |= r.drag_released() || (r.changed() && !r.dragged());
                ui.end_row();
            }

            ui.label("Opacity");
            let r = ui.add(egui::Slider::new(&mut edit.opacity, 0.0..=100.0).step_by(1.0).suffix("%"));
            if r.changed() {
                changed = Some("Opacity");
            }
            released |= r.drag_released() || (r.changed() && !r.dragged());
            ui.end_row();

            ui.label("Geometry");
            ui.weak(format!(
                "x {:.1}%  y {:.1}%  w {:.1}%  h {:.1}%",
                edit.x, edit.y, edit.width, edit.height
            ));
            ui.end_row();
        });

        if let Some(description) = changed {
            session.preview_edit(&id, description, |l: &mut Layer| *l = edit);
        }

        // Color pickers have no release event; commit once nothing is held
        let idle = !ui.input(|i| i.pointer.any_down()) && ui.memory(|m| m.focus().is_none());
        if session.has_pending_edit() && (released || idle) {
            session.commit_edit();
        }

        ui.add_space(6.0);
        if ui.button("🗑 Delete layer").clicked() {
            session.delete_layer(&id);
        }
    }
}
