use eframe::egui;

use crate::editor::EditorSession;
use crate::templates::{ApplyMode, TemplateStore};

/// Saved layouts for the current aspect ratio, plus "save as template".
#[derive(Default)]
pub struct TemplatesPanel {
    name_input: String,
    show_all_aspects: bool,
    mode: ApplyMode,
    /// Last save/delete failure, shown until the next attempt.
    pub last_error: Option<String>,
}

impl TemplatesPanel {
    pub fn show(&mut self, ui: &mut egui::Ui, session: &mut EditorSession, store: &mut TemplateStore) {
        // -- Save --------------------------------------------------------
        ui.horizontal(|ui| {
            let input = ui.add(
                egui::TextEdit::singleline(&mut self.name_input)
                    .hint_text("Template name")
                    .desired_width(140.0),
            );
            let enter = input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let can_save = !self.name_input.trim().is_empty() && !session.layers().is_empty();
            let clicked = ui.add_enabled(can_save, egui::Button::new("Save")).clicked();
            if clicked || (enter && can_save) {
                match session.save_as_template(store, &self.name_input) {
                    Ok(_) => {
                        self.name_input.clear();
                        self.last_error = None;
                    }
                    Err(e) => {
                        log::error!("Template save failed: {}", e);
                        self.last_error = Some(e.to_string());
                    }
                }
            }
        });

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.mode, ApplyMode::Replace, "Replace");
            ui.selectable_value(&mut self.mode, ApplyMode::Append, "Append");
            ui.checkbox(&mut self.show_all_aspects, "All ratios");
        });

        if let Some(err) = &self.last_error {
            ui.colored_label(ui.visuals().error_fg_color, err);
        }
        ui.separator();

        // -- List --------------------------------------------------------
        let aspect = session.aspect_ratio();
        let rows: Vec<(String, String, String, usize)> = store
            .templates()
            .iter()
            .filter(|t| self.show_all_aspects || t.aspect_ratio == aspect)
            .map(|t| (t.id.clone(), t.name.clone(), t.aspect_ratio.label().to_string(), t.layers.len()))
            .collect();

        if rows.is_empty() {
            ui.weak(format!("No templates for {}.", aspect.label()));
            return;
        }

        let mut apply: Option<String> = None;
        let mut delete: Option<String> = None;
        egui::ScrollArea::vertical().id_source("template_scroll").max_height(180.0).show(ui, |ui| {
            for (id, name, ratio, count) in &rows {
                ui.horizontal(|ui| {
                    let label = format!("{} · {} · {} layer(s)", name, ratio, count);
                    if ui.button(label).on_hover_text("Apply template").clicked() {
                        apply = Some(id.clone());
                    }
                    if ui.small_button("✕").on_hover_text("Delete template").clicked() {
                        delete = Some(id.clone());
                    }
                });
            }
        });

        if let Some(id) = apply {
            if let Some(template) = store.find(&id).cloned() {
                session.apply_template(&template, self.mode);
            }
        }
        if let Some(id) = delete {
            if let Err(e) = store.delete(&id) {
                log::error!("Template delete failed: {}", e);
                self.last_error = Some(e.to_string());
            }
        }
    }
}
