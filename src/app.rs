use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, Stroke, Vec2};
use image::RgbaImage;

use crate::canvas::{FontFamily, Layer, LayerId};
use crate::components::history::HistoryPanel;
use crate::components::layers::LayersPanel;
use crate::components::properties::{PropertiesPanel, to_color32};
use crate::components::templates::TemplatesPanel;
use crate::editor::EditorSession;
use crate::io::{export_png, load_base_image, load_creative, save_creative};
use crate::ops::coords::{CoordinateMapper, PixelPoint, PixelRect};
use crate::ops::fonts::FontBook;
use crate::ops::interaction::PointerSource;
use crate::ops::preview::{PreviewItem, build_preview};
use crate::ops::raster::render_tile;
use crate::project::CreativeDocument;
use crate::settings::EditorSettings;
use crate::templates::TemplateStore;

// ============================================================================
// ASYNC IO: background work with channel completion
// ============================================================================

/// Result delivered from a background IO job.
pub enum IoResult {
    ImageLoaded { generation: u64, image: RgbaImage },
    ImageFailed { generation: u64, error: String },
    ExportComplete(PathBuf),
    ExportFailed(String),
}

fn rect_of(r: PixelRect) -> Rect {
    Rect::from_min_max(Pos2::new(r.min.x, r.min.y), Pos2::new(r.max.x, r.max.y))
}

/// Largest rect of `ratio` (width / height) centered in `avail`.
fn fit_rect(avail: Rect, ratio: f32) -> Rect {
    if avail.width() <= 0.0 || avail.height() <= 0.0 || ratio <= 0.0 {
        return Rect::from_min_size(avail.min, Vec2::ZERO);
    }
    let size = if avail.width() / avail.height() > ratio {
        Vec2::new(avail.height() * ratio, avail.height())
    } else {
        Vec2::new(avail.width(), avail.width() / ratio)
    };
    Rect::from_center_size(avail.center(), size)
}

/// Bitmap of a translucent layer, keyed by everything it was drawn from.
struct PreviewTile {
    layer: Layer,
    mapper: CoordinateMapper,
    pixels_per_point: f32,
    image: TileImage,
}

enum TileImage {
    Texture(egui::TextureHandle, Rect),
    /// Entirely outside the container.
    Empty,
    /// The rasterizer could not draw it (no font); painted per element.
    Unavailable,
}

pub struct EditorApp {
    settings: EditorSettings,
    fonts: FontBook,
    /// Families registered with egui under `FontFamily::Name`.
    ui_fonts: HashSet<FontFamily>,
    store: TemplateStore,

    document: Option<CreativeDocument>,
    session: Option<EditorSession>,
    texture: Option<egui::TextureHandle>,
    /// Translucent layers are previewed from rasterized tiles so text and
    /// background fade as one group, as in the export.
    tiles: HashMap<LayerId, PreviewTile>,
    /// Bumped per opened document so late image loads for a closed one are dropped.
    generation: u64,

    layers_panel: LayersPanel,
    properties_panel: PropertiesPanel,
    templates_panel: TemplatesPanel,
    history_panel: HistoryPanel,

    io_sender: mpsc::Sender<IoResult>,
    io_receiver: mpsc::Receiver<IoResult>,
    pending_io_ops: usize,
    status: Option<String>,

    pending_close: bool,
    pending_exit: bool,
    force_exit: bool,
}

impl EditorApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: EditorSettings, initial: Option<PathBuf>) -> Self {
        let fonts = FontBook::from_settings(&settings);

        // -- Font configuration ------------------------------------------------
        // Each layer family gets its own egui family; egui's defaults follow
        // as glyph fallback.
        let mut ui_fonts = HashSet::new();
        {
            let mut defs = egui::FontDefinitions::default();
            let fallback = defs.families.get(&egui::FontFamily::Proportional).cloned().unwrap_or_default();
            for family in FontFamily::all() {
                let Some(bytes) = fonts.font_bytes(*family) else {
                    continue;
                };
                let key = family.file_key();
                defs.font_data.insert(key.clone(), egui::FontData::from_owned(bytes.as_ref().clone()));
                let mut chain = vec![key];
                chain.extend(fallback.iter().cloned());
                defs.families.insert(egui::FontFamily::Name(family.family_name().into()), chain);
                ui_fonts.insert(*family);
            }
            cc.egui_ctx.set_fonts(defs);
        }
        log::info!("Registered {} of {} layer fonts with the UI", ui_fonts.len(), FontFamily::all().len());

        let store = TemplateStore::open_file(settings.template_store_path());
        let (io_sender, io_receiver) = mpsc::channel();

        let mut app = Self {
            settings,
            fonts,
            ui_fonts,
            store,
            document: None,
            session: None,
            texture: None,
            tiles: HashMap::new(),
            generation: 0,
            layers_panel: LayersPanel::default(),
            properties_panel: PropertiesPanel,
            templates_panel: TemplatesPanel::default(),
            history_panel: HistoryPanel,
            io_sender,
            io_receiver,
            pending_io_ops: 0,
            status: None,
            pending_close: false,
            pending_exit: false,
            force_exit: false,
        };
        if let Some(path) = initial {
            app.open_creative(&path);
        }
        app
    }

    // ------------------------------------------------------------------
    // Document lifecycle
    // ------------------------------------------------------------------

    fn open_creative(&mut self, path: &Path) {
        let creative = match load_creative(path) {
            Ok(c) => c,
            Err(e) => {
                log::error!("Open failed: {}", e);
                self.status = Some(format!("Could not open {}: {}", path.display(), e));
                return;
            }
        };
        let document = CreativeDocument::new(creative, Some(path.to_path_buf()));
        self.session = Some(EditorSession::open(&document.creative, self.settings.max_undo_steps));
        self.texture = None;
        self.generation += 1;

        // Decode off the UI thread
        let generation = self.generation;
        let creative = document.creative.clone();
        let base_dir = document.base_dir();
        let sender = self.io_sender.clone();
        self.pending_io_ops += 1;
        rayon::spawn(move || {
            let result = match load_base_image(&creative, base_dir.as_deref()) {
                Ok(image) => IoResult::ImageLoaded { generation, image },
                Err(e) => IoResult::ImageFailed { generation, error: e.to_string() },
            };
            let _ = sender.send(result);
        });

        self.status = Some(format!("Opened {}", document.name));
        self.document = Some(document);
    }

    fn pick_and_open(&mut self) {
        if let Some(path) = rfd::FileDialog::new().add_filter("Creative", &["json"]).pick_file() {
            self.open_creative(&path);
        }
    }

    /// Write the working layers back to the creative document.
    fn apply(&mut self) {
        let (Some(session), Some(doc)) = (self.session.as_mut(), self.document.as_mut()) else {
            return;
        };
        session.apply_to(&mut doc.creative);
        // Dirty until the file is written
        doc.mark_dirty();
        let path = match doc.path.clone() {
            Some(p) => p,
            None => match rfd::FileDialog::new().add_filter("Creative", &["json"]).save_file() {
                Some(p) => p,
                None => return,
            },
        };
        match save_creative(&doc.creative, &path) {
            Ok(()) => {
                doc.path = Some(path);
                doc.mark_clean();
                self.status = Some(format!("Saved {} layer(s)", doc.creative.layers.len()));
            }
            Err(e) => {
                log::error!("Apply failed: {}", e);
                doc.mark_dirty();
                self.status = Some(format!("Save failed: {}", e));
            }
        }
    }

    /// Drop the working copy without saving.
    fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.finish();
        }
        self.document = None;
        self.texture = None;
        self.tiles.clear();
        self.generation += 1;
        self.pending_close = false;
        self.status = None;
    }

    fn is_dirty(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_dirty()) || self.document.as_ref().is_some_and(|d| d.is_dirty)
    }

    fn start_export(&mut self) {
        let (Some(session), Some(doc)) = (self.session.as_mut(), self.document.as_ref()) else {
            return;
        };
        session.commit_edit();
        let mut creative = doc.creative.clone();
        creative.layers = session.layers().clone();

        let mut dialog = rfd::FileDialog::new().add_filter("PNG", &["png"]).set_file_name(creative.export_file_name());
        if let Some(dir) = self.settings.export_directory.clone().or_else(|| doc.base_dir()) {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };

        let base_dir = doc.base_dir();
        let fonts = self.fonts.clone();
        let sender = self.io_sender.clone();
        self.pending_io_ops += 1;
        self.status = Some("Exporting…".to_string());
        rayon::spawn(move || {
            let result = match export_png(&creative, base_dir.as_deref(), &fonts, &path) {
                Ok(()) => IoResult::ExportComplete(path),
                Err(e) => {
                    log::error!("Export failed: {}", e);
                    IoResult::ExportFailed(e.to_string())
                }
            };
            let _ = sender.send(result);
        });
    }

    fn poll_io(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.io_receiver.try_recv() {
            self.pending_io_ops = self.pending_io_ops.saturating_sub(1);
            match result {
                IoResult::ImageLoaded { generation, image } if generation == self.generation => {
                    let size = [image.width() as usize, image.height() as usize];
                    let color = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
                    self.texture = Some(ctx.load_texture("base_image", color, egui::TextureOptions::LINEAR));
                }
                IoResult::ImageFailed { generation, error } if generation == self.generation => {
                    log::error!("Base image unavailable: {}", error);
                    self.status = Some(format!("Base image unavailable: {}", error));
                }
                IoResult::ImageLoaded { .. } | IoResult::ImageFailed { .. } => {}
                IoResult::ExportComplete(path) => {
                    self.status = Some(format!("Exported {}", path.display()));
                    self.remember_export_dir(&path);
                }
                IoResult::ExportFailed(error) => {
                    self.status = Some(format!("Export failed: {}", error));
                }
            }
            ctx.request_repaint();
        }
    }

    /// The next export dialog opens where the last export went.
    fn remember_export_dir(&mut self, exported: &Path) {
        let Some(dir) = exported.parent().map(Path::to_path_buf) else {
            return;
        };
        if self.settings.export_directory.as_ref() == Some(&dir) {
            return;
        }
        self.settings.export_directory = Some(dir);
        if let Err(e) = self.settings.save() {
            log::warn!("Could not save settings: {}", e);
        }
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        // Text fields keep their own undo and delete
        if ctx.memory(|m| m.focus().is_some()) {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let (undo, redo, delete) = ctx.input(|i| {
            let m = i.modifiers;
            let z = i.key_pressed(egui::Key::Z);
            (
                m.command && !m.shift && z,
                (m.command && m.shift && z) || (m.command && i.key_pressed(egui::Key::Y)),
                i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
            )
        });
        if undo {
            session.undo();
        } else if redo {
            session.redo();
        } else if delete {
            session.delete_selected();
        }
    }

    /// Route raw pointer input to the session. A gesture lives from the
    /// press to the release, or until the pointer is lost.
    fn handle_pointer(&mut self, ctx: &egui::Context, mapper: CoordinateMapper, canvas: &egui::Response, container: Rect) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let (pressed, down, pos, touching, has_pointer) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_down(),
                i.pointer.interact_pos(),
                i.any_touches(),
                i.pointer.has_pointer(),
            )
        });
        let source = if touching { PointerSource::Touch } else { PointerSource::Mouse };

        if session.gesture_active() {
            if !has_pointer {
                session.pointer_cancelled();
            } else if down {
                if let Some(p) = pos {
                    if session.pointer_moved(PixelPoint::new(p.x, p.y)) {
                        ctx.request_repaint();
                    }
                }
            } else {
                session.pointer_released();
            }
            return;
        }

        if pressed && canvas.hovered() {
            match pos {
                Some(p) if container.contains(p) => {
                    session.pointer_pressed(mapper, PixelPoint::new(p.x, p.y), source);
                }
                _ => session.select(None),
            }
        }
    }

    // ------------------------------------------------------------------
    // Painting
    // ------------------------------------------------------------------

    fn font_id(&self, item: &PreviewItem) -> egui::FontId {
        let family = if self.ui_fonts.contains(&item.font_family) {
            egui::FontFamily::Name(item.font_family.family_name().into())
        } else {
            egui::FontFamily::Proportional
        };
        egui::FontId::new(item.plan.font_px.max(1.0), family)
    }

    /// Paint a layer's background and text with egui primitives. Only used
    /// for opaque layers and as a fallback, since the two parts are faded
    /// separately.
    fn paint_elements(&self, painter: &egui::Painter, item: &PreviewItem) {
        let plan = &item.plan;
        if plan.alpha <= 0.0 {
            return;
        }
        let rect = rect_of(plan.rect);
        if let Some((bg, radius)) = plan.background {
            painter.rect_filled(rect, radius, to_color32(bg).gamma_multiply(plan.alpha));
        }

        if plan.has_text() {
            let mut job = egui::text::LayoutJob::simple(
                plan.text.clone(),
                self.font_id(item),
                to_color32(item.color).gamma_multiply(plan.alpha),
                plan.text_width.max(1.0),
            );
            job.halign = egui::Align::Center;
            let galley = painter.fonts(|f| f.layout_job(job));
            let pos = rect.center() - galley.rect.center().to_vec2();
            painter.galley(pos, galley);
        }
    }

    /// Paint a translucent layer from its rasterized tile. Returns false when
    /// no tile could be drawn and the caller should paint elements instead.
    fn paint_tile(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        layer: &Layer,
        mapper: &CoordinateMapper,
    ) -> bool {
        let pixels_per_point = ctx.pixels_per_point();
        let fresh = self.tiles.get(&layer.id).is_some_and(|t| {
            t.layer == *layer && t.mapper == *mapper && t.pixels_per_point == pixels_per_point
        });
        if !fresh {
            let image = match render_tile(layer, mapper, &self.fonts, pixels_per_point) {
                Ok(Some(tile)) => {
                    let size = [tile.image.width() as usize, tile.image.height() as usize];
                    let color = egui::ColorImage::from_rgba_unmultiplied(size, tile.image.as_raw());
                    let texture = ctx.load_texture(format!("layer_{}", layer.id), color, egui::TextureOptions::LINEAR);
                    TileImage::Texture(texture, rect_of(tile.rect))
                }
                Ok(None) => TileImage::Empty,
                Err(e) => {
                    log::debug!("Preview tile for layer {} unavailable: {}", layer.id, e);
                    TileImage::Unavailable
                }
            };
            let tile = PreviewTile { layer: layer.clone(), mapper: *mapper, pixels_per_point, image };
            self.tiles.insert(layer.id.clone(), tile);
        }

        match self.tiles.get(&layer.id).map(|t| &t.image) {
            Some(TileImage::Texture(texture, rect)) => {
                let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                painter.image(texture.id(), *rect, uv, Color32::WHITE.gamma_multiply(layer.alpha()));
                true
            }
            Some(TileImage::Empty) => true,
            Some(TileImage::Unavailable) | None => false,
        }
    }

    fn paint_selection(&self, painter: &egui::Painter, item: &PreviewItem, accent: Color32) {
        if item.selected {
            painter.rect_stroke(rect_of(item.plan.rect), 0.0, Stroke::new(1.5, accent));
        }
        if let Some(handle) = item.handle {
            let handle = rect_of(handle);
            painter.rect_filled(handle, 2.0, Color32::WHITE);
            painter.rect_stroke(handle, 2.0, Stroke::new(1.0, accent));
        }
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let Some(aspect) = self.session.as_ref().map(|s| s.aspect_ratio()) else {
            ui.centered_and_justified(|ui| {
                if ui.button("Open creative…").clicked() {
                    self.pick_and_open();
                }
            });
            return;
        };

        let avail = ui.available_rect_before_wrap();
        let canvas = ui.allocate_rect(avail, Sense::click_and_drag());
        let ratio = match &self.texture {
            Some(tex) => {
                let [w, h] = tex.size();
                if h > 0 { w as f32 / h as f32 } else { aspect.ratio() }
            }
            None => aspect.ratio(),
        };
        let container = fit_rect(avail.shrink(16.0), ratio);

        // Rebuilt every frame from the container's current box
        let mapper = CoordinateMapper::new(PixelPoint::new(container.min.x, container.min.y), container.width(), container.height());
        self.handle_pointer(ctx, mapper, &canvas, container);

        let painter = ui.painter_at(container);
        match &self.texture {
            Some(tex) => {
                let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                painter.image(tex.id(), container, uv, Color32::WHITE);
            }
            None => {
                painter.rect_filled(container, 0.0, Color32::from_gray(40));
            }
        }

        let Some(session) = self.session.as_ref() else {
            return;
        };
        let layers = session.layers().clone();
        let items = build_preview(&layers, &mapper, session.selected());
        let accent = ui.visuals().selection.stroke.color;
        for (layer, item) in layers.iter().zip(&items) {
            let translucent = item.plan.alpha > 0.0 && item.plan.alpha < 1.0;
            if !(translucent && self.paint_tile(ctx, &painter, layer, &mapper)) {
                self.paint_elements(&painter, item);
            }
            self.paint_selection(&painter, item, accent);
        }
        self.tiles.retain(|id, _| layers.contains(id));
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("📂 Open").clicked() {
                self.pick_and_open();
            }
            let has_session = self.session.is_some();
            ui.separator();

            if let Some(session) = self.session.as_mut() {
                if ui.button("➕ Text").clicked() {
                    session.add_text_layer();
                }
                if ui.button("➕ Button").clicked() {
                    session.add_button_layer();
                }
                ui.separator();

                let undo_tip = session.history().undo_description().map(|d| format!("Undo {}", d));
                let r = ui.add_enabled(session.history().can_undo(), egui::Button::new("↶ Undo"));
                let r = match undo_tip {
                    Some(tip) => r.on_hover_text(tip),
                    None => r,
                };
                if r.clicked() {
                    session.undo();
                }
                let redo_tip = session.history().redo_description().map(|d| format!("Redo {}", d));
                let r = ui.add_enabled(session.history().can_redo(), egui::Button::new("↷ Redo"));
                let r = match redo_tip {
                    Some(tip) => r.on_hover_text(tip),
                    None => r,
                };
                if r.clicked() {
                    session.redo();
                }
            }
            ui.separator();

            if ui.add_enabled(has_session, egui::Button::new("🖼 Export PNG")).clicked() {
                self.start_export();
            }
            if ui.add_enabled(has_session, egui::Button::new("💾 Apply")).clicked() {
                self.apply();
            }
            if ui.add_enabled(has_session, egui::Button::new("✕ Close")).clicked() {
                if self.is_dirty() {
                    self.pending_close = true;
                } else {
                    self.close();
                }
            }

            if self.pending_io_ops > 0 {
                ui.spinner();
            }
            if let Some(status) = &self.status {
                ui.weak(status);
            }
        });
    }

    fn show_side_panel(&mut self, ui: &mut egui::Ui) {
        let Some(session) = self.session.as_mut() else {
            ui.weak("No creative open.");
            return;
        };
        egui::ScrollArea::vertical().id_source("side_scroll").show(ui, |ui| {
            egui::CollapsingHeader::new("Layers").default_open(true).show(ui, |ui| {
                self.layers_panel.show(ui, session);
            });
            egui::CollapsingHeader::new("Properties").default_open(true).show(ui, |ui| {
                self.properties_panel.show(ui, session);
            });
            egui::CollapsingHeader::new("Templates").default_open(true).show(ui, |ui| {
                self.templates_panel.show(ui, session, &mut self.store);
            });
            egui::CollapsingHeader::new("History").default_open(false).show(ui, |ui| {
                if let Some(steps) = self.history_panel.show(ui, session.history()) {
                    session.revert(steps);
                }
            });
        });
    }

    fn show_confirm_dialogs(&mut self, ctx: &egui::Context) {
        if !(self.pending_close || self.pending_exit) {
            return;
        }
        let mut discard = false;
        let mut apply = false;
        let mut cancel = false;
        egui::Window::new("Unsaved changes")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("The layers have changes that were not applied to the creative.");
                ui.horizontal(|ui| {
                    apply = ui.button("Apply").clicked();
                    discard = ui.button("Discard").clicked();
                    cancel = ui.button("Cancel").clicked();
                });
            });

        if cancel {
            self.pending_close = false;
            self.pending_exit = false;
            return;
        }
        if apply {
            self.apply();
        }
        if apply || discard {
            let exiting = self.pending_exit;
            self.close();
            if exiting {
                self.pending_exit = false;
                self.force_exit = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Window title: "AdStudio - <creative>[*]" ---
        {
            let session_dirty = self.session.as_ref().is_some_and(|s| s.is_dirty());
            let title = match self.document.as_mut() {
                Some(doc) => {
                    if session_dirty {
                        doc.mark_dirty();
                    }
                    format!("AdStudio - {}", doc.display_title())
                }
                None => "AdStudio".to_string(),
            };
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
        }

        // --- Intercept OS window-close while changes are unapplied ---
        if ctx.input(|i| i.viewport().close_requested()) && !self.force_exit && self.is_dirty() {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.pending_exit = true;
        }

        self.poll_io(ctx);
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.show_toolbar(ui);
        });
        egui::SidePanel::right("side_panel").default_width(300.0).resizable(true).show(ctx, |ui| {
            self.show_side_panel(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_canvas(ui, ctx);
        });

        self.show_confirm_dialogs(ctx);

        if self.pending_io_ops > 0 {
            ctx.request_repaint();
        }
    }
}
