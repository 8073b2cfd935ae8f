use std::collections::HashSet;

use adstudio::canvas::{FontSpec, create_button_layer, create_text_layer};
use adstudio::cli::{self, CliArgs};
use adstudio::error::ExportError;
use adstudio::io::{encode_png, load_creative, render_png, save_creative};
use adstudio::ops::coords::{CoordinateMapper, PixelPoint};
use adstudio::ops::fonts::FontBook;
use adstudio::ops::interaction::{PointerSource, PressOutcome};
use adstudio::settings::EditorSettings;
use adstudio::templates::{JsonFileRepository, MemoryRepository};
use adstudio::{ApplyMode, AspectRatio, Color, Creative, EditorSession, FontFamily, Layer, LayerCollection, TemplateStore};
use base64::Engine as _;
use clap::Parser;
use image::{Rgba, RgbaImage};

fn mapper() -> CoordinateMapper {
    CoordinateMapper::for_image(1000, 1000)
}

fn box_layer() -> Layer {
    create_text_layer(
        "Summer sale",
        (50.0, 50.0),
        (40.0, 10.0),
        FontSpec { family: FontFamily::Inter, size: 30.0, color: Color::WHITE },
    )
}

fn creative_with(layers: Vec<Layer>) -> Creative {
    let mut creative = Creative::new("c1", "base.png", AspectRatio::Square);
    creative.layers = layers.into();
    creative
}

fn promo_layers() -> Vec<Layer> {
    let font = FontSpec { family: FontFamily::Montserrat, size: 24.0, color: Color::WHITE };
    vec![
        create_text_layer("Headline", (50.0, 20.0), (80.0, 12.0), font),
        create_text_layer("Subline", (50.0, 35.0), (70.0, 8.0), font),
        create_button_layer("Buy", (50.0, 85.0), (40.0, 10.0), font, Color::INDIGO, 12.0),
    ]
}

/// Text-free layers: these render identically with or without fonts.
fn badge_layers() -> Vec<Layer> {
    let font = FontSpec { family: FontFamily::Montserrat, size: 24.0, color: Color::WHITE };
    vec![
        create_button_layer("", (20.0, 20.0), (20.0, 20.0), font, Color::INDIGO, 50.0),
        create_button_layer(" ", (80.0, 80.0), (30.0, 15.0), font, Color::rgb(255, 80, 0), 8.0),
    ]
}

fn data_uri(width: u32, height: u32) -> String {
    let img = RgbaImage::from_pixel(width, height, Rgba([20, 40, 60, 255]));
    let png = encode_png(&img).unwrap();
    format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(png))
}

fn drag(session: &mut EditorSession, from: (f32, f32), to: (f32, f32), steps: usize) {
    let m = mapper();
    let outcome = session.pointer_pressed(m, PixelPoint::new(from.0, from.1), PointerSource::Mouse);
    assert!(matches!(outcome, PressOutcome::Started { .. }));
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        session.pointer_moved(PixelPoint::new(from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t));
    }
    session.pointer_released();
}

#[test]
fn drag_moves_layer_and_records_one_entry() {
    let layer = box_layer();
    let id = layer.id.clone();
    let mut session = EditorSession::open(&creative_with(vec![layer]), 50);

    drag(&mut session, (500.0, 500.0), (600.0, 450.0), 12);

    let moved = session.layers().find(&id).unwrap();
    assert!((moved.x - 60.0).abs() < 1e-4);
    assert!((moved.y - 45.0).abs() < 1e-4);
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history().undo_description(), Some("Move layer"));

    assert!(session.undo());
    let back = session.layers().find(&id).unwrap();
    assert_eq!((back.x, back.y), (50.0, 50.0));
}

#[test]
fn n_drags_append_n_entries() {
    let layer = box_layer();
    let mut session = EditorSession::open(&creative_with(vec![layer]), 50);

    let mut x = 500.0;
    for steps in [1, 5, 30, 2] {
        drag(&mut session, (x, 500.0), (x + 10.0, 500.0), steps);
        x += 10.0;
    }
    assert_eq!(session.history().len(), 1 + 4);
}

#[test]
fn redo_after_undo_restores_state() {
    let mut session = EditorSession::open(&creative_with(vec![box_layer()]), 50);
    session.add_button_layer();
    drag(&mut session, (500.0, 500.0), (520.0, 530.0), 3);
    let state = session.layers().clone();

    assert!(session.undo());
    assert_ne!(session.layers(), &state);
    assert!(session.redo());
    assert_eq!(session.layers(), &state);
}

#[test]
fn new_action_after_undo_discards_redo() {
    let mut session = EditorSession::open(&creative_with(vec![box_layer()]), 50);
    session.add_text_layer();
    session.add_button_layer();
    assert!(session.undo());
    assert!(session.history().can_redo());

    session.add_text_layer();
    assert!(!session.history().can_redo());
    let before = session.layers().clone();
    assert!(!session.redo());
    assert_eq!(session.layers(), &before);
}

#[test]
fn history_is_capped_and_evicted_state_is_gone() {
    let mut session = EditorSession::open(&creative_with(vec![]), 50);
    for _ in 0..50 {
        session.add_text_layer();
    }
    assert_eq!(session.history().len(), 50);

    let mut undone = 0;
    while session.undo() {
        undone += 1;
    }
    assert_eq!(undone, 49);
    // The empty opening state was evicted; the oldest reachable state has one layer
    assert_eq!(session.layers().len(), 1);
}

#[test]
fn resize_respects_minimum_size() {
    let layer = box_layer();
    let id = layer.id.clone();
    let mut session = EditorSession::open(&creative_with(vec![layer]), 50);
    session.select(Some(&id));

    // Bottom-right corner of a 40x10 box centred at 50,50
    let outcome = session.pointer_pressed(mapper(), PixelPoint::new(700.0, 550.0), PointerSource::Touch);
    assert!(matches!(outcome, PressOutcome::Started { .. }));
    session.pointer_moved(PixelPoint::new(-5000.0, -5000.0));
    session.pointer_released();

    let resized = session.layers().find(&id).unwrap();
    assert_eq!(resized.width, 5.0);
    assert_eq!(resized.height, 2.0);
    assert_eq!((resized.x, resized.y), (50.0, 50.0));
    assert_eq!(session.history().undo_description(), Some("Resize layer"));
}

#[test]
fn template_round_trip_regenerates_ids() {
    let mut store = TemplateStore::open(Box::new(MemoryRepository::new()));
    let mut session = EditorSession::open(&creative_with(promo_layers()), 50);
    let saved = session.save_as_template(&mut store, "Promo A").unwrap().unwrap();
    assert_eq!(store.len(), 1);

    let ids: Vec<_> = session.layers().iter().map(|l| l.id.clone()).collect();
    for id in &ids {
        assert!(session.delete_layer(id));
    }
    assert!(session.layers().is_empty());

    let template = store.find_by_name("Promo A", Some(AspectRatio::Square)).unwrap().clone();
    assert_eq!(template.id, saved.id);
    session.apply_template(&template, ApplyMode::Replace);

    assert_eq!(session.layers().len(), 3);
    for (applied, original) in session.layers().iter().zip(saved.layers.iter()) {
        assert_ne!(applied.id, original.id);
        assert_eq!(applied.content, original.content);
        assert_eq!((applied.x, applied.y, applied.width, applied.height), (original.x, original.y, original.width, original.height));
        assert_eq!(applied.background_color, original.background_color);
    }
}

#[test]
fn applying_twice_gives_disjoint_ids() {
    let mut store = TemplateStore::in_memory();
    let layers: LayerCollection = promo_layers().into();
    let template = store.save("Promo A", &layers, AspectRatio::Square).unwrap().unwrap();

    let mut session = EditorSession::open(&creative_with(vec![]), 50);
    let first = session.apply_template(&template, ApplyMode::Append);
    let second = session.apply_template(&template, ApplyMode::Append);

    assert_eq!(session.layers().len(), 6);
    let all: HashSet<_> = session.layers().iter().map(|l| l.id.clone()).collect();
    assert_eq!(all.len(), 6);
    assert!(first.iter().all(|id| !second.contains(id)));
    assert_eq!(session.history().len(), 3);
}

#[test]
fn blank_template_name_saves_nothing() {
    let mut store = TemplateStore::in_memory();
    let mut session = EditorSession::open(&creative_with(promo_layers()), 50);
    assert!(session.save_as_template(&mut store, "").unwrap().is_none());
    assert!(session.save_as_template(&mut store, "   ").unwrap().is_none());
    assert_eq!(store.len(), 0);
}

#[test]
fn corrupt_store_opens_empty_and_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("templates.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let mut store = TemplateStore::open(Box::new(JsonFileRepository::new(&path)));
    assert!(store.is_empty());

    let layers: LayerCollection = promo_layers().into();
    store.save("Fresh", &layers, AspectRatio::Story9x16).unwrap();
    let reopened = TemplateStore::open_file(&path);
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.templates()[0].name, "Fresh");
}

#[test]
fn export_uses_natural_image_size() {
    let mut creative = creative_with(badge_layers());
    creative.image = data_uri(640, 360);

    // Edit through a small viewport; export must not care
    let mut session = EditorSession::open(&creative, 50);
    let viewport = CoordinateMapper::new(PixelPoint::new(30.0, 40.0), 320.0, 180.0);
    let outcome = session.pointer_pressed(viewport, PixelPoint::new(94.0, 76.0), PointerSource::Mouse);
    assert!(matches!(outcome, PressOutcome::Started { .. }));
    session.pointer_moved(PixelPoint::new(104.0, 81.0));
    session.pointer_released();
    session.apply_to(&mut creative);
    assert!((creative.layers.iter().next().unwrap().x - 20.0 - 3.125).abs() < 1e-3);

    let png = render_png(&creative, None, &FontBook::without_system_fonts(Vec::new())).unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (640, 360));
}

#[test]
fn export_refuses_text_without_font() {
    let mut creative = creative_with(promo_layers());
    creative.image = data_uri(64, 64);
    let err = render_png(&creative, None, &FontBook::without_system_fonts(Vec::new())).unwrap_err();
    assert!(matches!(err, ExportError::Font { ref family, .. } if family == "Montserrat"), "{err}");
}

#[test]
fn cli_applies_template_exports_and_writes_back() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("c1.json");
    let mut creative = creative_with(vec![box_layer()]);
    creative.image = data_uri(200, 100);
    creative.extra.insert("platform".into(), serde_json::json!("instagram"));
    save_creative(&creative, &input).unwrap();

    let mut store = TemplateStore::in_memory();
    let template = store.save("Promo A", &badge_layers().into(), AspectRatio::Square).unwrap().unwrap();

    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    let args = CliArgs::try_parse_from([
        "AdStudio",
        input.to_str().unwrap(),
        "--template",
        "promo a",
        "--export",
        "--write-back",
        "--output-dir",
        out_dir.to_str().unwrap(),
    ])
    .unwrap();

    let settings = EditorSettings::default();
    let fonts = FontBook::without_system_fonts(Vec::new());
    let exported = cli::run_one(&input, &args, &settings, &mut store, &fonts).unwrap().unwrap();

    assert_eq!(exported, out_dir.join("creative-c1.png"));
    let png = image::open(&exported).unwrap();
    assert_eq!((png.width(), png.height()), (200, 100));

    let written = load_creative(&input).unwrap();
    assert_eq!(written.layers.len(), 2);
    assert!(written.layers.iter().all(|l| !template.layers.contains(&l.id)));
    assert_eq!(written.extra.get("platform"), Some(&serde_json::json!("instagram")));
    assert_eq!(written.image, creative.image);
}

#[test]
fn cli_export_without_font_fails_before_write_back() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("c1.json");
    let mut creative = creative_with(promo_layers());
    creative.image = data_uri(200, 100);
    save_creative(&creative, &input).unwrap();
    let before = std::fs::read_to_string(&input).unwrap();

    let out = dir.path().join("out.png");
    let args = CliArgs::try_parse_from([
        "AdStudio",
        input.to_str().unwrap(),
        "--export",
        "--write-back",
        "--output",
        out.to_str().unwrap(),
    ])
    .unwrap();
    let mut store = TemplateStore::in_memory();
    let fonts = FontBook::without_system_fonts(Vec::new());
    let err = cli::run_one(&input, &args, &EditorSettings::default(), &mut store, &fonts).unwrap_err();

    assert!(err.contains("Montserrat"), "{err}");
    assert!(!out.exists());
    assert_eq!(std::fs::read_to_string(&input).unwrap(), before);
}

#[test]
fn cli_reports_missing_template() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("c1.json");
    save_creative(&creative_with(vec![box_layer()]), &input).unwrap();

    let args = CliArgs::try_parse_from(["AdStudio", input.to_str().unwrap(), "--template", "Nope"]).unwrap();
    let mut store = TemplateStore::in_memory();
    let fonts = FontBook::without_system_fonts(Vec::new());
    let err = cli::run_one(&input, &args, &EditorSettings::default(), &mut store, &fonts).unwrap_err();
    assert!(err.contains("Nope"));
}
