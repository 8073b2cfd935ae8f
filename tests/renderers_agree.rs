//! The live preview and the PNG export are two renderers over the same
//! layers. These tests pin them to the same numbers on one fixture.

use adstudio::canvas::{FontSpec, create_button_layer, create_text_layer};
use adstudio::ops::coords::{CoordinateMapper, PixelPoint};
use adstudio::ops::fonts::FontBook;
use adstudio::ops::preview::build_preview;
use adstudio::ops::raster::{plan_layer, rasterize, render_tile};
use adstudio::ops::shapes::blend_over;
use adstudio::{Color, FontFamily, Layer, LayerCollection};
use image::{Rgba, RgbaImage};

const BASE: [u8; 4] = [20, 40, 60, 255];

fn no_fonts() -> FontBook {
    FontBook::without_system_fonts(Vec::new())
}

fn fixture() -> Vec<Layer> {
    let font = FontSpec { family: FontFamily::Oswald, size: 40.0, color: Color::WHITE };
    let mut faded = create_button_layer("", (30.0, 30.0), (30.0, 20.0), font, Color::rgb(250, 10, 10), 0.0);
    faded.opacity = 35.0;
    let solid = create_button_layer("", (70.0, 70.0), (20.0, 30.0), font, Color::rgb(10, 200, 10), 24.0);
    let mut headline = create_text_layer("Autumn drop", (50.0, 10.0), (80.0, 12.0), font);
    headline.opacity = 60.0;
    vec![faded, solid, headline]
}

fn textless() -> LayerCollection {
    fixture().into_iter().filter(|l| l.content.trim().is_empty()).collect::<Vec<_>>().into()
}

#[test]
fn preview_items_carry_the_export_plan() {
    let layers: LayerCollection = fixture().into();
    let export = CoordinateMapper::for_image(800, 800);
    let items = build_preview(&layers, &export, None);
    for (item, layer) in items.iter().zip(layers.iter()) {
        assert_eq!(item.plan, plan_layer(layer, &export));
    }

    // A half-size on-screen container scales every quantity by one half
    let screen = CoordinateMapper::new(PixelPoint::new(0.0, 0.0), 400.0, 400.0);
    for (small, large) in build_preview(&layers, &screen, None).iter().zip(&items) {
        assert_eq!(small.plan.rect.width() * 2.0, large.plan.rect.width());
        assert_eq!(small.plan.rect.center().x * 2.0, large.plan.rect.center().x);
        assert_eq!(small.plan.font_px * 2.0, large.plan.font_px);
        assert_eq!(small.plan.background.map(|(_, r)| r * 2.0), large.plan.background.map(|(_, r)| r));
        assert_eq!(small.plan.alpha, large.plan.alpha);
    }
}

#[test]
fn export_blends_each_layer_at_its_planned_alpha() {
    let layers = textless();
    let base = RgbaImage::from_pixel(400, 400, Rgba(BASE));
    let out = rasterize(&base, &layers, &no_fonts()).unwrap();
    let mapper = CoordinateMapper::for_image(400, 400);

    for layer in &layers {
        let plan = plan_layer(layer, &mapper);
        let (fill, _) = plan.background.unwrap();
        let mut expected = BASE;
        blend_over(&mut expected, fill.to_array(), plan.alpha);
        let c = plan.rect.center();
        assert_eq!(out.get_pixel(c.x as u32, c.y as u32).0, expected, "layer {}", layer.id);
    }
    assert_eq!(out.get_pixel(2, 398).0, BASE);
}

#[test]
fn tile_matches_export_pixels() {
    let layers = textless();
    let faded = layers.iter().next().unwrap();
    let mut opaque = faded.clone();
    opaque.opacity = 100.0;

    // Full-size container at the origin: the tile pixels line up with the export
    let mapper = CoordinateMapper::for_image(400, 400);
    let tile = render_tile(&opaque, &mapper, &no_fonts(), 1.0).unwrap().unwrap();
    let exported = rasterize(&RgbaImage::new(400, 400), &vec![opaque.clone()].into(), &no_fonts()).unwrap();
    let (ox, oy) = (tile.rect.min.x as u32, tile.rect.min.y as u32);
    for (x, y, px) in tile.image.enumerate_pixels() {
        assert_eq!(px, exported.get_pixel(ox + x, oy + y));
    }

    // Fading the tile by the layer alpha gives the exported translucent pixel
    let base = RgbaImage::from_pixel(400, 400, Rgba(BASE));
    let translucent = rasterize(&base, &vec![faded.clone()].into(), &no_fonts()).unwrap();
    let c = plan_layer(faded, &mapper).rect.center();
    let mut expected = BASE;
    blend_over(&mut expected, tile.image.get_pixel(c.x as u32 - ox, c.y as u32 - oy).0, faded.alpha());
    assert_eq!(translucent.get_pixel(c.x as u32, c.y as u32).0, expected);
}

#[test]
fn tile_follows_container_and_display_scale() {
    let layers = textless();
    let faded = layers.iter().next().unwrap();
    let screen = CoordinateMapper::new(PixelPoint::new(10.0, 20.0), 200.0, 200.0);
    let tile = render_tile(faded, &screen, &no_fonts(), 2.0).unwrap().unwrap();

    // Covers the layer box in screen space, at twice the resolution
    let rect = plan_layer(faded, &screen).rect;
    assert!(tile.rect.min.x <= rect.min.x && tile.rect.min.y <= rect.min.y);
    assert!(tile.rect.max.x >= rect.max.x && tile.rect.max.y >= rect.max.y);
    assert!(tile.rect.min.x >= 10.0 && tile.rect.min.y >= 20.0);
    assert_eq!(tile.image.width() as f32, tile.rect.width() * 2.0);
    assert_eq!(tile.image.height() as f32, tile.rect.height() * 2.0);

    let c = rect.center();
    let px = tile.image.get_pixel(((c.x - tile.rect.min.x) * 2.0) as u32, ((c.y - tile.rect.min.y) * 2.0) as u32);
    assert_eq!(px.0, [250, 10, 10, 255]);
}

#[test]
fn text_layer_needs_a_font_in_both_renderers() {
    let layers: LayerCollection = fixture().into();
    let headline = layers.iter().last().unwrap();
    let mapper = CoordinateMapper::for_image(400, 400);
    assert!(rasterize(&RgbaImage::new(400, 400), &layers, &no_fonts()).is_err());
    assert!(render_tile(headline, &mapper, &no_fonts(), 1.0).is_err());
}
