//! Offscreen compositor for export.
//!
//! Output is the base image at its natural size with every layer drawn in
//! paint order. Geometry maps through a `CoordinateMapper` bound to the
//! image, and reference-pixel quantities (font size, radius, padding) scale
//! by `width / REFERENCE_WIDTH`, exactly as in the live preview.
//!
//! `plan_layer` is the single place those numbers are resolved; the preview
//! display list and translucent preview tiles are built from it too.

use image::RgbaImage;
use rayon::prelude::*;

use crate::canvas::{Color, Layer, LayerCollection};
use crate::error::ExportError;
use crate::ops::coords::{CoordinateMapper, PixelPoint, PixelRect};
use crate::ops::fonts::FontBook;
use crate::ops::shapes::{blend_over, fill_rounded_rect};
use crate::ops::text::{draw_block, layout_block};

/// Pixel geometry of one layer under one mapper.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerPlan {
    pub rect: PixelRect,
    /// Fill color and corner radius in pixels, for buttons.
    pub background: Option<(Color, f32)>,
    /// Upper-cased content.
    pub text: String,
    pub font_px: f32,
    /// Width available to text after padding.
    pub text_width: f32,
    /// Group opacity, 0..=1.
    pub alpha: f32,
}

impl LayerPlan {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty() && self.font_px > 0.0
    }
}

pub fn plan_layer(layer: &Layer, mapper: &CoordinateMapper) -> LayerPlan {
    let rect = mapper.layer_rect(layer);
    LayerPlan {
        rect,
        background: layer.background().map(|c| (c, mapper.radius_px(layer))),
        text: layer.display_text(),
        font_px: mapper.font_px(layer),
        text_width: (rect.width() - 2.0 * mapper.padding_px()).max(0.0),
        alpha: layer.alpha(),
    }
}

/// Composite `layers` over `base`. The result has `base`'s dimensions.
///
/// A layer with visible text whose font family cannot be resolved fails the
/// whole render with `ExportError::Font`.
pub fn rasterize(base: &RgbaImage, layers: &LayerCollection, fonts: &FontBook) -> Result<RgbaImage, ExportError> {
    let mut canvas = base.clone();
    let mapper = CoordinateMapper::for_image(base.width(), base.height());
    for layer in layers {
        render_layer(&mut canvas, layer, &mapper, fonts)?;
    }
    Ok(canvas)
}

/// Draw one layer, applying its opacity to the layer as a whole.
fn render_layer(canvas: &mut RgbaImage, layer: &Layer, mapper: &CoordinateMapper, fonts: &FontBook) -> Result<(), ExportError> {
    let alpha = layer.alpha();
    if alpha <= 0.0 {
        return Ok(());
    }
    if alpha >= 1.0 {
        return draw_layer(canvas, layer, mapper, fonts);
    }

    // Overlapping text and background must not show through each other
    let mut scratch = RgbaImage::new(canvas.width(), canvas.height());
    draw_layer(&mut scratch, layer, mapper, fonts)?;
    composite(canvas, &scratch, alpha);
    Ok(())
}

/// Draw a layer fully opaque. Opacity is the caller's business.
fn draw_layer(target: &mut RgbaImage, layer: &Layer, mapper: &CoordinateMapper, fonts: &FontBook) -> Result<(), ExportError> {
    let plan = plan_layer(layer, mapper);

    if let Some((bg, radius)) = plan.background {
        fill_rounded_rect(target, plan.rect, radius, bg.to_array());
    }
    if !plan.has_text() {
        return Ok(());
    }

    let font = fonts.font(layer.font_family).ok_or_else(|| ExportError::Font {
        family: layer.font_family.family_name().to_string(),
        layer: layer.id.to_string(),
    })?;
    let block = layout_block(&font, &plan.text, plan.font_px, plan.text_width);
    draw_block(target, &font, &block, plan.rect.center(), layer.color.to_array());
    Ok(())
}

/// Blend `layer` onto `canvas` with a uniform `alpha`.
fn composite(canvas: &mut RgbaImage, layer: &RgbaImage, alpha: f32) {
    let row_bytes = canvas.width() as usize * 4;
    if row_bytes == 0 {
        return;
    }
    let dst: &mut [u8] = canvas;
    let src: &[u8] = layer;
    dst.par_chunks_mut(row_bytes)
        .zip(src.par_chunks(row_bytes))
        .for_each(|(dst_row, src_row)| {
            for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                if s[3] != 0 {
                    blend_over(d, [s[0], s[1], s[2], s[3]], alpha);
                }
            }
        });
}

// ============================================================================
// TILES
// ============================================================================

/// One layer drawn alone on a transparent bitmap.
pub struct LayerTile {
    pub image: RgbaImage,
    /// Placement of the bitmap in the mapper's coordinate space.
    pub rect: PixelRect,
}

/// Draw `layer` by itself at `pixels_per_unit` bitmap pixels per mapper unit,
/// without its opacity. Blending the tile with the layer's alpha reproduces
/// what `rasterize` does for a translucent layer.
///
/// The tile covers the layer box plus room for overflowing text, clipped to
/// the container. `None` when nothing of it is inside the container.
pub fn render_tile(
    layer: &Layer,
    mapper: &CoordinateMapper,
    fonts: &FontBook,
    pixels_per_unit: f32,
) -> Result<Option<LayerTile>, ExportError> {
    let ppu = if pixels_per_unit > 0.0 { pixels_per_unit } else { 1.0 };
    let device = CoordinateMapper::new(
        PixelPoint::new(mapper.origin.x * ppu, mapper.origin.y * ppu),
        mapper.width * ppu,
        mapper.height * ppu,
    );
    let plan = plan_layer(layer, &device);
    let margin = plan.rect.height().max(2.0 * plan.font_px).max(0.0);

    let min_x = (plan.rect.min.x - margin).max(device.origin.x).floor();
    let min_y = (plan.rect.min.y - margin).max(device.origin.y).floor();
    let max_x = (plan.rect.max.x + margin).min(device.origin.x + device.width).ceil();
    let max_y = (plan.rect.max.y + margin).min(device.origin.y + device.height).ceil();
    if max_x <= min_x || max_y <= min_y {
        return Ok(None);
    }

    let local = CoordinateMapper::new(
        PixelPoint::new(device.origin.x - min_x, device.origin.y - min_y),
        device.width,
        device.height,
    );
    let mut image = RgbaImage::new((max_x - min_x) as u32, (max_y - min_y) as u32);
    draw_layer(&mut image, layer, &local, fonts)?;

    Ok(Some(LayerTile {
        image,
        rect: PixelRect {
            min: PixelPoint::new(min_x / ppu, min_y / ppu),
            max: PixelPoint::new(max_x / ppu, max_y / ppu),
        },
    }))
}
