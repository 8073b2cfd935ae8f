use image::RgbaImage;
use rayon::prelude::*;

use crate::ops::coords::PixelRect;

// ============================================================================
// COMPOSITING
// ============================================================================

/// Source-over blend of `color` (straight alpha) scaled by `coverage` onto
/// one straight-alpha RGBA pixel.
#[inline]
pub fn blend_over(dst: &mut [u8], color: [u8; 4], coverage: f32) {
    let sa = color[3] as f32 / 255.0 * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let sc = color[c] as f32;
        let dc = dst[c] as f32;
        dst[c] = ((sc * sa + dc * da * (1.0 - sa)) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

// ============================================================================
// SDF
// ============================================================================

/// SDF for a box centred at origin with half-extents (hx, hy).
#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

/// SDF for a rounded box. The radius is capped at the shorter half-extent,
/// which is how CSS clamps `border-radius`.
#[inline]
pub fn sdf_rounded_box(px: f32, py: f32, hx: f32, hy: f32, r: f32) -> f32 {
    let r = r.max(0.0).min(hx).min(hy);
    sdf_box(px, py, hx - r, hy - r) - r
}

// ============================================================================
// ROUNDED RECTANGLE FILL
// ============================================================================

/// Fill `rect` with rounded corners directly onto `target`, anti-aliased
/// over one pixel. Parts outside the target are clipped.
pub fn fill_rounded_rect(target: &mut RgbaImage, rect: PixelRect, radius: f32, color: [u8; 4]) {
    let (canvas_w, canvas_h) = target.dimensions();
    if rect.width() <= 0.0 || rect.height() <= 0.0 || color[3] == 0 {
        return;
    }

    // Pad one pixel for the AA fringe, then clamp to canvas
    let x0 = ((rect.min.x - 1.0).floor() as i64).clamp(0, canvas_w as i64) as usize;
    let y0 = ((rect.min.y - 1.0).floor() as i64).clamp(0, canvas_h as i64) as usize;
    let x1 = ((rect.max.x + 1.0).ceil() as i64).clamp(0, canvas_w as i64) as usize;
    let y1 = ((rect.max.y + 1.0).ceil() as i64).clamp(0, canvas_h as i64) as usize;
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let center = rect.center();
    let hx = rect.width() * 0.5;
    let hy = rect.height() * 0.5;
    let row_bytes = canvas_w as usize * 4;

    let buf: &mut [u8] = target;
    buf.par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0)
        .take(y1 - y0)
        .for_each(|(row, row_buf)| {
            let py = row as f32 + 0.5 - center.y;
            for col in x0..x1 {
                let px = col as f32 + 0.5 - center.x;
                let d = sdf_rounded_box(px, py, hx, hy, radius);
                let coverage = smoothstep(0.5, -0.5, d);
                if coverage > 0.001 {
                    let idx = col * 4;
                    blend_over(&mut row_buf[idx..idx + 4], color, coverage);
                }
            }
        });
}

/// Smoothstep between edge0 and edge1.
#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
