use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use image::RgbaImage;

use crate::ops::coords::PixelPoint;
use crate::ops::shapes::blend_over;

/// One laid-out line: its text and advance width in pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub width: f32,
}

/// Wrapped, measured text ready to be drawn centered on a point.
#[derive(Clone, Debug)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub font_px: f32,
    pub ascent: f32,
    pub line_height: f32,
}

impl TextBlock {
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

/// Lay out a single line of text left-aligned at x=0.
/// Returns `(glyphs, total_width)` with glyph x positions.
pub fn layout_line(font: &FontArc, text: &str, font_px: f32) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(font_px);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }
    (glyphs, cursor_x)
}

pub fn line_width(font: &FontArc, text: &str, font_px: f32) -> f32 {
    layout_line(font, text, font_px).1
}

/// Greedy word wrap to `max_width`. Explicit newlines are kept; a single
/// word wider than the line is broken between characters.
pub fn wrap_lines(font: &FontArc, text: &str, font_px: f32, max_width: f32) -> Vec<String> {
    let max_width = max_width.max(0.0);
    let mut out = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() { word.to_string() } else { format!("{} {}", line, word) };
            if line_width(font, &candidate, font_px) <= max_width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                out.push(std::mem::take(&mut line));
            }
            if line_width(font, word, font_px) <= max_width {
                line = word.to_string();
            } else {
                // Break the long word character by character
                for ch in word.chars() {
                    let mut next = line.clone();
                    next.push(ch);
                    if !line.is_empty() && line_width(font, &next, font_px) > max_width {
                        out.push(std::mem::take(&mut line));
                        line.push(ch);
                    } else {
                        line = next;
                    }
                }
            }
        }
        out.push(line);
    }
    out
}

/// Wrap and measure `text` for a box `max_width` pixels wide.
pub fn layout_block(font: &FontArc, text: &str, font_px: f32, max_width: f32) -> TextBlock {
    let scaled = font.as_scaled(font_px);
    let lines = wrap_lines(font, text, font_px, max_width)
        .into_iter()
        .map(|text| {
            let width = line_width(font, &text, font_px);
            TextLine { text, width }
        })
        .collect();
    TextBlock { lines, font_px, ascent: scaled.ascent(), line_height: scaled.height() }
}

/// Draw `block` centered on `center`, each line centered horizontally.
/// Glyph coverage is blended onto `target` in `color`.
pub fn draw_block(target: &mut RgbaImage, font: &FontArc, block: &TextBlock, center: PixelPoint, color: [u8; 4]) {
    let (w, h) = target.dimensions();
    let top = center.y - block.height() * 0.5;

    for (line_idx, line) in block.lines.iter().enumerate() {
        if line.text.is_empty() {
            continue;
        }
        let baseline = top + line_idx as f32 * block.line_height + block.ascent;
        let left = center.x - line.width * 0.5;
        let (glyphs, _) = layout_line(font, &line.text, block.font_px);

        for (glyph_id, gx) in glyphs {
            let glyph = glyph_id.with_scale_and_position(block.font_px, point(left + gx, baseline));
            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, cov| {
                let x = bounds.min.x as i64 + px as i64;
                let y = bounds.min.y as i64 + py as i64;
                if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
                    return;
                }
                let pixel = target.get_pixel_mut(x as u32, y as u32);
                blend_over(&mut pixel.0, color, cov);
            });
        }
    }
}
