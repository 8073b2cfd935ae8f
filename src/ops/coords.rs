//! Percent-space ↔ pixel-space mapping shared by the live preview, the
//! interaction engine and the rasterizer.
//!
//! Layer geometry lives in percent of the container. A `CoordinateMapper`
//! binds that model to one concrete pixel rectangle: the on-screen container
//! for the preview (recreated every frame, so it never goes stale) or the
//! base image's natural size for export.

use crate::canvas::{Layer, LayerCollection, LayerId};

/// Width in pixels at which `fontSize` and `borderRadius` are taken literally.
/// Both renderers scale them by `render_width / REFERENCE_WIDTH`.
pub const REFERENCE_WIDTH: f32 = 1000.0;

/// Side of the square resize affordance, in viewport pixels.
pub const RESIZE_HANDLE_SIZE: f32 = 12.0;

/// Horizontal text padding inside a layer box, in reference pixels.
pub const TEXT_PADDING: f32 = 8.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle (min inclusive, max exclusive).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelRect {
    pub min: PixelPoint,
    pub max: PixelPoint,
}

impl PixelRect {
    pub fn from_center_size(center: PixelPoint, w: f32, h: f32) -> Self {
        Self {
            min: PixelPoint::new(center.x - w / 2.0, center.y - h / 2.0),
            max: PixelPoint::new(center.x + w / 2.0, center.y + h / 2.0),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> PixelPoint {
        PixelPoint::new((self.min.x + self.max.x) / 2.0, (self.min.y + self.max.y) / 2.0)
    }

    pub fn contains(&self, p: PixelPoint) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }
}

/// Which part of a layer a pointer landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitRegion {
    Body,
    ResizeHandle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub id: LayerId,
    pub region: HitRegion,
}

// ============================================================================
// COORDINATE MAPPER
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    /// Top-left of the container in the pointer's coordinate space.
    pub origin: PixelPoint,
    pub width: f32,
    pub height: f32,
}

impl CoordinateMapper {
    pub fn new(origin: PixelPoint, width: f32, height: f32) -> Self {
        Self { origin, width, height }
    }

    /// Mapper for an offscreen target of `width x height` pixels.
    pub fn for_image(width: u32, height: u32) -> Self {
        Self::new(PixelPoint::default(), width as f32, height as f32)
    }

    /// `Δpercent = Δpixels / dimension * 100`, per axis. A collapsed
    /// container yields no movement.
    pub fn delta_to_percent(&self, dx: f32, dy: f32) -> (f32, f32) {
        let px = if self.width > 0.0 { dx / self.width * 100.0 } else { 0.0 };
        let py = if self.height > 0.0 { dy / self.height * 100.0 } else { 0.0 };
        (px, py)
    }

    pub fn to_pixels(&self, x_pct: f32, y_pct: f32) -> PixelPoint {
        PixelPoint::new(
            self.origin.x + x_pct / 100.0 * self.width,
            self.origin.y + y_pct / 100.0 * self.height,
        )
    }

    /// Pixel box of a layer (its position is the box center).
    pub fn layer_rect(&self, layer: &Layer) -> PixelRect {
        PixelRect::from_center_size(
            self.to_pixels(layer.x, layer.y),
            layer.width / 100.0 * self.width,
            layer.height / 100.0 * self.height,
        )
    }

    /// Scale factor applied to reference-pixel quantities.
    pub fn scale(&self) -> f32 {
        self.width / REFERENCE_WIDTH
    }

    pub fn font_px(&self, layer: &Layer) -> f32 {
        layer.font_size * self.scale()
    }

    pub fn radius_px(&self, layer: &Layer) -> f32 {
        layer.radius() * self.scale()
    }

    pub fn padding_px(&self) -> f32 {
        TEXT_PADDING * self.scale()
    }

    /// Resize affordance of a layer: a fixed-size square centered on the
    /// box's bottom-right corner.
    pub fn resize_handle(&self, layer: &Layer) -> PixelRect {
        let r = self.layer_rect(layer);
        PixelRect::from_center_size(r.max, RESIZE_HANDLE_SIZE, RESIZE_HANDLE_SIZE)
    }

    /// Find what lies under `p`. The selected layer's resize handle wins,
    /// then the topmost layer body.
    pub fn hit_test(
        &self,
        layers: &LayerCollection,
        selected: Option<&LayerId>,
        p: PixelPoint,
    ) -> Option<Hit> {
        if let Some(layer) = selected.and_then(|id| layers.find(id)) {
            if self.resize_handle(layer).contains(p) {
                return Some(Hit { id: layer.id.clone(), region: HitRegion::ResizeHandle });
            }
        }
        layers
            .display_order()
            .find(|(_, layer)| self.layer_rect(layer).contains(p))
            .map(|(_, layer)| Hit { id: layer.id.clone(), region: HitRegion::Body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_at(x: f32, y: f32, w: f32, h: f32) -> Layer {
        let mut layer = Layer::default_text();
        layer.x = x;
        layer.y = y;
        layer.width = w;
        layer.height = h;
        layer
    }

    #[test]
    fn deltas_scale_with_container() {
        let small = CoordinateMapper::new(PixelPoint::new(10.0, 20.0), 400.0, 200.0);
        assert_eq!(small.delta_to_percent(40.0, -10.0), (10.0, -5.0));

        let large = CoordinateMapper::for_image(2000, 1000);
        assert_eq!(large.delta_to_percent(200.0, -50.0), (10.0, -5.0));

        let collapsed = CoordinateMapper::for_image(0, 0);
        assert_eq!(collapsed.delta_to_percent(5.0, 5.0), (0.0, 0.0));
    }

    #[test]
    fn layer_rect_is_centered() {
        let mapper = CoordinateMapper::new(PixelPoint::new(100.0, 0.0), 1000.0, 500.0);
        let rect = mapper.layer_rect(&layer_at(50.0, 50.0, 40.0, 10.0));
        assert_eq!(rect.min, PixelPoint::new(400.0, 225.0));
        assert_eq!(rect.max, PixelPoint::new(800.0, 275.0));
        assert_eq!(rect.center(), mapper.to_pixels(50.0, 50.0));
    }

    #[test]
    fn reference_quantities_scale_with_width() {
        let mapper = CoordinateMapper::for_image(2000, 500);
        let mut button = Layer::default_button();
        button.font_size = 18.0;
        assert_eq!(mapper.font_px(&button), 36.0);
        assert_eq!(mapper.radius_px(&button), 24.0);
        assert_eq!(mapper.padding_px(), 16.0);
    }

    #[test]
    fn hit_test_prefers_topmost_body() {
        let mapper = CoordinateMapper::for_image(100, 100);
        let bottom = layer_at(50.0, 50.0, 40.0, 40.0);
        let top = layer_at(55.0, 55.0, 20.0, 20.0);
        let layers: LayerCollection = vec![bottom.clone(), top.clone()].into();

        let hit = mapper.hit_test(&layers, None, PixelPoint::new(56.0, 56.0)).unwrap();
        assert_eq!(hit.id, top.id);
        let hit = mapper.hit_test(&layers, None, PixelPoint::new(35.0, 35.0)).unwrap();
        assert_eq!(hit.id, bottom.id);
        assert!(mapper.hit_test(&layers, None, PixelPoint::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn resize_handle_only_on_selected_layer() {
        let mapper = CoordinateMapper::for_image(200, 200);
        let layer = layer_at(50.0, 50.0, 50.0, 50.0);
        let layers: LayerCollection = vec![layer.clone()].into();
        // Bottom-right corner sits at (150, 150)
        let corner = PixelPoint::new(149.0, 149.0);

        let hit = mapper.hit_test(&layers, None, corner).unwrap();
        assert_eq!(hit.region, HitRegion::Body);

        let hit = mapper.hit_test(&layers, Some(&layer.id), corner).unwrap();
        assert_eq!(hit.region, HitRegion::ResizeHandle);

        // Outside the box but inside the handle
        let outside = PixelPoint::new(154.0, 154.0);
        let hit = mapper.hit_test(&layers, Some(&layer.id), outside).unwrap();
        assert_eq!(hit.region, HitRegion::ResizeHandle);
        assert!(mapper.hit_test(&layers, None, outside).is_none());
    }
}
