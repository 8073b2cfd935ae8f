//! Display list for the interactive preview.
//!
//! Each item carries the `LayerPlan` the rasterizer would use for the same
//! mapper, so the two renderers agree on placement, scale and opacity.

use crate::canvas::{Color, FontFamily, LayerCollection, LayerId};
use crate::ops::coords::{CoordinateMapper, PixelRect};
use crate::ops::raster::{LayerPlan, plan_layer};

#[derive(Clone, Debug, PartialEq)]
pub struct PreviewItem {
    pub id: LayerId,
    pub plan: LayerPlan,
    pub font_family: FontFamily,
    pub color: Color,
    pub selected: bool,
    /// Resize affordance, present on the selected layer only.
    pub handle: Option<PixelRect>,
}

/// Items in paint order (bottom first).
pub fn build_preview(layers: &LayerCollection, mapper: &CoordinateMapper, selected: Option<&LayerId>) -> Vec<PreviewItem> {
    layers
        .iter()
        .map(|layer| {
            let is_selected = selected == Some(&layer.id);
            PreviewItem {
                id: layer.id.clone(),
                plan: plan_layer(layer, mapper),
                font_family: layer.font_family,
                color: layer.color,
                selected: is_selected,
                handle: is_selected.then(|| mapper.resize_handle(layer)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Layer;
    use crate::ops::coords::PixelPoint;

    #[test]
    fn preview_scales_with_container_width() {
        let mut button = Layer::default_button();
        button.font_size = 20.0;
        button.border_radius = Some(10.0);
        let layers: LayerCollection = vec![button.clone()].into();

        let small = build_preview(&layers, &CoordinateMapper::new(PixelPoint::new(0.0, 0.0), 500.0, 500.0), None);
        let large = build_preview(&layers, &CoordinateMapper::for_image(2000, 2000), None);
        assert_eq!(small[0].plan.font_px, 10.0);
        assert_eq!(large[0].plan.font_px, 40.0);
        assert_eq!(small[0].plan.background, Some((Color::INDIGO, 5.0)));
        assert_eq!(large[0].plan.background, Some((Color::INDIGO, 20.0)));
        // Same layout, four times the pixels
        assert_eq!(large[0].plan.rect.width(), small[0].plan.rect.width() * 4.0);
        assert_eq!(large[0].plan.text_width, small[0].plan.text_width * 4.0);
    }

    #[test]
    fn selected_item_exposes_handle() {
        let text = Layer::default_text();
        let button = Layer::default_button();
        let layers: LayerCollection = vec![text.clone(), button.clone()].into();
        let mapper = CoordinateMapper::for_image(1000, 1000);
        let items = build_preview(&layers, &mapper, Some(&button.id));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, text.id);
        assert!(items[0].handle.is_none() && !items[0].selected);
        assert_eq!(items[1].handle, Some(mapper.resize_handle(&button)));
        assert_eq!(items[0].plan.text, "NEW TEXT");
        assert!(items[0].plan.background.is_none());
    }
}
