use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Smallest width (percent of the container) a resize may produce.
pub const MIN_LAYER_WIDTH: f32 = 5.0;
/// Smallest height (percent of the container) a resize may produce.
pub const MIN_LAYER_HEIGHT: f32 = 2.0;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Opaque layer identifier, stable for the layer's lifetime.
///
/// Stored as a string so documents produced elsewhere (with their own id
/// schemes) round-trip untouched; freshly generated ids are UUID v4.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// COLOR
// ============================================================================

/// Straight (non-premultiplied) RGBA color, serialized as a CSS hex string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Default call-to-action background.
    pub const INDIGO: Color = Color::rgb(0x4f, 0x46, 0xe5);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => Some(Self::rgb(nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17)),
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Color::from_hex(&s).ok_or_else(|| format!("invalid color '{}'", s))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

// ============================================================================
// ENUMERATIONS
// ============================================================================

/// What a layer is; decides how both renderers draw it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Text,
    Button,
    /// Reserved. Drawn like text (no background).
    Shape,
}

impl LayerKind {
    pub fn label(&self) -> &'static str {
        match self {
            LayerKind::Text => "Text",
            LayerKind::Button => "Button",
            LayerKind::Shape => "Shape",
        }
    }
}

/// The supported font families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFamily {
    #[serde(rename = "Inter")]
    Inter,
    #[serde(rename = "Bebas Neue")]
    BebasNeue,
    #[serde(rename = "Montserrat")]
    Montserrat,
    #[serde(rename = "Playfair Display")]
    PlayfairDisplay,
    #[serde(rename = "Roboto")]
    Roboto,
    #[serde(rename = "Oswald")]
    Oswald,
}

impl FontFamily {
    pub fn all() -> &'static [FontFamily] {
        &[
            FontFamily::Inter,
            FontFamily::BebasNeue,
            FontFamily::Montserrat,
            FontFamily::PlayfairDisplay,
            FontFamily::Roboto,
            FontFamily::Oswald,
        ]
    }

    /// Family name as it appears in font files and documents.
    pub fn family_name(&self) -> &'static str {
        match self {
            FontFamily::Inter => "Inter",
            FontFamily::BebasNeue => "Bebas Neue",
            FontFamily::Montserrat => "Montserrat",
            FontFamily::PlayfairDisplay => "Playfair Display",
            FontFamily::Roboto => "Roboto",
            FontFamily::Oswald => "Oswald",
        }
    }

    /// Lowercase name with spaces and dashes stripped, used to match font
    /// file stems such as `BebasNeue-Regular.ttf`.
    pub fn file_key(&self) -> String {
        self.family_name()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    pub fn is_serif(&self) -> bool {
        matches!(self, FontFamily::PlayfairDisplay)
    }
}

/// Aspect ratios a creative can be generated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "9:16")]
    Story9x16,
    #[serde(rename = "16:9")]
    Wide16x9,
    #[serde(rename = "4:5")]
    Portrait4x5,
}

impl AspectRatio {
    pub fn all() -> &'static [AspectRatio] {
        &[
            AspectRatio::Square,
            AspectRatio::Portrait3x4,
            AspectRatio::Landscape4x3,
            AspectRatio::Story9x16,
            AspectRatio::Wide16x9,
            AspectRatio::Portrait4x5,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Story9x16 => "9:16",
            AspectRatio::Wide16x9 => "16:9",
            AspectRatio::Portrait4x5 => "4:5",
        }
    }

    /// Width divided by height.
    pub fn ratio(&self) -> f32 {
        match self {
            AspectRatio::Square => 1.0,
            AspectRatio::Portrait3x4 => 3.0 / 4.0,
            AspectRatio::Landscape4x3 => 4.0 / 3.0,
            AspectRatio::Story9x16 => 9.0 / 16.0,
            AspectRatio::Wide16x9 => 16.0 / 9.0,
            AspectRatio::Portrait4x5 => 4.0 / 5.0,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|a| a.label() == s.trim())
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// LAYER
// ============================================================================

/// Font settings shared by the layer constructors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontSpec {
    pub family: FontFamily,
    pub size: f32,
    pub color: Color,
}

/// One overlay element.
///
/// Geometry is in percent of the container: `x`/`y` is the element's
/// center, `width`/`height` its extent. Positions are not clamped so an
/// element may hang partially off-canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub content: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    pub color: Color,
    pub font_family: FontFamily,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f32>,
}

fn default_opacity() -> f32 {
    100.0
}

/// Build a text layer with a fresh id.
pub fn create_text_layer(
    content: impl Into<String>,
    position: (f32, f32),
    size: (f32, f32),
    font: FontSpec,
) -> Layer {
    Layer {
        id: LayerId::generate(),
        kind: LayerKind::Text,
        content: content.into(),
        x: position.0,
        y: position.1,
        width: size.0,
        height: size.1,
        font_size: font.size,
        color: font.color,
        font_family: font.family,
        opacity: default_opacity(),
        background_color: None,
        border_radius: None,
    }
}

/// Build a button layer with a fresh id. `content` is the button label.
pub fn create_button_layer(
    content: impl Into<String>,
    position: (f32, f32),
    size: (f32, f32),
    font: FontSpec,
    background: Color,
    border_radius: f32,
) -> Layer {
    Layer {
        kind: LayerKind::Button,
        background_color: Some(background),
        border_radius: Some(border_radius),
        ..create_text_layer(content, position, size, font)
    }
}

impl Layer {
    /// The layer added by the "new text" tool.
    pub fn default_text() -> Self {
        create_text_layer(
            "NEW TEXT",
            (50.0, 50.0),
            (60.0, 10.0),
            FontSpec { family: FontFamily::Inter, size: 30.0, color: Color::WHITE },
        )
    }

    /// The layer added by the "new button" tool.
    pub fn default_button() -> Self {
        create_button_layer(
            "SHOP NOW",
            (50.0, 82.0),
            (45.0, 10.0),
            FontSpec { family: FontFamily::Inter, size: 18.0, color: Color::WHITE },
            Color::INDIGO,
            12.0,
        )
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn is_button(&self) -> bool {
        self.kind == LayerKind::Button
    }

    /// Opacity as a 0..=1 factor.
    pub fn alpha(&self) -> f32 {
        (self.opacity / 100.0).clamp(0.0, 1.0)
    }

    /// Button fill, if this layer draws one. A button without an explicit
    /// color falls back to black.
    pub fn background(&self) -> Option<Color> {
        if self.is_button() {
            Some(self.background_color.unwrap_or(Color::BLACK))
        } else {
            None
        }
    }

    pub fn radius(&self) -> f32 {
        self.border_radius.unwrap_or(0.0).max(0.0)
    }

    /// Text as both renderers draw it.
    pub fn display_text(&self) -> String {
        self.content.to_uppercase()
    }

    /// Copy of this layer under a new id.
    pub fn with_fresh_id(&self) -> Self {
        Self { id: LayerId::generate(), ..self.clone() }
    }

    /// Short label for lists.
    pub fn label(&self) -> String {
        let text: String = self.content.chars().take(24).collect();
        if text.trim().is_empty() {
            format!("{} (empty)", self.kind.label())
        } else {
            format!("{}: {}", self.kind.label(), text)
        }
    }
}

// ============================================================================
// LAYER COLLECTION
// ============================================================================

/// Ordered layers; index order is paint order (last = on top).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerCollection {
    layers: Vec<Layer>,
}

impl LayerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn as_slice(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Layers in layers-panel order: topmost first, paired with their paint index.
    pub fn display_order(&self) -> impl Iterator<Item = (usize, &Layer)> {
        self.layers.iter().enumerate().rev()
    }

    pub fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn find(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    pub fn find_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| &l.id == id)
    }

    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn extend(&mut self, other: LayerCollection) {
        self.layers.extend(other.layers);
    }

    pub fn remove(&mut self, id: &LayerId) -> Option<Layer> {
        let idx = self.index_of(id)?;
        Some(self.layers.remove(idx))
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Remove the layer at `from` and re-insert it at `to`.
    /// Returns false when either index is out of range or they are equal.
    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.layers.len() || to >= self.layers.len() {
            return false;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        true
    }

    /// Deep copy in which every layer carries a new id.
    pub fn with_fresh_ids(&self) -> Self {
        Self { layers: self.layers.iter().map(Layer::with_fresh_id).collect() }
    }
}

impl From<Vec<Layer>> for LayerCollection {
    fn from(layers: Vec<Layer>) -> Self {
        Self { layers }
    }
}

impl FromIterator<Layer> for LayerCollection {
    fn from_iter<I: IntoIterator<Item = Layer>>(iter: I) -> Self {
        Self { layers: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a LayerCollection {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}
