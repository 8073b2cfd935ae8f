use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{CreativeError, ExportError};
use crate::ops::fonts::FontBook;
use crate::ops::raster;
use crate::project::Creative;

// ============================================================================
// ATOMIC WRITES
// ============================================================================

/// Write `bytes` to `path` through a sibling temp file and a rename, so the
/// destination holds either the old content or the complete new content.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "out".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp-{}", file_name, std::process::id()));

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

// ============================================================================
// CREATIVE DOCUMENTS
// ============================================================================

pub fn load_creative(path: &Path) -> Result<Creative, CreativeError> {
    let raw = fs::read(path).map_err(|error| CreativeError::Io { path: path.to_path_buf(), error })?;
    serde_json::from_slice(&raw).map_err(|error| CreativeError::Parse { path: path.to_path_buf(), error })
}

pub fn save_creative(creative: &Creative, path: &Path) -> Result<(), CreativeError> {
    let json = serde_json::to_vec_pretty(creative)?;
    write_atomic(path, &json).map_err(|error| CreativeError::Io { path: path.to_path_buf(), error })
}

// ============================================================================
// IMAGE SOURCES
// ============================================================================

/// Where a creative's base image comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageSource {
    Path(PathBuf),
    /// Already-decoded-from-base64 bytes of a `data:` URI.
    Inline(Vec<u8>),
}

impl ImageSource {
    /// Interpret an image reference. Relative paths resolve against `base_dir`.
    pub fn parse(reference: &str, base_dir: Option<&Path>) -> Result<Self, ExportError> {
        let reference = reference.trim();
        let bad = |reason: &str| ExportError::ImageSource {
            reference: truncate_reference(reference),
            reason: reason.to_string(),
        };

        if let Some(rest) = reference.strip_prefix("data:") {
            let (meta, payload) = rest.split_once(',').ok_or_else(|| bad("data URI without payload"))?;
            if !meta.ends_with(";base64") {
                return Err(bad("only base64 data URIs are supported"));
            }
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|e| bad(&format!("invalid base64: {}", e)))?;
            return Ok(ImageSource::Inline(bytes));
        }

        if let Some(rest) = reference.strip_prefix("file://") {
            // file:///abs/path and file://localhost/abs/path
            let rest = rest.strip_prefix("localhost").unwrap_or(rest);
            return Ok(ImageSource::Path(PathBuf::from(rest)));
        }

        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Err(bad("remote images are not fetched; download the image first"));
        }
        if reference.is_empty() {
            return Err(bad("empty image reference"));
        }

        let path = PathBuf::from(reference);
        match base_dir {
            Some(dir) if path.is_relative() => Ok(ImageSource::Path(dir.join(path))),
            _ => Ok(ImageSource::Path(path)),
        }
    }

    pub fn load(&self) -> Result<RgbaImage, ExportError> {
        let bytes = match self {
            ImageSource::Inline(bytes) => std::borrow::Cow::Borrowed(bytes.as_slice()),
            ImageSource::Path(path) => std::borrow::Cow::Owned(fs::read(path).map_err(|e| {
                ExportError::ImageSource { reference: path.display().to_string(), reason: e.to_string() }
            })?),
        };
        Ok(image::load_from_memory(&bytes)?.into_rgba8())
    }
}

fn truncate_reference(reference: &str) -> String {
    if reference.len() > 64 {
        let cut: String = reference.chars().take(48).collect();
        format!("{}…", cut)
    } else {
        reference.to_string()
    }
}

/// Resolve and decode a creative's base image at its natural size.
pub fn load_base_image(creative: &Creative, base_dir: Option<&Path>) -> Result<RgbaImage, ExportError> {
    ImageSource::parse(&creative.image, base_dir)?.load()
}

// ============================================================================
// PNG EXPORT
// ============================================================================

/// Encode an image as PNG entirely in memory.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Load the base image, rasterize the creative's layers over it, and return
/// the PNG bytes. Nothing is written anywhere. Fails with
/// `ExportError::Font` rather than drop the text of a layer whose font is
/// unavailable.
pub fn render_png(creative: &Creative, base_dir: Option<&Path>, fonts: &FontBook) -> Result<Vec<u8>, ExportError> {
    let base = load_base_image(creative, base_dir)?;
    let composed = raster::rasterize(&base, &creative.layers, fonts)?;
    encode_png(&composed)
}

/// Render and write the PNG to `out`. On failure no file is left at `out`.
pub fn export_png(
    creative: &Creative,
    base_dir: Option<&Path>,
    fonts: &FontBook,
    out: &Path,
) -> Result<(), ExportError> {
    let png = render_png(creative, base_dir, fonts)?;
    write_atomic(out, &png).map_err(|error| ExportError::Io { path: out.to_path_buf(), error })?;
    log::info!("Exported {} ({} bytes)", out.display(), png.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::AspectRatio;

    fn tiny_png() -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))).unwrap()
    }

    #[test]
    fn data_uri_decodes() {
        let b64 = base64::engine::general_purpose::STANDARD.encode(tiny_png());
        let source = ImageSource::parse(&format!("data:image/png;base64,{}", b64), None).unwrap();
        let img = source.load().unwrap();
        assert_eq!(img.dimensions(), (3, 2));
    }

    #[test]
    fn references_resolve() {
        let base = Path::new("/work/ads");
        assert_eq!(
            ImageSource::parse("hero.png", Some(base)).unwrap(),
            ImageSource::Path(PathBuf::from("/work/ads/hero.png"))
        );
        assert_eq!(
            ImageSource::parse("file:///tmp/a.png", Some(base)).unwrap(),
            ImageSource::Path(PathBuf::from("/tmp/a.png"))
        );
        assert!(matches!(
            ImageSource::parse("https://cdn/x.png", None),
            Err(ExportError::ImageSource { .. })
        ));
        assert!(ImageSource::parse("data:image/png,raw", None).is_err());
    }

    #[test]
    fn undecodable_image_is_an_error() {
        let source = ImageSource::Inline(b"not an image".to_vec());
        assert!(matches!(source.load(), Err(ExportError::Decode(_))));
    }

    #[test]
    fn failed_export_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.png");
        let creative = Creative::new("x", "missing.png", AspectRatio::Square);
        let fonts = FontBook::without_system_fonts(Vec::new());
        assert!(export_png(&creative, Some(dir.path()), &fonts, &out).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn export_without_font_fails_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.png"), tiny_png()).unwrap();
        let out = dir.path().join("out.png");
        let mut creative = Creative::new("x", "base.png", AspectRatio::Square);
        creative.layers.push(crate::canvas::Layer::default_text());
        let fonts = FontBook::without_system_fonts(Vec::new());

        let err = export_png(&creative, Some(dir.path()), &fonts, &out).unwrap_err();
        assert!(matches!(err, ExportError::Font { ref family, .. } if family == "Inter"), "{err}");
        assert!(!out.exists());

        creative.layers = crate::canvas::LayerCollection::default();
        assert!(render_png(&creative, Some(dir.path()), &fonts).is_ok());
    }

    #[test]
    fn creative_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("c.json");
        let mut creative = Creative::new("c1", "hero.png", AspectRatio::Portrait4x5);
        creative.layers.push(crate::canvas::Layer::default_button());
        save_creative(&creative, &path).unwrap();
        assert_eq!(load_creative(&path).unwrap(), creative);

        fs::write(&path, b"{ nope").unwrap();
        assert!(matches!(load_creative(&path), Err(CreativeError::Parse { .. })));
    }
}
