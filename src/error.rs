//! Error types for creative documents, the template store and export.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while producing a PNG from a creative.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The base image reference could not be resolved to bytes
    #[error("Unusable image source '{reference}': {reason}")]
    ImageSource { reference: String, reason: String },

    /// The base image bytes are not a decodable image
    #[error("Failed to decode base image: {0}")]
    Decode(#[from] image::ImageError),

    /// A layer has text but no font could be resolved for its family
    #[error("No font available for '{family}' (layer {layer})")]
    Font { family: String, layer: String },

    /// PNG encoding failed
    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("Failed to write {path}: {error}")]
    Io { path: PathBuf, error: std::io::Error },
}

/// Failures reading or writing the template store.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template store I/O error at {path}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    /// Persisted data exists but is not a template list
    #[error("Template store is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to serialize templates: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures reading or writing creative documents.
#[derive(Error, Debug)]
pub enum CreativeError {
    #[error("Failed to access {path}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("Invalid creative document {path}: {error}")]
    Parse { path: PathBuf, error: serde_json::Error },

    #[error("Failed to serialize creative: {0}")]
    Serialize(#[from] serde_json::Error),
}
