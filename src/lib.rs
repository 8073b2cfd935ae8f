//! Layer-based creative editor: percent-space text and button overlays on a
//! generated ad image, with drag/resize interaction, bounded undo history,
//! reusable templates and PNG export.
//!
//! Everything except `app` and `components` works without a window.

#![allow(clippy::too_many_arguments)]

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod editor;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;
pub mod settings;
pub mod templates;

pub use canvas::{AspectRatio, Color, FontFamily, Layer, LayerCollection, LayerId, LayerKind};
pub use editor::EditorSession;
pub use project::Creative;
pub use templates::{ApplyMode, Template, TemplateStore};
