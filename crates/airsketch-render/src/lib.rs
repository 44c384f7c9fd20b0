//! airsketch Render Library
//!
//! Rasterizes paper-space strokes onto a pixel surface and exports the
//! drawing as PNG or EPS.

pub mod export;
mod pipeline;
mod pixmap;
mod surface;

pub use export::{EpsPage, ExportError, ExportResult, export_eps, export_file_name, export_png, iso_timestamp};
pub use pipeline::RenderPipeline;
pub use pixmap::Pixmap;
pub use surface::{InkStyle, RenderError, RenderResult, Surface};
