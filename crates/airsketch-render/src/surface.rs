//! Drawing surface abstraction.

use kurbo::{Point, Size};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: f64, height: f64 },
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Ink color, background and width for one kind of output.
#[derive(Debug, Clone, Copy)]
pub struct InkStyle {
    pub ink: Color,
    pub background: Color,
    /// Line width as a fraction of the surface width.
    pub width_ratio: f64,
}

impl InkStyle {
    /// White ink on black, used on screen.
    pub fn display() -> Self {
        Self {
            ink: Color::from_rgba8(255, 255, 255, 255),
            background: Color::from_rgba8(0, 0, 0, 255),
            width_ratio: 2.0 / 1000.0,
        }
    }

    /// Black ink on opaque white, used for raster export.
    pub fn export() -> Self {
        Self {
            ink: Color::from_rgba8(0, 0, 0, 255),
            background: Color::from_rgba8(255, 255, 255, 255),
            width_ratio: 2.0 / 1000.0,
        }
    }

    /// Line width in pixels for a surface of the given size.
    pub fn line_width(&self, surface: Size) -> f64 {
        self.width_ratio * surface.width
    }
}

impl Default for InkStyle {
    fn default() -> Self {
        Self::display()
    }
}

/// Trait for drawing backends.
///
/// Lines use round caps and round joins.
pub trait Surface {
    /// Surface size in pixels.
    fn size(&self) -> Size;

    /// Fill the whole surface.
    fn clear(&mut self, color: Color);

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color);

    /// Stroke a connected polyline. A single point draws nothing.
    fn stroke_polyline(&mut self, points: &[Point], width: f64, color: Color);
}
