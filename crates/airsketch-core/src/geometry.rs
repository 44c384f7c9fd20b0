//! Paper-space to screen-space mapping.

use kurbo::{Point, Size};

use crate::bounds::PaperBounds;

/// Fraction of the target size left empty on each side when fitting paper to the canvas.
pub const DEFAULT_MARGIN: f64 = 0.01;

/// Smallest paper dimension used for scaling. Collapsed bounds are clamped to this.
pub const MIN_PAPER_DIMENSION: f64 = 1.0;

/// Uniform scale plus centering offset that fits a paper rectangle into a target area.
///
/// A mapper is derived from scratch for each redraw or export and never cached,
/// so screen coordinates are always a pure function of the paper point,
/// the bounds and the target size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    /// Paper-space origin (`Xmin`, `Ymin`).
    pub origin: Point,
    /// Pixels (or page units) per paper unit.
    pub scale: f64,
    /// Offset of the mapped paper rectangle inside the target.
    pub offset: Point,
    /// Paper dimensions after the degenerate clamp.
    pub paper_size: Size,
}

impl CoordinateMapper {
    /// Fit `bounds` into `target` with the default 1% margin.
    pub fn new(bounds: &PaperBounds, target: Size) -> Self {
        Self::with_margin(bounds, target, DEFAULT_MARGIN)
    }

    /// Fit `bounds` into `target`, leaving `margin` (a fraction) free on every side.
    pub fn with_margin(bounds: &PaperBounds, target: Size, margin: f64) -> Self {
        let pw = bounds.width().max(MIN_PAPER_DIMENSION);
        let ph = bounds.height().max(MIN_PAPER_DIMENSION);

        let usable_w = target.width * (1.0 - 2.0 * margin);
        let usable_h = target.height * (1.0 - 2.0 * margin);
        let scale = (usable_w / pw).min(usable_h / ph);

        let offset = Point::new(
            (target.width - pw * scale) / 2.0,
            (target.height - ph * scale) / 2.0,
        );

        Self {
            origin: Point::new(bounds.x_min, bounds.y_min),
            scale,
            offset,
            paper_size: Size::new(pw, ph),
        }
    }

    /// Map a paper-space point into the target.
    pub fn to_screen(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.origin.x) * self.scale + self.offset.x,
            (point.y - self.origin.y) * self.scale + self.offset.y,
        )
    }

    /// Inverse of [`to_screen`](Self::to_screen).
    pub fn to_paper(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.offset.x) / self.scale + self.origin.x,
            (screen.y - self.offset.y) / self.scale + self.origin.y,
        )
    }
}

/// Normalize a paper-space point to roughly `0..1` against the bounds.
///
/// Each axis is divided by the clamped dimension, matching the telemetry wire contract.
pub fn normalize(point: Point, bounds: &PaperBounds) -> (f32, f32) {
    let nx = (point.x - bounds.x_min) / bounds.width().max(MIN_PAPER_DIMENSION);
    let ny = (point.y - bounds.y_min) / bounds.height().max(MIN_PAPER_DIMENSION);
    (nx as f32, ny as f32)
}
