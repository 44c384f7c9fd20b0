//! Viewport module for display-only zoom/pan/rotation.
//!
//! The viewport transforms the container that holds the canvas. It never
//! touches stroke data, bounds, or the coordinates used for export.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Multiplier applied by the zoom buttons.
pub const BUTTON_ZOOM_STEP: f64 = 1.2;
/// Multiplier applied per wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

/// Quarter-turn rotation of the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Next rotation clockwise.
    pub fn next(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    pub fn radians(self) -> f64 {
        f64::from(self.degrees()).to_radians()
    }
}

/// An in-progress drag gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    start_cursor: Point,
    start_pan: Vec2,
}

/// Viewport tracks the container transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// Current pan offset in screen pixels.
    pub pan: Vec2,
    /// Current zoom level (1.0 = 100%).
    pub zoom: f64,
    /// Current quarter-turn rotation.
    pub rotation: Rotation,
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
    #[serde(skip)]
    drag: Option<Drag>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            rotation: Rotation::Deg0,
            min_zoom: 0.2,
            max_zoom: 5.0,
            drag: None,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        log::debug!("Canvas zoom: {:.2} Pan: {:.0} {:.0}", self.zoom, self.pan.x, self.pan.y);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * BUTTON_ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / BUTTON_ZOOM_STEP);
    }

    /// Apply a wheel notch. Negative `delta_y` (wheel up) zooms in.
    pub fn wheel(&mut self, delta_y: f64) {
        if delta_y < 0.0 {
            self.set_zoom(self.zoom * WHEEL_ZOOM_STEP);
        } else {
            self.set_zoom(self.zoom / WHEEL_ZOOM_STEP);
        }
    }

    pub fn rotate(&mut self) -> Rotation {
        self.rotation = self.rotation.next();
        self.rotation
    }

    /// Begin a pan drag at the given cursor position.
    pub fn begin_drag(&mut self, cursor: Point) {
        self.drag = Some(Drag {
            start_cursor: cursor,
            start_pan: self.pan,
        });
    }

    /// Update the pan from the cursor. Ignored when no drag is active.
    pub fn drag_to(&mut self, cursor: Point) {
        if let Some(drag) = self.drag {
            self.pan = drag.start_pan + (cursor - drag.start_cursor);
        }
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Zoom shown next to the controls, e.g. `"120%"`.
    pub fn zoom_label(&self) -> String {
        format!("{}%", (self.zoom * 100.0).round())
    }

    /// Get the affine transform applied to the container.
    ///
    /// Scale and rotation pivot on the container center, then the pan is applied.
    pub fn transform(&self, container: Size) -> Affine {
        let center = Vec2::new(container.width / 2.0, container.height / 2.0);
        Affine::translate(self.pan + center)
            * Affine::scale(self.zoom)
            * Affine::rotate(self.rotation.radians())
            * Affine::translate(-center)
    }

    /// Map a point on the untransformed container to where it is displayed.
    pub fn container_to_display(&self, point: Point, container: Size) -> Point {
        self.transform(container) * point
    }

    /// Same transform as [`transform`](Self::transform), in CSS syntax.
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({}) rotate({}deg)",
            self.pan.x,
            self.pan.y,
            self.zoom,
            self.rotation.degrees()
        )
    }

    /// Transitions are animated except while dragging.
    pub fn css_transition(&self) -> &'static str {
        if self.is_dragging() { "none" } else { "transform 0.2s ease" }
    }

    /// Reset zoom, pan and rotation. Zoom limits are kept.
    pub fn reset(&mut self) {
        *self = Self {
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport() {
        let viewport = Viewport::new();
        assert_eq!(viewport.pan, Vec2::ZERO);
        assert!((viewport.zoom - 1.0).abs() < f64::EPSILON);
        assert_eq!(viewport.rotation, Rotation::Deg0);
        assert_eq!(viewport.zoom_label(), "100%");
    }

    #[test]
    fn test_zoom_clamp() {
        let mut viewport = Viewport::new();
        for _ in 0..50 {
            viewport.zoom_in();
        }
        assert!((viewport.zoom - 5.0).abs() < f64::EPSILON);

        for _ in 0..50 {
            viewport.wheel(1.0);
        }
        assert!((viewport.zoom - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_steps() {
        let mut viewport = Viewport::new();
        viewport.zoom_in();
        assert!((viewport.zoom - 1.2).abs() < 1e-12);
        assert_eq!(viewport.zoom_label(), "120%");

        viewport.zoom_out();
        viewport.wheel(-3.0);
        assert!((viewport.zoom - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_cycles() {
        let mut viewport = Viewport::new();
        let degrees: Vec<u16> = (0..4).map(|_| viewport.rotate().degrees()).collect();
        assert_eq!(degrees, vec![90, 180, 270, 0]);
    }

    #[test]
    fn test_drag_is_anchored_at_start() {
        let mut viewport = Viewport::new();
        viewport.pan = Vec2::new(10.0, 10.0);

        viewport.begin_drag(Point::new(100.0, 100.0));
        viewport.drag_to(Point::new(120.0, 90.0));
        viewport.drag_to(Point::new(130.0, 95.0));
        assert_eq!(viewport.pan, Vec2::new(40.0, 5.0));
        assert_eq!(viewport.css_transition(), "none");

        viewport.end_drag();
        viewport.drag_to(Point::new(500.0, 500.0));
        assert_eq!(viewport.pan, Vec2::new(40.0, 5.0));
    }

    #[test]
    fn test_drag_without_begin_is_noop() {
        let mut viewport = Viewport::new();
        viewport.drag_to(Point::new(50.0, 50.0));
        assert_eq!(viewport.pan, Vec2::ZERO);
    }

    #[test]
    fn test_transform_pivots_on_center() {
        let mut viewport = Viewport::new();
        viewport.zoom = 2.0;
        viewport.rotation = Rotation::Deg90;
        let container = Size::new(200.0, 100.0);

        let center = viewport.container_to_display(Point::new(100.0, 50.0), container);
        assert!((center.x - 100.0).abs() < 1e-9);
        assert!((center.y - 50.0).abs() < 1e-9);

        // 10px right of center turns into 20px below center.
        let right = viewport.container_to_display(Point::new(110.0, 50.0), container);
        assert!((right.x - 100.0).abs() < 1e-9);
        assert!((right.y - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_css_transform() {
        let mut viewport = Viewport::new();
        viewport.pan = Vec2::new(12.0, -4.0);
        viewport.rotate();
        assert_eq!(viewport.css_transform(), "translate(12px, -4px) scale(1) rotate(90deg)");
    }
}
