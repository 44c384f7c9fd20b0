//! Paper bounds tracking.
//!
//! The tracker owns the paper-space rectangle that gets fitted onto the canvas.
//! While unlocked it seeds itself from the first usable point and then grows
//! outward whenever a point lands outside. It never shrinks until [`BoundsTracker::reset`].

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Distance added beyond an out-of-bounds point when an edge is pushed outward.
pub const EXPANSION_PADDING: f64 = 2.0;

/// Paper-space rectangle mapped onto the visible canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PaperBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PaperBounds {
    /// Build bounds from the minimum corner and a size.
    pub fn from_origin_size(x_min: f64, y_min: f64, width: f64, height: f64) -> Self {
        Self {
            x_min,
            x_max: x_min + width,
            y_min,
            y_max: y_min + height,
        }
    }

    /// Build bounds of the given size centered on `center`.
    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self {
            x_min: center.x - width / 2.0,
            x_max: center.x + width / 2.0,
            y_min: center.y - height / 2.0,
            y_max: center.y + height / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Check whether the point lies inside (edges included).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x_min && point.x <= self.x_max && point.y >= self.y_min && point.y <= self.y_max
    }
}

/// How the first usable point seeds the dynamic bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// A 60×90 box, the drawing area of a portrait notepad.
    #[default]
    DefaultBox,
    /// A 0.69×0.59 rectangle matching a physical sheet in device units.
    RealWorldPaper,
}

impl BoundsPolicy {
    /// Width and height of the seed rectangle.
    pub fn initial_size(self) -> (f64, f64) {
        match self {
            BoundsPolicy::DefaultBox => (60.0, 90.0),
            BoundsPolicy::RealWorldPaper => (0.69, 0.59),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BoundsPolicy::DefaultBox => "default-box",
            BoundsPolicy::RealWorldPaper => "real-world-paper",
        }
    }
}

/// What a call to [`BoundsTracker::update`] did to the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsChange {
    Unchanged,
    /// First point placed the initial rectangle.
    Seeded,
    /// At least one edge moved outward.
    Expanded,
}

impl BoundsChange {
    /// Whether every previously drawn point has to be re-mapped.
    pub fn needs_full_redraw(self) -> bool {
        !matches!(self, BoundsChange::Unchanged)
    }
}

/// Maintains [`PaperBounds`] in either locked or dynamic mode.
#[derive(Debug, Clone, Default)]
pub struct BoundsTracker {
    bounds: PaperBounds,
    policy: BoundsPolicy,
    seeded: bool,
    locked: bool,
}

impl BoundsTracker {
    pub fn new(policy: BoundsPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn bounds(&self) -> &PaperBounds {
        &self.bounds
    }

    pub fn policy(&self) -> BoundsPolicy {
        self.policy
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Feed an accepted point.
    ///
    /// Locked bounds ignore every point. Points with an exact zero coordinate
    /// are recorded elsewhere but never move the bounds.
    pub fn update(&mut self, point: Point) -> BoundsChange {
        if self.locked || point.x == 0.0 || point.y == 0.0 {
            return BoundsChange::Unchanged;
        }

        if !self.seeded {
            let (width, height) = self.policy.initial_size();
            self.bounds = PaperBounds::centered(point, width, height);
            self.seeded = true;
            log::debug!("Initialized paper bounds ({}): {:?}", self.policy.name(), self.bounds);
            return BoundsChange::Seeded;
        }

        let mut changed = false;
        if point.x < self.bounds.x_min {
            self.bounds.x_min = point.x - EXPANSION_PADDING;
            changed = true;
        }
        if point.y < self.bounds.y_min {
            self.bounds.y_min = point.y - EXPANSION_PADDING;
            changed = true;
        }
        if point.x > self.bounds.x_max {
            self.bounds.x_max = point.x + EXPANSION_PADDING;
            changed = true;
        }
        if point.y > self.bounds.y_max {
            self.bounds.y_max = point.y + EXPANSION_PADDING;
            changed = true;
        }

        if changed {
            log::debug!("Bounds expanded to {:?}", self.bounds);
            BoundsChange::Expanded
        } else {
            BoundsChange::Unchanged
        }
    }

    /// Flip between locked and dynamic mode. The current bounds are kept either way.
    pub fn toggle_lock(&mut self) -> bool {
        self.locked = !self.locked;
        log::info!(
            "Bounds {} at {:?}",
            if self.locked { "locked" } else { "unlocked" },
            self.bounds
        );
        self.locked
    }

    /// Return to the unseeded, unlocked state.
    pub fn reset(&mut self) {
        self.bounds = PaperBounds::default();
        self.seeded = false;
        self.locked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_first_point_seeds_default_box() {
        let mut tracker = BoundsTracker::new(BoundsPolicy::DefaultBox);
        let change = tracker.update(Point::new(10.0, 20.0));

        assert_eq!(change, BoundsChange::Seeded);
        let b = tracker.bounds();
        assert!((b.x_min - -20.0).abs() < EPS);
        assert!((b.x_max - 40.0).abs() < EPS);
        assert!((b.y_min - -25.0).abs() < EPS);
        assert!((b.y_max - 65.0).abs() < EPS);
        assert!((b.width() - 60.0).abs() < EPS);
        assert!((b.height() - 90.0).abs() < EPS);
    }

    #[test]
    fn test_real_world_paper_policy() {
        let mut tracker = BoundsTracker::new(BoundsPolicy::RealWorldPaper);
        tracker.update(Point::new(5.0, 5.0));

        let b = tracker.bounds();
        assert!((b.width() - 0.69).abs() < EPS);
        assert!((b.height() - 0.59).abs() < EPS);
        assert!(((b.x_min + b.x_max) / 2.0 - 5.0).abs() < EPS);
    }

    #[test]
    fn test_expansion_adds_padding() {
        let mut tracker = BoundsTracker::new(BoundsPolicy::DefaultBox);
        tracker.update(Point::new(10.0, 20.0));

        assert_eq!(tracker.update(Point::new(50.0, 20.0)), BoundsChange::Expanded);
        assert!((tracker.bounds().x_max - 52.0).abs() < EPS);
        assert!((tracker.bounds().width() - 72.0).abs() < EPS);

        assert_eq!(tracker.update(Point::new(-30.0, -40.0)), BoundsChange::Expanded);
        assert!((tracker.bounds().x_min - -32.0).abs() < EPS);
        assert!((tracker.bounds().y_min - -42.0).abs() < EPS);
    }

    #[test]
    fn test_inside_point_is_unchanged() {
        let mut tracker = BoundsTracker::new(BoundsPolicy::DefaultBox);
        tracker.update(Point::new(10.0, 20.0));
        assert_eq!(tracker.update(Point::new(12.0, 30.0)), BoundsChange::Unchanged);
    }

    #[test]
    fn test_bounds_are_monotonic() {
        let mut tracker = BoundsTracker::new(BoundsPolicy::DefaultBox);
        let points = [
            (100.0, 100.0),
            (40.0, 180.0),
            (220.0, 90.0),
            (150.0, 20.0),
            (60.0, 60.0),
            (300.0, 300.0),
            (5.0, 250.0),
            (120.0, 120.0),
        ];

        let mut prev: Option<PaperBounds> = None;
        for (x, y) in points {
            tracker.update(Point::new(x, y));
            let b = *tracker.bounds();
            if let Some(p) = prev {
                assert!(b.x_min <= p.x_min);
                assert!(b.x_max >= p.x_max);
                assert!(b.y_min <= p.y_min);
                assert!(b.y_max >= p.y_max);
            }
            assert!(b.contains(Point::new(x, y)));
            prev = Some(b);
        }
    }

    #[test]
    fn test_locked_bounds_ignore_points() {
        let mut tracker = BoundsTracker::new(BoundsPolicy::DefaultBox);
        tracker.update(Point::new(10.0, 20.0));
        let before = *tracker.bounds();

        assert!(tracker.toggle_lock());
        assert_eq!(tracker.update(Point::new(500.0, 500.0)), BoundsChange::Unchanged);
        assert_eq!(*tracker.bounds(), before);

        assert!(!tracker.toggle_lock());
        assert_eq!(*tracker.bounds(), before);
    }

    #[test]
    fn test_zero_coordinate_does_not_move_bounds() {
        let mut tracker = BoundsTracker::new(BoundsPolicy::DefaultBox);
        assert_eq!(tracker.update(Point::new(0.0, 50.0)), BoundsChange::Unchanged);
        assert!(!tracker.is_seeded());
    }

    #[test]
    fn test_reset() {
        let mut tracker = BoundsTracker::new(BoundsPolicy::DefaultBox);
        tracker.update(Point::new(10.0, 20.0));
        tracker.toggle_lock();
        tracker.reset();

        assert!(!tracker.is_seeded());
        assert!(!tracker.is_locked());
        assert_eq!(*tracker.bounds(), PaperBounds::default());
        assert_eq!(tracker.update(Point::new(10.0, 20.0)), BoundsChange::Seeded);
    }
}
