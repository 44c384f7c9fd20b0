//! Redraw pipeline.
//!
//! Screen coordinates are never stored. Each draw call derives a fresh
//! [`CoordinateMapper`] from the current bounds and the surface size.

use airsketch_core::geometry::CoordinateMapper;
use airsketch_core::{PaperBounds, Repaint, Session, Stroke};
use kurbo::Point;

use crate::surface::{InkStyle, Surface};

/// Draws stroke history onto a [`Surface`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderPipeline {
    style: InkStyle,
}

impl RenderPipeline {
    pub fn new(style: InkStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &InkStyle {
        &self.style
    }

    /// Clear the surface and draw every stroke through the current mapping.
    ///
    /// Output depends only on the strokes, the bounds and the surface size,
    /// so two calls in a row leave identical pixels.
    pub fn redraw_all<'a, S, I>(&self, surface: &mut S, bounds: &PaperBounds, strokes: I)
    where
        S: Surface + ?Sized,
        I: IntoIterator<Item = &'a Stroke>,
    {
        surface.clear(self.style.background);
        let mapper = CoordinateMapper::new(bounds, surface.size());
        let width = self.style.line_width(surface.size());

        let mut count = 0usize;
        for stroke in strokes {
            self.draw_stroke(surface, &mapper, stroke, width);
            count += 1;
        }
        log::trace!("Redrew {count} stroke(s) at scale {:.3}", mapper.scale);
    }

    /// Full redraw of a session: committed strokes, then the open one.
    pub fn redraw_session<S: Surface + ?Sized>(&self, surface: &mut S, session: &Session) {
        self.redraw_all(surface, session.bounds(), session.recorder().all_strokes());
    }

    /// Bring the surface up to date after one accepted sample.
    pub fn apply<S: Surface + ?Sized>(&self, surface: &mut S, session: &Session, repaint: Repaint) {
        let mapper = CoordinateMapper::new(session.bounds(), surface.size());
        let width = self.style.line_width(surface.size());

        match repaint {
            Repaint::Full => self.redraw_session(surface, session),
            Repaint::Dot(point) => {
                surface.fill_circle(mapper.to_screen(point), width / 2.0, self.style.ink);
            }
            Repaint::Segment { from, to } => {
                let segment = [mapper.to_screen(from), mapper.to_screen(to)];
                surface.stroke_polyline(&segment, width, self.style.ink);
            }
            Repaint::None => {}
        }
    }

    fn draw_stroke<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        mapper: &CoordinateMapper,
        stroke: &Stroke,
        width: f64,
    ) {
        match stroke.points() {
            [] => {}
            [only] => surface.fill_circle(mapper.to_screen(*only), width / 2.0, self.style.ink),
            points => {
                let screen: Vec<Point> = points.iter().map(|p| mapper.to_screen(*p)).collect();
                surface.stroke_polyline(&screen, width, self.style.ink);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixmap::Pixmap;
    use airsketch_core::DotKind;
    use kurbo::Size;
    use peniko::Color;

    /// Records draw calls instead of rasterizing.
    #[derive(Default)]
    struct CallLog {
        calls: Vec<String>,
    }

    impl Surface for CallLog {
        fn size(&self) -> Size {
            Size::new(600.0, 600.0)
        }

        fn clear(&mut self, _color: Color) {
            self.calls.push("clear".to_string());
        }

        fn fill_circle(&mut self, center: Point, radius: f64, _color: Color) {
            self.calls.push(format!("circle {:.2} {:.2} r{:.2}", center.x, center.y, radius));
        }

        fn stroke_polyline(&mut self, points: &[Point], width: f64, _color: Color) {
            let pts: Vec<String> = points.iter().map(|p| format!("{:.2},{:.2}", p.x, p.y)).collect();
            self.calls.push(format!("line [{}] w{:.2}", pts.join(" "), width));
        }
    }

    fn sample_session() -> Session {
        let mut session = Session::default();
        session.push(DotKind::Down, 100.0, 100.0);
        session.push(DotKind::Move, 110.0, 120.0);
        session.push(DotKind::Move, 140.0, 60.0);
        session.push(DotKind::Up, 150.0, 150.0);
        session.push(DotKind::Down, 120.0, 130.0);
        session.push(DotKind::Move, 121.0, 131.0);
        session
    }

    #[test]
    fn test_redraw_is_idempotent() {
        let session = sample_session();
        let pipeline = RenderPipeline::default();

        let mut pixmap = Pixmap::new(320, 240).unwrap();
        pipeline.redraw_session(&mut pixmap, &session);
        let first = pixmap.data().to_vec();
        pipeline.redraw_session(&mut pixmap, &session);

        assert_eq!(pixmap.data(), &first[..]);
        assert!(first.chunks_exact(4).any(|px| px[0] > 0));
    }

    #[test]
    fn test_redraw_maps_through_current_bounds() {
        let mut session = Session::default();
        session.push(DotKind::Down, 50.0, 50.0);
        session.push(DotKind::Up, 60.0, 50.0);
        let pipeline = RenderPipeline::default();

        let mut log = CallLog::default();
        pipeline.redraw_session(&mut log, &session);

        // Bounds are the 60x90 box centered on (50, 50): x 20..80, y 5..95.
        let mapper = CoordinateMapper::new(session.bounds(), Size::new(600.0, 600.0));
        let a = mapper.to_screen(Point::new(50.0, 50.0));
        let b = mapper.to_screen(Point::new(60.0, 50.0));
        assert_eq!(log.calls[0], "clear");
        assert_eq!(
            log.calls[1],
            format!("line [{:.2},{:.2} {:.2},{:.2}] w1.20", a.x, a.y, b.x, b.y)
        );
        assert!((a.x - 300.0).abs() < 1e-9);
        assert!((a.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_point_stroke_draws_dot() {
        let mut session = Session::default();
        session.push(DotKind::Down, 50.0, 50.0);
        let pipeline = RenderPipeline::default();

        let mut log = CallLog::default();
        pipeline.redraw_session(&mut log, &session);
        assert_eq!(log.calls, vec!["clear".to_string(), "circle 300.00 300.00 r0.60".to_string()]);
    }

    #[test]
    fn test_incremental_segment() {
        let mut session = Session::default();
        session.push(DotKind::Down, 50.0, 50.0);
        let outcome = session.push(DotKind::Move, 51.0, 50.0);
        let pipeline = RenderPipeline::default();

        let mut log = CallLog::default();
        pipeline.apply(&mut log, &session, outcome.repaint());
        assert_eq!(log.calls.len(), 1);
        assert!(log.calls[0].starts_with("line [300.00,300.00 "));
    }

    #[test]
    fn test_incremental_matches_full_redraw() {
        let pipeline = RenderPipeline::default();
        let mut session = Session::default();
        let mut incremental = Pixmap::new(200, 300).unwrap();
        pipeline.redraw_session(&mut incremental, &session);

        let samples = [
            (DotKind::Down, 50.0, 50.0),
            (DotKind::Move, 52.0, 55.0),
            (DotKind::Move, 55.0, 62.0),
            (DotKind::Up, 58.0, 64.0),
        ];
        for (kind, x, y) in samples {
            let outcome = session.push(kind, x, y);
            pipeline.apply(&mut incremental, &session, outcome.repaint());
        }

        let mut full = Pixmap::new(200, 300).unwrap();
        pipeline.redraw_session(&mut full, &session);

        let differing = incremental
            .data()
            .chunks_exact(4)
            .zip(full.data().chunks_exact(4))
            .filter(|(a, b)| a != b)
            .count();
        // Segment-by-segment blending differs from whole-polyline blending only at joint edges.
        assert!(differing < 40, "{differing} pixels differ");
    }

    #[test]
    fn test_empty_session_only_clears() {
        let session = Session::default();
        let mut log = CallLog::default();
        RenderPipeline::default().redraw_session(&mut log, &session);
        assert_eq!(log.calls, vec!["clear".to_string()]);
    }
}
