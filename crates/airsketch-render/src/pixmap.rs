//! Software RGBA surface.
//!
//! Shapes are rasterized by distance: each pixel center gets coverage
//! `clamp(r + 0.5 - d, 0, 1)` where `d` is its distance to the shape's
//! skeleton. A polyline accumulates the maximum coverage over its segments
//! before compositing, so joins are not painted twice.

use kurbo::{Point, Rect, Size};
use peniko::Color;

use crate::surface::{RenderError, RenderResult, Surface};

/// Largest accepted width or height, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// An owned RGBA8 pixel buffer, row-major, non-premultiplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// Create a transparent pixmap.
    ///
    /// Each side must be in `1..=MAX_DIMENSION`.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let invalid = || RenderError::InvalidSize {
            width: f64::from(width),
            height: f64::from(height),
        };
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(invalid());
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(invalid)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Create a pixmap covering `size`, rounded to whole pixels.
    pub fn from_size(size: Size) -> RenderResult<Self> {
        let invalid = RenderError::InvalidSize {
            width: size.width,
            height: size.height,
        };
        if !(size.width.is_finite() && size.height.is_finite()) {
            return Err(invalid);
        }
        let width = size.width.round();
        let height = size.height.round();
        let max = f64::from(MAX_DIMENSION);
        if width < 1.0 || height < 1.0 || width > max || height > max {
            return Err(invalid);
        }
        Self::new(width as u32, height as u32)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGBA of one pixel, or `None` outside the pixmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Pixel range covered by `rect`, clipped to the pixmap.
    fn pixel_span(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let x0 = rect.x0.floor().max(0.0);
        let y0 = rect.y0.floor().max(0.0);
        let x1 = rect.x1.ceil().min(f64::from(self.width));
        let y1 = rect.y1.ceil().min(f64::from(self.height));
        if !(x0 < x1 && y0 < y1) {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    fn blend(&mut self, x: u32, y: u32, color: [u8; 4], coverage: f32) {
        let alpha = coverage * f32::from(color[3]) / 255.0;
        if alpha <= 0.0 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let dst_a = f32::from(self.data[i + 3]) / 255.0;
        let out_a = alpha + dst_a * (1.0 - alpha);
        for c in 0..3 {
            let src = f32::from(color[c]) / 255.0;
            let dst = f32::from(self.data[i + c]) / 255.0;
            let out = if out_a > 0.0 {
                (src * alpha + dst * dst_a * (1.0 - alpha)) / out_a
            } else {
                0.0
            };
            self.data[i + c] = to_u8(out);
        }
        self.data[i + 3] = to_u8(out_a);
    }
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn rgba(color: Color) -> [u8; 4] {
    let c = color.to_rgba8();
    [c.r, c.g, c.b, c.a]
}

fn coverage(radius: f64, distance: f64) -> f32 {
    (radius + 0.5 - distance).clamp(0.0, 1.0) as f32
}

/// Distance from `p` to the segment `a-b`.
fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq < f64::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

impl Surface for Pixmap {
    fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    fn clear(&mut self, color: Color) {
        let [r, g, b, a] = rgba(color);
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[r, g, b, a]);
        }
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        let reach = radius + 1.0;
        let rect = Rect::new(center.x - reach, center.y - reach, center.x + reach, center.y + reach);
        let Some((x0, y0, x1, y1)) = self.pixel_span(rect) else {
            return;
        };
        let color = rgba(color);
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                self.blend(x, y, color, coverage(radius, p.distance(center)));
            }
        }
    }

    fn stroke_polyline(&mut self, points: &[Point], width: f64, color: Color) {
        if points.len() < 2 {
            return;
        }
        let radius = width / 2.0;
        let reach = radius + 1.0;

        let first = points[0];
        let bbox = points
            .iter()
            .fold(Rect::from_points(first, first), |r, p| r.union_pt(*p))
            .inflate(reach, reach);
        let Some((x0, y0, x1, y1)) = self.pixel_span(bbox) else {
            return;
        };

        let span_w = (x1 - x0) as usize;
        let mut mask = vec![0.0f32; span_w * (y1 - y0) as usize];

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let seg = Rect::from_points(a, b).inflate(reach, reach);
            let Some((sx0, sy0, sx1, sy1)) = self.pixel_span(seg) else {
                continue;
            };
            for y in sy0..sy1 {
                for x in sx0..sx1 {
                    let p = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                    let cov = coverage(radius, segment_distance(p, a, b));
                    let slot = &mut mask[(y - y0) as usize * span_w + (x - x0) as usize];
                    if cov > *slot {
                        *slot = cov;
                    }
                }
            }
        }

        let color = rgba(color);
        for y in y0..y1 {
            for x in x0..x1 {
                let cov = mask[(y - y0) as usize * span_w + (x - x0) as usize];
                if cov > 0.0 {
                    self.blend(x, y, color, cov);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white() -> Color {
        Color::from_rgba8(255, 255, 255, 255)
    }

    fn black() -> Color {
        Color::from_rgba8(0, 0, 0, 255)
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(Pixmap::new(0, 10).is_err());
        assert!(Pixmap::from_size(Size::new(0.2, 10.0)).is_err());
        assert!(Pixmap::from_size(Size::new(f64::NAN, 10.0)).is_err());
        assert_eq!(Pixmap::from_size(Size::new(10.4, 9.6)).unwrap().height(), 10);
    }

    #[test]
    fn test_oversized_rejected() {
        assert!(Pixmap::new(MAX_DIMENSION + 1, 10).is_err());
        assert!(Pixmap::new(u32::MAX, u32::MAX).is_err());
        assert!(matches!(
            Pixmap::from_size(Size::new(1e9, 1e9)),
            Err(RenderError::InvalidSize { .. })
        ));
        assert_eq!(Pixmap::new(MAX_DIMENSION, 1).unwrap().width(), MAX_DIMENSION);
    }

    #[test]
    fn test_clear() {
        let mut pixmap = Pixmap::new(4, 3).unwrap();
        pixmap.clear(white());
        assert!(pixmap.data().iter().all(|&b| b == 255));
    }

    #[test]
    fn test_horizontal_line() {
        let mut pixmap = Pixmap::new(20, 20).unwrap();
        pixmap.clear(black());
        pixmap.stroke_polyline(&[Point::new(2.0, 10.0), Point::new(18.0, 10.0)], 4.0, white());

        assert_eq!(pixmap.pixel(10, 9), Some([255, 255, 255, 255]));
        assert_eq!(pixmap.pixel(10, 2), Some([0, 0, 0, 255]));
        assert_eq!(pixmap.pixel(10, 17), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_single_point_polyline_draws_nothing() {
        let mut pixmap = Pixmap::new(10, 10).unwrap();
        pixmap.stroke_polyline(&[Point::new(5.0, 5.0)], 4.0, white());
        assert!(pixmap.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_circle() {
        let mut pixmap = Pixmap::new(20, 20).unwrap();
        pixmap.clear(black());
        pixmap.fill_circle(Point::new(10.0, 10.0), 3.0, white());

        assert_eq!(pixmap.pixel(10, 10), Some([255, 255, 255, 255]));
        assert_eq!(pixmap.pixel(0, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_joins_are_not_double_blended() {
        let half = Color::from_rgba8(255, 255, 255, 128);
        let mut pixmap = Pixmap::new(30, 30).unwrap();
        pixmap.clear(black());
        pixmap.stroke_polyline(
            &[Point::new(5.0, 15.0), Point::new(15.0, 15.0), Point::new(25.0, 15.0)],
            4.0,
            half,
        );

        // The joint pixel and a mid-segment pixel blend exactly once.
        assert_eq!(pixmap.pixel(15, 14), pixmap.pixel(9, 14));
    }

    #[test]
    fn test_offscreen_drawing_is_clipped() {
        let mut pixmap = Pixmap::new(10, 10).unwrap();
        pixmap.stroke_polyline(&[Point::new(-50.0, -50.0), Point::new(-40.0, -40.0)], 2.0, white());
        pixmap.fill_circle(Point::new(100.0, 100.0), 5.0, white());
        assert!(pixmap.data().iter().all(|&b| b == 0));
    }
}
