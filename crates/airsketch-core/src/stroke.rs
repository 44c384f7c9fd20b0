//! Strokes and the pen-phase state machine that builds them.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Samples at or below this value on both axes are sensor noise near the device origin.
pub const NOISE_THRESHOLD: f64 = 1.0;

/// Whether a sample sits in the noise corner of the device.
pub fn is_noise(point: Point) -> bool {
    point.x <= NOISE_THRESHOLD && point.y <= NOISE_THRESHOLD
}

/// Phase of a pen-tip sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DotKind {
    Down,
    Move,
    Up,
}

impl DotKind {
    /// Wire code used by the pen SDK and the telemetry stream.
    pub fn code(self) -> i32 {
        match self {
            DotKind::Down => 0,
            DotKind::Move => 1,
            DotKind::Up => 2,
        }
    }
}

impl TryFrom<u8> for DotKind {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(DotKind::Down),
            1 => Ok(DotKind::Move),
            2 => Ok(DotKind::Up),
            other => Err(other),
        }
    }
}

/// One continuous pen-down to pen-up motion, in paper space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    points: Vec<Point>,
}

impl Stroke {
    /// Open a stroke at its first point. Strokes are never empty.
    pub fn new(first: Point) -> Self {
        Self { points: vec![first] }
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }
}

/// Completed strokes in drawing order. Append-only apart from a full clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrokeHistory {
    strokes: Vec<Stroke>,
}

impl StrokeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stroke> {
        self.strokes.iter()
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    /// Total number of samples across all strokes.
    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Stroke::len).sum()
    }
}

/// Recorder phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PenPhase {
    #[default]
    Idle,
    Drawing,
}

/// Effect of one sample on the recorder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeStep {
    /// A new stroke was opened at this point.
    Started(Point),
    /// The open stroke grew by the segment `from -> to`.
    Extended { from: Point, to: Point },
    /// The open stroke received its last segment and moved into history.
    Finished { from: Point, to: Point },
    /// `Up` while idle.
    Ignored,
}

/// Builds strokes from a stream of pen samples.
///
/// Transitions:
/// - `Idle --Down--> Drawing` opens a stroke.
/// - `Idle --Move--> Drawing` also opens a stroke. Pens regularly drop the
///   `Down` packet, so a stray `Move` is treated as the start of a new stroke.
/// - `Drawing --Move--> Drawing` appends.
/// - `Drawing --Down--> Drawing` abandons the open stroke and opens a new one.
/// - `Drawing --Up--> Idle` appends, then commits the stroke to history.
/// - `Idle --Up-->` does nothing.
///
/// Noise filtering happens before the recorder sees a sample.
#[derive(Debug, Clone, Default)]
pub struct StrokeRecorder {
    history: StrokeHistory,
    current: Option<Stroke>,
}

impl StrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PenPhase {
        if self.current.is_some() {
            PenPhase::Drawing
        } else {
            PenPhase::Idle
        }
    }

    pub fn history(&self) -> &StrokeHistory {
        &self.history
    }

    /// The stroke currently being drawn, if any.
    pub fn current(&self) -> Option<&Stroke> {
        self.current.as_ref()
    }

    /// Committed strokes followed by the open one.
    pub fn all_strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.history.iter().chain(self.current.iter())
    }

    pub fn apply(&mut self, kind: DotKind, point: Point) -> StrokeStep {
        match kind {
            DotKind::Down => {
                self.current = Some(Stroke::new(point));
                StrokeStep::Started(point)
            }
            DotKind::Move => match self.current.as_mut() {
                Some(stroke) => {
                    let from = stroke.last().unwrap_or(point);
                    stroke.push(point);
                    StrokeStep::Extended { from, to: point }
                }
                None => {
                    log::debug!("Pen MOVE without DOWN, starting stroke at {point:?}");
                    self.current = Some(Stroke::new(point));
                    StrokeStep::Started(point)
                }
            },
            DotKind::Up => match self.current.take() {
                Some(mut stroke) => {
                    let from = stroke.last().unwrap_or(point);
                    stroke.push(point);
                    self.history.push(stroke);
                    log::debug!("Stroke saved. Total strokes: {}", self.history.len());
                    StrokeStep::Finished { from, to: point }
                }
                None => StrokeStep::Ignored,
            },
        }
    }

    /// Drop the open stroke without committing it.
    pub fn abandon_current(&mut self) {
        self.current = None;
    }

    /// Empty the history and drop the open stroke.
    pub fn clear(&mut self) {
        self.history.clear();
        self.current = None;
    }
}
