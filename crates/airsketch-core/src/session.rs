//! Drawing session state.
//!
//! A [`Session`] is the document context for one run of the application: the
//! stroke history, the paper bounds and the viewport. It is created at startup,
//! reset by "Clear" and dropped at exit.

use kurbo::Point;
use uuid::Uuid;

use crate::bounds::{BoundsChange, BoundsPolicy, BoundsTracker, PaperBounds};
use crate::pen::{ConnectionEvent, Dot, PenConnectionState, RawDot};
use crate::stroke::{DotKind, StrokeHistory, StrokeRecorder, StrokeStep, is_noise};
use crate::viewport::Viewport;

/// What the display needs after an accepted sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Repaint {
    /// The mapping changed; every stroke must be re-mapped.
    Full,
    /// A pen-down dot at this paper point.
    Dot(Point),
    /// A new segment between two paper points.
    Segment { from: Point, to: Point },
    None,
}

/// Result of feeding one sample to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DotOutcome {
    /// Noise near the device origin, or a malformed sample.
    Dropped,
    Accepted {
        dot: Dot,
        bounds: BoundsChange,
        step: StrokeStep,
    },
}

impl DotOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DotOutcome::Accepted { .. })
    }

    /// Drawing work implied by this outcome.
    pub fn repaint(&self) -> Repaint {
        match *self {
            DotOutcome::Dropped => Repaint::None,
            DotOutcome::Accepted { bounds, .. } if bounds.needs_full_redraw() => Repaint::Full,
            DotOutcome::Accepted { step, .. } => match step {
                StrokeStep::Started(point) => Repaint::Dot(point),
                StrokeStep::Extended { from, to } | StrokeStep::Finished { from, to } => {
                    Repaint::Segment { from, to }
                }
                StrokeStep::Ignored => Repaint::None,
            },
        }
    }
}

/// Result of a connection message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionChange {
    /// State moved; nothing else to do.
    State(PenConnectionState),
    /// A device finished connecting and should be remembered.
    Connected { device_id: String },
    Ignored,
}

/// The document context shared by the recorder, bounds and viewport.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    bounds: BoundsTracker,
    recorder: StrokeRecorder,
    viewport: Viewport,
    connection: PenConnectionState,
    device_id: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(BoundsPolicy::default())
    }
}

impl Session {
    pub fn new(policy: BoundsPolicy) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            bounds: BoundsTracker::new(policy),
            recorder: StrokeRecorder::new(),
            viewport: Viewport::new(),
            connection: PenConnectionState::Disconnected,
            device_id: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bounds(&self) -> &PaperBounds {
        self.bounds.bounds()
    }

    pub fn bounds_tracker(&self) -> &BoundsTracker {
        &self.bounds
    }

    pub fn recorder(&self) -> &StrokeRecorder {
        &self.recorder
    }

    pub fn history(&self) -> &StrokeHistory {
        self.recorder.history()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn connection(&self) -> PenConnectionState {
        self.connection
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Validate and apply a raw SDK sample.
    pub fn handle_raw_dot(&mut self, device_id: &str, raw: RawDot) -> DotOutcome {
        log::trace!("Raw dot from {device_id}: x={} y={} type={}", raw.x, raw.y, raw.dot_type);
        match Dot::try_from(raw) {
            Ok(dot) => self.handle_dot(dot),
            Err(e) => {
                log::warn!("Rejected dot from {device_id}: {e}");
                DotOutcome::Dropped
            }
        }
    }

    /// Apply a validated sample: noise filter, then bounds, then the stroke recorder.
    pub fn handle_dot(&mut self, dot: Dot) -> DotOutcome {
        if is_noise(dot.position) {
            log::trace!("Ignoring near-zero dot");
            return DotOutcome::Dropped;
        }

        let bounds = self.bounds.update(dot.position);
        let step = self.recorder.apply(dot.kind, dot.position);
        DotOutcome::Accepted { dot, bounds, step }
    }

    /// Convenience for tests and replays.
    pub fn push(&mut self, kind: DotKind, x: f64, y: f64) -> DotOutcome {
        self.handle_dot(Dot {
            position: Point::new(x, y),
            kind,
        })
    }

    pub fn handle_connection(&mut self, event: &ConnectionEvent) -> ConnectionChange {
        match event {
            ConnectionEvent::Connecting => {
                self.connection = PenConnectionState::Connecting;
                ConnectionChange::State(self.connection)
            }
            ConnectionEvent::Connected { device_id } => {
                self.connection = PenConnectionState::Connected;
                self.device_id = Some(device_id.clone());
                // A stroke that spans a reconnect cannot be trusted.
                self.recorder.abandon_current();
                log::info!("Pen connected: {device_id}");
                ConnectionChange::Connected {
                    device_id: device_id.clone(),
                }
            }
            ConnectionEvent::Disconnected => {
                self.connection = PenConnectionState::Disconnected;
                log::info!("Pen disconnected");
                ConnectionChange::State(self.connection)
            }
            ConnectionEvent::SettingInfo => ConnectionChange::Ignored,
        }
    }

    /// Toggle the bounds lock. Returns the new lock state.
    pub fn toggle_bounds_lock(&mut self) -> bool {
        self.bounds.toggle_lock()
    }

    pub fn is_bounds_locked(&self) -> bool {
        self.bounds.is_locked()
    }

    /// Drop all strokes and return bounds to their unseeded, unlocked state.
    ///
    /// Viewport and connection are left alone.
    pub fn clear(&mut self) {
        self.recorder.clear();
        self.bounds.reset();
        log::info!("Canvas cleared");
    }
}
