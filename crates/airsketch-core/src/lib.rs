//! airsketch Core Library
//!
//! Platform-agnostic model and logic for drawing with a Bluetooth smart pen:
//! stroke reconstruction, paper bounds, coordinate mapping and the pen session.

pub mod bounds;
pub mod geometry;
pub mod pen;
pub mod session;
pub mod settings;
pub mod status;
pub mod stroke;
pub mod telemetry;
pub mod viewport;

pub use bounds::{BoundsChange, BoundsPolicy, BoundsTracker, PaperBounds};
pub use geometry::CoordinateMapper;
pub use pen::{ConnectionEvent, Dot, PenConnectionState, PenEvent, PenEventQueue, RawDot};
pub use session::{ConnectionChange, DotOutcome, Repaint, Session};
pub use settings::{KeyValueStore, Settings, SettingsError};
pub use status::StatusLine;
pub use stroke::{DotKind, Stroke, StrokeHistory, StrokeRecorder};
pub use telemetry::{TelemetryError, TelemetryForwarder};
pub use viewport::{Rotation, Viewport};
