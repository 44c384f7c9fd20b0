//! Control surface exposed to the host shell.
//!
//! The shell draws buttons and the status line from a [`UiState`] snapshot
//! and reports clicks back as [`UiAction`]s.

use airsketch_core::PenConnectionState;
use kurbo::{Point, Size};

/// Actions that can be triggered from the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    /// Scan for a pen and connect.
    Connect,
    ZoomIn,
    ZoomOut,
    /// Mouse wheel over the canvas, positive delta zooms out.
    Wheel(f64),
    /// Pointer pressed on the canvas container.
    DragStart(Point),
    DragMove(Point),
    DragEnd,
    /// Rotate the display by a quarter turn.
    Rotate,
    /// Back to 100%, no pan, no rotation.
    ResetView,
    /// Freeze or release the paper bounds.
    ToggleLock,
    /// Drop every stroke and start over.
    Clear,
    ExportPng,
    ExportEps,
    /// Container resized, in CSS pixels.
    Resize(Size),
    SetTelemetryEnabled(bool),
    /// Port typed into the settings form, not yet validated.
    SetTelemetryPort(String),
    /// Pick a device from the open chooser by index.
    ChooseDevice(usize),
    CancelChooser,
}

/// Everything the shell needs to draw its controls.
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub status: String,
    pub connection: PenConnectionState,
    /// Whether the connect button accepts clicks.
    pub connect_enabled: bool,
    /// Zoom percentage label, e.g. `"120%"`.
    pub zoom_label: String,
    pub bounds_locked: bool,
    /// CSS transform for the canvas element.
    pub canvas_transform: String,
    pub canvas_transition: &'static str,
    /// Lines of the open device chooser, if any.
    pub chooser: Option<Vec<String>>,
    pub telemetry_enabled: bool,
    pub telemetry_port: u16,
}

impl UiState {
    /// Label of the lock button.
    pub fn lock_label(&self) -> &'static str {
        if self.bounds_locked { "Unlock Bounds" } else { "Lock Bounds" }
    }
}
