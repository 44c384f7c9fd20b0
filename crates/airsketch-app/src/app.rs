//! Main application state and event dispatch.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::{Instant, SystemTime};

use airsketch_core::pen::{ChooserRelay, DeviceInfo, PenEventSender, PenTransport, TransportError};
use airsketch_core::settings::{KeyValueStore, Settings};
use airsketch_core::telemetry::{DEFAULT_HOST, UdpSink};
use airsketch_core::{
    BoundsPolicy, ConnectionChange, ConnectionEvent, DotOutcome, PenConnectionState, PenEvent, PenEventQueue,
    Session, StatusLine, TelemetryForwarder,
};
use airsketch_render::export::{self, ExportError};
use airsketch_render::{InkStyle, Pixmap, RenderError, RenderPipeline};
use kurbo::Size;
use thiserror::Error;

use crate::ui::{UiAction, UiState};

/// Application errors. Only construction can fail; everything after that is
/// reported through the status line.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Canvas error: {0}")]
    Canvas(#[from] RenderError),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    /// Canvas container size in CSS pixels.
    pub container: Size,
    /// Canvas pixels per CSS pixel.
    pub device_pixel_ratio: f64,
    pub bounds_policy: BoundsPolicy,
    pub display_style: InkStyle,
    pub telemetry_host: String,
    /// Where exports are written.
    pub export_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "airsketch".to_string(),
            container: Size::new(592.0, 840.0),
            device_pixel_ratio: 2.0,
            bounds_policy: BoundsPolicy::DefaultBox,
            display_style: InkStyle::display(),
            telemetry_host: DEFAULT_HOST.to_string(),
            export_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Canvas backing-store size in pixels.
    pub fn canvas_size(&self) -> Size {
        self.container * self.device_pixel_ratio
    }
}

/// The application: one session, its display surface and the collaborators around it.
pub struct App {
    config: AppConfig,
    session: Session,
    canvas: Pixmap,
    pipeline: RenderPipeline,
    telemetry: TelemetryForwarder,
    settings: Settings,
    store: Box<dyn KeyValueStore>,
    status: StatusLine,
    events: PenEventQueue,
    chooser: ChooserRelay,
    transport: Option<Box<dyn PenTransport>>,
    connect_enabled: bool,
}

impl App {
    pub fn new(config: AppConfig, store: Box<dyn KeyValueStore>) -> Result<Self, AppError> {
        let settings = Settings::load(store.as_ref());
        let canvas = Pixmap::from_size(config.canvas_size())?;
        let pipeline = RenderPipeline::new(config.display_style);
        let session = Session::new(config.bounds_policy);
        log::info!(
            "Starting {} session {} ({} bounds, canvas {}x{})",
            config.title,
            session.id(),
            config.bounds_policy.name(),
            canvas.width(),
            canvas.height()
        );

        let mut app = Self {
            config,
            session,
            canvas,
            pipeline,
            telemetry: TelemetryForwarder::disabled(),
            settings,
            store,
            status: StatusLine::default(),
            events: PenEventQueue::new(),
            chooser: ChooserRelay::new(),
            transport: None,
            connect_enabled: true,
        };
        app.rebuild_telemetry();
        app.redraw();
        Ok(app)
    }

    /// Attach the pen SDK's scanning side.
    pub fn with_transport(mut self, transport: Box<dyn PenTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn telemetry(&self) -> &TelemetryForwarder {
        &self.telemetry
    }

    /// Handle for the pen SDK to push events into.
    pub fn pen_sender(&self) -> PenEventSender {
        self.events.sender()
    }

    pub fn status(&self) -> &str {
        self.status.text()
    }

    /// Snapshot for the shell to draw its controls from.
    pub fn ui_state(&self) -> UiState {
        let viewport = self.session.viewport();
        UiState {
            status: self.status.text().to_string(),
            connection: self.session.connection(),
            connect_enabled: self.connect_enabled,
            zoom_label: viewport.zoom_label(),
            bounds_locked: self.session.is_bounds_locked(),
            canvas_transform: viewport.css_transform(),
            canvas_transition: viewport.css_transition(),
            chooser: self.chooser.pending().map(|prompt| prompt.labels()),
            telemetry_enabled: self.settings.telemetry_enabled,
            telemetry_port: self.settings.telemetry_port,
        }
    }

    /// Offer the remembered pen on startup. The scan still goes through the chooser.
    pub fn startup(&mut self) {
        if !self.settings.should_prompt_reconnect() {
            return;
        }
        let device = self.settings.last_device.clone().unwrap_or_default();
        log::info!("Attempting to reconnect to last pen: {device}");
        self.status.set("Reconnecting...");

        let result = match self.transport.as_mut() {
            Some(transport) if transport.is_available() => transport.scan(),
            _ => Err(TransportError::Unavailable),
        };
        if let Err(e) = result {
            log::warn!("Reconnect failed: {e}");
            self.status.set("Disconnected");
        }
    }

    /// Run one iteration of the event loop: drain pen events and expire status text.
    pub fn tick(&mut self, now: Instant) {
        for event in self.events.poll_events() {
            self.handle_event(event);
        }
        self.status.tick(now);
    }

    pub fn handle_event(&mut self, event: PenEvent) {
        match event {
            PenEvent::Dot { device_id, dot } => {
                let outcome = self.session.handle_raw_dot(&device_id, dot);
                self.after_dot(outcome);
            }
            PenEvent::Connection(event) => self.handle_connection(&event),
        }
    }

    fn after_dot(&mut self, outcome: DotOutcome) {
        let DotOutcome::Accepted { dot, .. } = outcome else {
            return;
        };
        // Bounds are already updated, so both the repaint and the
        // normalized telemetry use the new mapping.
        self.pipeline.apply(&mut self.canvas, &self.session, outcome.repaint());
        self.telemetry.forward(dot.position, dot.kind, self.session.bounds());
    }

    fn handle_connection(&mut self, event: &ConnectionEvent) {
        match self.session.handle_connection(event) {
            ConnectionChange::Connected { device_id } => {
                self.status.set("Connected");
                self.connect_enabled = false;
                self.settings.remember_device(&device_id);
                self.save_settings();
                // The open stroke was abandoned.
                self.redraw();
            }
            ConnectionChange::State(PenConnectionState::Disconnected) => {
                self.status.set("Disconnected");
                self.connect_enabled = true;
            }
            ConnectionChange::State(PenConnectionState::Connecting) => {
                self.status.set("Connecting...");
            }
            ConnectionChange::State(PenConnectionState::Connected) | ConnectionChange::Ignored => {}
        }
    }

    /// Ask the user to pick a pen. Called from the scanning side; the receiver
    /// yields the chosen id, or an empty string on cancel.
    pub fn request_device(&mut self, devices: Vec<DeviceInfo>) -> Receiver<String> {
        self.chooser.request(devices)
    }

    pub fn dispatch(&mut self, action: UiAction) {
        match action {
            UiAction::Connect => self.connect(),
            UiAction::ZoomIn => self.session.viewport_mut().zoom_in(),
            UiAction::ZoomOut => self.session.viewport_mut().zoom_out(),
            UiAction::Wheel(delta_y) => self.session.viewport_mut().wheel(delta_y),
            UiAction::DragStart(cursor) => self.session.viewport_mut().begin_drag(cursor),
            UiAction::DragMove(cursor) => self.session.viewport_mut().drag_to(cursor),
            UiAction::DragEnd => self.session.viewport_mut().end_drag(),
            UiAction::Rotate => {
                let rotation = self.session.viewport_mut().rotate();
                log::debug!("Canvas rotation: {}deg", rotation.degrees());
            }
            UiAction::ResetView => {
                self.session.viewport_mut().reset();
                log::debug!("Canvas view reset");
            }
            UiAction::ToggleLock => {
                self.session.toggle_bounds_lock();
            }
            UiAction::Clear => self.clear(),
            UiAction::ExportPng => {
                let result = self.export_png(SystemTime::now());
                self.report_export(result);
            }
            UiAction::ExportEps => {
                let result = self.export_eps(SystemTime::now());
                self.report_export(result);
            }
            UiAction::Resize(container) => self.resize(container),
            UiAction::SetTelemetryEnabled(enabled) => self.set_telemetry_enabled(enabled),
            UiAction::SetTelemetryPort(input) => self.set_telemetry_port(&input),
            UiAction::ChooseDevice(index) => {
                if let Some(prompt) = self.chooser.take_prompt() {
                    prompt.choose(index);
                }
            }
            UiAction::CancelChooser => {
                if let Some(prompt) = self.chooser.take_prompt() {
                    log::info!("Device selection cancelled");
                    prompt.cancel();
                }
            }
        }
    }

    fn connect(&mut self) {
        let Some(transport) = self.transport.as_mut().filter(|t| t.is_available()) else {
            log::warn!("Connect requested without a Bluetooth transport");
            self.status.set("Bluetooth unavailable");
            return;
        };
        if let Err(e) = transport.scan() {
            log::error!("Connection failed: {e}");
            self.status.set(format!("Connection failed: {e}"));
        }
    }

    /// Empty the session and repaint the blank canvas.
    pub fn clear(&mut self) {
        self.session.clear();
        self.redraw();
    }

    /// Adopt a new container size and re-map everything onto it.
    pub fn resize(&mut self, container: Size) {
        let previous = self.config.container;
        self.config.container = container;
        match Pixmap::from_size(self.config.canvas_size()) {
            Ok(canvas) => {
                self.canvas = canvas;
                self.redraw();
            }
            Err(e) => {
                log::warn!("Ignoring resize: {e}");
                self.config.container = previous;
            }
        }
    }

    /// Full redraw of the display canvas.
    pub fn redraw(&mut self) {
        self.pipeline.redraw_session(&mut self.canvas, &self.session);
    }

    /// Write a PNG of the committed strokes at the current canvas size.
    pub fn export_png(&self, now: SystemTime) -> Result<PathBuf, ExportError> {
        let bytes = export::export_png(self.session.history(), self.session.bounds(), self.canvas_size())?;
        let name = export::export_file_name("png", now);
        export::write_export(&self.config.export_dir, &name, &bytes)
    }

    /// Write an EPS page of the committed strokes.
    pub fn export_eps(&self, now: SystemTime) -> Result<PathBuf, ExportError> {
        let eps = export::export_eps(self.session.history(), self.session.bounds(), &export::iso_timestamp(now))?;
        let name = export::export_file_name("eps", now);
        export::write_export(&self.config.export_dir, &name, eps.as_bytes())
    }

    fn canvas_size(&self) -> Size {
        Size::new(f64::from(self.canvas.width()), f64::from(self.canvas.height()))
    }

    fn report_export(&mut self, result: Result<PathBuf, ExportError>) {
        let now = Instant::now();
        match result {
            Ok(path) => self.status.flash(format!("Saved {}", file_label(&path)), now),
            Err(e) => {
                log::error!("Export failed: {e}");
                self.status.flash(format!("Export failed: {e}"), now);
            }
        }
    }

    pub fn set_telemetry_enabled(&mut self, enabled: bool) {
        self.settings.telemetry_enabled = enabled;
        self.save_settings();
        self.rebuild_telemetry();
    }

    /// Apply a port typed by the user. Invalid input keeps the previous port.
    pub fn set_telemetry_port(&mut self, input: &str) {
        match self.settings.set_telemetry_port(input) {
            Ok(port) => {
                log::info!("Telemetry port set to {port}");
                self.save_settings();
                self.rebuild_telemetry();
            }
            Err(e) => {
                log::warn!("Rejected telemetry port {input:?}: {e}");
                self.status.flash(e.to_string(), Instant::now());
            }
        }
    }

    /// Point the forwarder at the configured target, or switch it off.
    fn rebuild_telemetry(&mut self) {
        if !self.settings.telemetry_enabled {
            self.telemetry.set_enabled(false);
            return;
        }
        match UdpSink::new(&self.config.telemetry_host, self.settings.telemetry_port) {
            Ok(sink) => {
                log::info!("Telemetry forwarding to {}", sink.target());
                self.telemetry.replace_sink(Box::new(sink));
                self.telemetry.set_enabled(true);
            }
            Err(e) => {
                log::warn!("Telemetry disabled: {e}");
                self.telemetry.set_enabled(false);
            }
        }
    }

    fn save_settings(&mut self) {
        if let Err(e) = self.settings.save(self.store.as_ref()) {
            log::warn!("Failed to save settings: {e}");
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
