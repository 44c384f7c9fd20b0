//! Pen device boundary.
//!
//! The pen SDK owns the Bluetooth transport and packet decoding. It pushes
//! already-decoded events into a [`PenEventQueue`], and the application drains
//! the queue once per tick. Device selection goes through a [`ChooserRelay`]
//! that carries the user's answer back to whoever asked for it.

use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

use kurbo::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stroke::DotKind;

/// Pen transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Bluetooth unavailable")]
    Unavailable,
    #[error("{0}")]
    ConnectionFailed(String),
    #[error("device selection cancelled")]
    Cancelled,
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PenConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// A single pen-tip sample as delivered by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDot {
    pub x: f64,
    pub y: f64,
    /// 0 = down, 1 = move, 2 = up.
    pub dot_type: u8,
}

/// A validated pen-tip sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot {
    pub position: Point,
    pub kind: DotKind,
}

impl TryFrom<RawDot> for Dot {
    type Error = PenEventError;

    fn try_from(raw: RawDot) -> Result<Self, Self::Error> {
        if !raw.x.is_finite() || !raw.y.is_finite() {
            return Err(PenEventError::NonFinite { x: raw.x, y: raw.y });
        }
        let kind = DotKind::try_from(raw.dot_type).map_err(PenEventError::UnknownDotType)?;
        Ok(Dot {
            position: Point::new(raw.x, raw.y),
            kind,
        })
    }
}

/// Rejected pen samples.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PenEventError {
    #[error("unknown dot type {0}")]
    UnknownDotType(u8),
    #[error("non-finite dot coordinates ({x}, {y})")]
    NonFinite { x: f64, y: f64 },
}

/// Connection-level messages from the SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionEvent {
    Connecting,
    Connected { device_id: String },
    Disconnected,
    /// Battery and other device settings. Not shown.
    SettingInfo,
}

/// Everything the pen SDK can push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PenEvent {
    Connection(ConnectionEvent),
    Dot { device_id: String, dot: RawDot },
}

/// Cloneable handle the SDK side uses to push events.
#[derive(Debug, Clone)]
pub struct PenEventSender {
    tx: Sender<PenEvent>,
}

impl PenEventSender {
    /// Push an event. Returns false once the queue has been dropped.
    pub fn send(&self, event: PenEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn connection(&self, event: ConnectionEvent) -> bool {
        self.send(PenEvent::Connection(event))
    }

    pub fn dot(&self, device_id: &str, x: f64, y: f64, dot_type: u8) -> bool {
        self.send(PenEvent::Dot {
            device_id: device_id.to_string(),
            dot: RawDot { x, y, dot_type },
        })
    }
}

/// Receiving side of the pen event channel, drained once per tick.
#[derive(Debug)]
pub struct PenEventQueue {
    rx: Receiver<PenEvent>,
    tx: Sender<PenEvent>,
}

impl Default for PenEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PenEventQueue {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { rx, tx }
    }

    /// Get a sender for the event source.
    pub fn sender(&self) -> PenEventSender {
        PenEventSender { tx: self.tx.clone() }
    }

    /// Take every event queued so far, in arrival order.
    pub fn poll_events(&self) -> Vec<PenEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}

/// Scanning side of the pen SDK.
pub trait PenTransport {
    /// Whether the environment has a usable Bluetooth stack at all.
    fn is_available(&self) -> bool;

    /// Start a scan. The SDK reports progress through the event queue and asks
    /// the user to pick a device through the chooser relay.
    fn scan(&mut self) -> Result<(), TransportError>;
}

/// A device offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub device_name: Option<String>,
}

impl DeviceInfo {
    pub fn label(&self) -> String {
        match self.device_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Unknown Device ({})", self.device_id),
        }
    }
}

/// Text shown when the scan found nothing.
pub const NO_DEVICES_MESSAGE: &str = "No devices found. Ensure pen is in pairing mode.";

/// Answer from the chooser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelection {
    Selected(String),
    Cancelled,
}

impl DeviceSelection {
    /// Wire form expected by the scanning side: the id, or an empty string on cancel.
    pub fn into_reply(self) -> String {
        match self {
            DeviceSelection::Selected(id) => id,
            DeviceSelection::Cancelled => String::new(),
        }
    }

    pub fn from_reply(reply: &str) -> Self {
        if reply.is_empty() {
            DeviceSelection::Cancelled
        } else {
            DeviceSelection::Selected(reply.to_string())
        }
    }
}

/// A pending device choice shown to the user.
#[derive(Debug)]
pub struct ChooserPrompt {
    devices: Vec<DeviceInfo>,
    reply: Sender<String>,
}

impl ChooserPrompt {
    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    /// Lines to present. An empty scan yields the pairing hint only.
    pub fn labels(&self) -> Vec<String> {
        if self.devices.is_empty() {
            vec![NO_DEVICES_MESSAGE.to_string()]
        } else {
            self.devices.iter().map(DeviceInfo::label).collect()
        }
    }

    /// Pick the device at `index`. Out-of-range indices count as a cancel.
    pub fn choose(self, index: usize) -> DeviceSelection {
        let selection = match self.devices.get(index) {
            Some(device) => {
                log::info!("Selected device: {}", device.device_id);
                DeviceSelection::Selected(device.device_id.clone())
            }
            None => DeviceSelection::Cancelled,
        };
        self.respond(selection.clone());
        selection
    }

    pub fn cancel(self) {
        self.respond(DeviceSelection::Cancelled);
    }

    fn respond(self, selection: DeviceSelection) {
        if self.reply.send(selection.into_reply()).is_err() {
            log::debug!("Device chooser reply dropped: requester went away");
        }
    }
}

/// Relays device lists from the scanning side to the UI, one request at a time.
#[derive(Debug, Default)]
pub struct ChooserRelay {
    pending: Option<ChooserPrompt>,
}

impl ChooserRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the user to pick one of `devices`. The receiver yields exactly one reply.
    ///
    /// A request that is still open is cancelled first.
    pub fn request(&mut self, devices: Vec<DeviceInfo>) -> Receiver<String> {
        log::debug!("Device list received: {} device(s)", devices.len());
        if let Some(previous) = self.pending.take() {
            previous.cancel();
        }
        let (reply, rx) = channel();
        self.pending = Some(ChooserPrompt { devices, reply });
        rx
    }

    pub fn pending(&self) -> Option<&ChooserPrompt> {
        self.pending.as_ref()
    }

    /// Take the open prompt so the UI can answer it.
    pub fn take_prompt(&mut self) -> Option<ChooserPrompt> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, name: Option<&str>) -> DeviceInfo {
        DeviceInfo {
            device_id: id.to_string(),
            device_name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_raw_dot_validation() {
        let ok = Dot::try_from(RawDot { x: 3.0, y: 4.0, dot_type: 1 }).unwrap();
        assert_eq!(ok.kind, DotKind::Move);
        assert_eq!(ok.position, Point::new(3.0, 4.0));

        let bad = Dot::try_from(RawDot { x: 3.0, y: 4.0, dot_type: 9 });
        assert_eq!(bad, Err(PenEventError::UnknownDotType(9)));

        let nan = Dot::try_from(RawDot { x: f64::NAN, y: 4.0, dot_type: 0 });
        assert!(matches!(nan, Err(PenEventError::NonFinite { .. })));
    }

    #[test]
    fn test_queue_preserves_order() {
        let queue = PenEventQueue::new();
        let sender = queue.sender();
        sender.connection(ConnectionEvent::Connecting);
        sender.dot("pen", 10.0, 10.0, 0);
        sender.dot("pen", 11.0, 11.0, 2);

        let events = queue.poll_events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], PenEvent::Connection(ConnectionEvent::Connecting));
        assert!(matches!(events[2], PenEvent::Dot { dot: RawDot { dot_type: 2, .. }, .. }));
        assert!(queue.poll_events().is_empty());
    }

    #[test]
    fn test_event_json_shape() {
        let json = r#"{"type":"dot","device_id":"AA:BB","dot":{"x":12.5,"y":40.0,"dot_type":1}}"#;
        let event: PenEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            PenEvent::Dot {
                device_id: "AA:BB".to_string(),
                dot: RawDot { x: 12.5, y: 40.0, dot_type: 1 },
            }
        );

        let json = r#"{"type":"connection","state":"connected","device_id":"AA:BB"}"#;
        let event: PenEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            PenEvent::Connection(ConnectionEvent::Connected { device_id: "AA:BB".to_string() })
        );
    }

    #[test]
    fn test_device_labels() {
        assert_eq!(device("id-1", Some("Smartpen")).label(), "Smartpen");
        assert_eq!(device("id-2", None).label(), "Unknown Device (id-2)");
        assert_eq!(device("id-3", Some("")).label(), "Unknown Device (id-3)");
    }

    #[test]
    fn test_chooser_selection_reply() {
        let mut relay = ChooserRelay::new();
        let rx = relay.request(vec![device("a", Some("A")), device("b", None)]);

        let prompt = relay.take_prompt().unwrap();
        assert_eq!(prompt.labels(), vec!["A".to_string(), "Unknown Device (b)".to_string()]);
        assert_eq!(prompt.choose(1), DeviceSelection::Selected("b".to_string()));
        assert_eq!(rx.recv().unwrap(), "b");
    }

    #[test]
    fn test_chooser_empty_list_and_cancel() {
        let mut relay = ChooserRelay::new();
        let rx = relay.request(Vec::new());

        let prompt = relay.take_prompt().unwrap();
        assert_eq!(prompt.labels(), vec![NO_DEVICES_MESSAGE.to_string()]);
        prompt.cancel();
        assert_eq!(DeviceSelection::from_reply(&rx.recv().unwrap()), DeviceSelection::Cancelled);
    }

    #[test]
    fn test_new_request_cancels_pending() {
        let mut relay = ChooserRelay::new();
        let first = relay.request(vec![device("a", None)]);
        let _second = relay.request(vec![device("b", None)]);

        assert_eq!(first.recv().unwrap(), "");
        assert_eq!(relay.pending().map(|p| p.devices().len()), Some(1));
    }
}
