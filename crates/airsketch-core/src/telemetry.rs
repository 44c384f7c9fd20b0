//! OSC telemetry stream.
//!
//! Each accepted sample can be mirrored to another application as an OSC
//! message `/pen ,ffi` carrying the normalized position and the dot type.
//! Sending is fire-and-forget: a failed send is logged and forgotten.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use kurbo::Point;
use rosc::{OscMessage, OscPacket, OscType};
use thiserror::Error;

use crate::bounds::PaperBounds;
use crate::geometry::normalize;
use crate::stroke::DotKind;

/// OSC address of every telemetry message.
pub const PEN_ADDRESS: &str = "/pen";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9000;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("OSC encoding failed: {0}")]
    Encode(String),
    #[error("Invalid target {0}")]
    InvalidTarget(String),
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can send a datagram to a fixed target.
pub trait DatagramSink {
    fn send(&self, payload: &[u8]) -> std::io::Result<usize>;
}

/// UDP sink bound to an ephemeral local port.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSink {
    pub fn new(host: &str, port: u16) -> Result<Self, TelemetryError> {
        let target = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TelemetryError::InvalidTarget(format!("{host}:{port}")))?;
        let bind_addr: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl DatagramSink for UdpSink {
    fn send(&self, payload: &[u8]) -> std::io::Result<usize> {
        self.socket.send_to(payload, self.target)
    }
}

/// Build the encoded `/pen` message for one sample.
pub fn encode_pen_message(nx: f32, ny: f32, kind: DotKind) -> Result<Vec<u8>, TelemetryError> {
    let packet = OscPacket::Message(OscMessage {
        addr: PEN_ADDRESS.to_string(),
        args: vec![OscType::Float(nx), OscType::Float(ny), OscType::Int(kind.code())],
    });
    rosc::encoder::encode(&packet).map_err(|e| TelemetryError::Encode(format!("{e:?}")))
}

/// Mirrors accepted samples to a datagram sink when enabled.
pub struct TelemetryForwarder {
    sink: Option<Box<dyn DatagramSink>>,
    enabled: bool,
    sent: u64,
    dropped: u64,
}

impl std::fmt::Debug for TelemetryForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryForwarder")
            .field("enabled", &self.enabled)
            .field("has_sink", &self.sink.is_some())
            .field("sent", &self.sent)
            .field("dropped", &self.dropped)
            .finish()
    }
}

impl Default for TelemetryForwarder {
    fn default() -> Self {
        Self::disabled()
    }
}

impl TelemetryForwarder {
    pub fn disabled() -> Self {
        Self {
            sink: None,
            enabled: false,
            sent: 0,
            dropped: 0,
        }
    }

    pub fn with_sink(sink: Box<dyn DatagramSink>) -> Self {
        Self {
            sink: Some(sink),
            enabled: true,
            sent: 0,
            dropped: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.sink.is_some()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn replace_sink(&mut self, sink: Box<dyn DatagramSink>) {
        self.sink = Some(sink);
    }

    /// Datagrams handed to the sink successfully.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Datagrams the sink refused.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Forward one accepted sample, normalized against the current bounds.
    pub fn forward(&mut self, point: Point, kind: DotKind, bounds: &PaperBounds) {
        if !self.enabled {
            return;
        }
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let (nx, ny) = normalize(point, bounds);
        let payload = match encode_pen_message(nx, ny, kind) {
            Ok(payload) => payload,
            Err(e) => {
                log::debug!("Telemetry encode failed: {e}");
                self.dropped += 1;
                return;
            }
        };

        match sink.send(&payload) {
            Ok(_) => self.sent += 1,
            Err(e) => {
                log::debug!("Telemetry datagram dropped: {e}");
                self.dropped += 1;
            }
        }
    }
}
