//! Typed events emitted by an event source.

use chrono::{DateTime, Local};

/// A message delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Local>,
}

impl InboundMessage {
    /// Stamp a message with the current local time.
    pub fn now(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Local::now(),
        }
    }

    /// Arrival time as `HH:MM:SS`.
    pub fn timestamp(&self) -> String {
        self.received_at.format("%H:%M:%S").to_string()
    }
}

/// Outcome of one filter in a SUBACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Granted at the given QoS level.
    Granted(u8),
    Rejected,
}

/// Events flowing from the transport to the monitor, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The broker accepted the handshake.
    Connected { session_present: bool },
    /// The broker acknowledged a subscribe request.
    Subscribed { pkid: u16, grants: Vec<Grant> },
    Message(InboundMessage),
    /// The transport failed; `reason` is the library's description.
    Disconnected { reason: String },
}
