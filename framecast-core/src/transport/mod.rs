//! Frame transmission
//!
//! The pipeline talks to the peer through a [`TransportChannel`]: a
//! long-lived, externally owned duplex channel exposing its connected state
//! and a fire-and-forget emit. Frames are emitted at most once and only while
//! the channel reports itself connected; anything else is dropped.

mod protocol;
mod receiver;
mod socket;

pub use protocol::WireMessage;
pub use receiver::{FrameReceiver, ReceivedFrame};
pub use socket::SocketChannel;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

use crate::encode::Frame;

/// Duplex connection to the peer
pub trait TransportChannel: Send + Sync {
    /// Whether the channel is connected right now
    fn is_connected(&self) -> bool;

    /// Send an event without waiting for delivery or acknowledgment
    fn emit(&self, event: &str, payload: serde_json::Value);
}

/// Payload of a frame event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramePayload {
    /// `data:image/jpeg;base64,...`
    pub frame: String,
}

/// Outcome of a transmit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitOutcome {
    /// Handed to the channel
    Sent,
    /// Channel disconnected; frame discarded
    Dropped,
}

/// Emits encoded frames under a fixed event name
#[derive(Debug)]
pub struct Transmitter {
    event_name: String,
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
}

impl Transmitter {
    /// Create a transmitter for the given event name
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
        }
    }

    /// Event name frames are emitted under
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Emit a frame if the channel is connected at this instant
    ///
    /// Disconnected frames are discarded; nothing is queued for later.
    pub fn transmit(&self, channel: &dyn TransportChannel, frame: &Frame) -> TransmitOutcome {
        if !channel.is_connected() {
            let dropped = self.frames_dropped.fetch_add(1, Ordering::Relaxed) + 1;
            trace!("Channel disconnected, dropping frame ({} dropped)", dropped);
            return TransmitOutcome::Dropped;
        }

        let payload = FramePayload {
            frame: frame.to_data_uri(),
        };
        let value = match serde_json::to_value(&payload) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize frame payload: {}", e);
                self.frames_dropped.fetch_add(1, Ordering::Relaxed);
                return TransmitOutcome::Dropped;
            }
        };

        channel.emit(&self.event_name, value);
        let sent = self.frames_sent.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "Emitted {} #{} ({}x{}, {} bytes)",
            self.event_name,
            sent,
            frame.width,
            frame.height,
            frame.data.len()
        );
        TransmitOutcome::Sent
    }

    /// Number of frames handed to the channel
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Number of frames discarded because the channel was disconnected
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }
}
