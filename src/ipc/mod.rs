//! Typed message bus between windows and the event loop
//!
//! Every inbound message is wrapped in an [`Envelope`] naming the window that
//! sent it, so the receiver can drop traffic from windows that no longer exist.
//! Channels are unbounded tokio mpsc queues: FIFO per channel, no ordering
//! across channels, fire-and-forget on the sending side.

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

mod messages;
pub use messages::{ContentEvent, ContentMessage, ControlEvent, ControlMessage, WindowEvent};

/// Identity of a platform window, never reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A message tagged with its sending window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<T> {
    pub source: WindowId,
    pub payload: T,
}

/// Sending half of one named channel
#[derive(Debug)]
pub struct Channel<T> {
    name: &'static str,
    tx: UnboundedSender<Envelope<T>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<T: fmt::Debug> Channel<T> {
    /// Fire-and-forget send; a closed receiver only gets logged
    pub fn send(&self, source: WindowId, payload: T) {
        debug!(channel = self.name, source = %source, payload = ?payload, "Bus send");
        if self.tx.send(Envelope { source, payload }).is_err() {
            debug!(channel = self.name, "Bus receiver gone, message dropped");
        }
    }
}

/// Senders handed to the platform for everything windows report back
#[derive(Debug, Clone)]
pub struct BusSenders {
    pub window: Channel<WindowEvent>,
    pub content: Channel<ContentEvent>,
    pub control: Channel<ControlEvent>,
}

/// Receivers drained by the event loop
#[derive(Debug)]
pub struct BusReceivers {
    pub window: UnboundedReceiver<Envelope<WindowEvent>>,
    pub content: UnboundedReceiver<Envelope<ContentEvent>>,
    pub control: UnboundedReceiver<Envelope<ControlEvent>>,
}

pub fn bus() -> (BusSenders, BusReceivers) {
    let (window_tx, window_rx) = mpsc::unbounded_channel();
    let (content_tx, content_rx) = mpsc::unbounded_channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    (
        BusSenders {
            window: Channel { name: "windowEvent", tx: window_tx },
            content: Channel { name: "hotZoneEnter", tx: content_tx },
            control: Channel { name: "requestExitFullscreen", tx: control_tx },
        },
        BusReceivers {
            window: window_rx,
            content: content_rx,
            control: control_rx,
        },
    )
}

/// Serialize a message for a JSON-speaking isolation boundary
pub fn to_wire<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).context("Failed to serialize message to JSON")
}

/// Deserialize a message received from a JSON-speaking isolation boundary
pub fn from_wire<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).context("Failed to deserialize message from JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_names_channel() {
        let json = to_wire(&ContentMessage::FullscreenStateChanged(true)).unwrap();
        assert_eq!(json, r#"{"channel":"fullscreenStateChanged","payload":true}"#);

        let json = to_wire(&ContentEvent::HotZoneEnter).unwrap();
        assert_eq!(json, r#"{"channel":"hotZoneEnter"}"#);

        let json = to_wire(&ControlMessage::OverlayVisibility(false)).unwrap();
        assert_eq!(json, r#"{"channel":"overlayVisibility","payload":false}"#);
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let result: Result<ControlEvent> = from_wire(r#"{"channel":"openDevTools"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_channel_is_fifo() {
        let (senders, mut receivers) = bus();
        senders.window.send(WindowId(1), WindowEvent::EnteredFullscreen);
        senders.window.send(WindowId(1), WindowEvent::LeftFullscreen);

        assert_eq!(receivers.window.try_recv().unwrap().payload, WindowEvent::EnteredFullscreen);
        assert_eq!(receivers.window.try_recv().unwrap().payload, WindowEvent::LeftFullscreen);
        assert!(receivers.window.try_recv().is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped_is_silent() {
        let (senders, receivers) = bus();
        drop(receivers);
        senders.control.send(WindowId(7), ControlEvent::RequestExitFullscreen);
    }
}
