//! Message kinds carried across the window isolation boundaries
//!
//! Each enum is one named channel. Payloads are serde types so a web-view
//! backend can carry them as JSON strings.

use serde::{Deserialize, Serialize};

/// Events raised by a session window's web-content view
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    /// A link asked for a new top-level browsing context
    ExternalNavigationRequested(String),

    EnteredFullscreen,

    LeftFullscreen,

    MinimizeRequested,

    CloseRequested,
}

/// Window manager → session content context (`fullscreenStateChanged`)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "channel", content = "payload", rename_all = "camelCase")]
pub enum ContentMessage {
    FullscreenStateChanged(bool),
}

/// Session content context → overlay coordinator (`hotZoneEnter`)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "channel", rename_all = "camelCase")]
pub enum ContentEvent {
    HotZoneEnter,
}

/// Overlay coordinator → control window (`overlayVisibility`)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "channel", content = "payload", rename_all = "camelCase")]
pub enum ControlMessage {
    OverlayVisibility(bool),
}

/// Control window → window manager (`requestExitFullscreen`)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "channel", rename_all = "camelCase")]
pub enum ControlEvent {
    RequestExitFullscreen,
}
