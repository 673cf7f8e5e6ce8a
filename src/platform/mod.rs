//! Window host collaborator
//!
//! The shell never renders web content itself. A platform creates session
//! windows (a web-content view bound to one storage partition) and the overlay
//! control window, and reports what happens to them on the bus it was given.

pub mod external;
pub mod headless;

use anyhow::Result;

use crate::ipc::{ContentMessage, ControlMessage, WindowId};

/// Window geometry in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Construction parameters for a session window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionWindowSpec {
    pub target_url: String,
    pub user_agent: String,
    /// Storage partition; cookies, cache and login state never leave it
    pub partition: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Construction parameters for the fullscreen control window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayWindowSpec {
    pub bounds: Rect,
    pub parent: WindowId,
    pub label: String,
    pub frameless: bool,
    pub always_on_top: bool,
    pub focusable: bool,
    pub skip_taskbar: bool,
    pub initially_visible: bool,
}

pub trait Platform {
    type Session: SessionWindow;
    type Overlay: OverlayWindow;

    fn create_session_window(&mut self, spec: &SessionWindowSpec) -> Result<Self::Session>;

    fn create_overlay_window(&mut self, spec: &OverlayWindowSpec) -> Result<Self::Overlay>;

    /// Hand a URL to the desktop's default handler
    fn open_external(&mut self, url: &str) -> Result<()>;
}

/// Handle to a live session window. Calls after `destroy` are ignored.
pub trait SessionWindow {
    fn id(&self) -> WindowId;

    fn show(&mut self);

    fn hide(&mut self);

    fn is_visible(&self) -> bool;

    fn is_fullscreen(&self) -> bool;

    /// Request a fullscreen change; the platform confirms with
    /// `EnteredFullscreen`/`LeftFullscreen` on the window channel
    fn set_fullscreen(&mut self, fullscreen: bool);

    fn bounds(&self) -> Rect;

    /// Fire-and-forget message into the window's content context
    fn post(&mut self, msg: ContentMessage);

    fn destroy(&mut self);
}

/// Handle to the overlay control window
pub trait OverlayWindow {
    fn id(&self) -> WindowId;

    fn post(&mut self, msg: ControlMessage);

    fn destroy(&mut self);
}
