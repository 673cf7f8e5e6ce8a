//! In-process window host without a rendering backend
//!
//! Keeps a model of every window it was asked to create and reports events on
//! the bus exactly like a web-view backend would. Driver methods inject the
//! user-side input (pointer moves, close buttons, clicks) that a real window
//! system would deliver.

use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, info, warn};

use super::{external, OverlayWindow, OverlayWindowSpec, Platform, Rect, SessionWindow, SessionWindowSpec};
use crate::content::HotZoneDetector;
use crate::ipc::{
    self, BusSenders, ContentEvent, ContentMessage, ControlEvent, ControlMessage, WindowEvent,
    WindowId,
};

/// Simulated screen the fullscreen windows expand to
const SCREEN: Rect = Rect { x: 0, y: 0, width: 1920, height: 1080 };

/// Where windowed session windows are placed
const WINDOW_ORIGIN: (i32, i32) = (100, 100);

/// Operations the host performed, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    SessionCreated { id: WindowId, partition: String },
    SessionDestroyed(WindowId),
    OverlayCreated(WindowId),
    OverlayDestroyed(WindowId),
    ExternalOpened(String),
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub spec: SessionWindowSpec,
    pub bounds: Rect,
    pub visible: bool,
    pub fullscreen: bool,
    pub content: HotZoneDetector,
    pub received: Vec<ContentMessage>,
}

#[derive(Debug, Clone)]
pub struct OverlayRecord {
    pub spec: OverlayWindowSpec,
    pub visible: bool,
}

#[derive(Debug, Default)]
struct Host {
    next_id: u64,
    sessions: BTreeMap<WindowId, SessionRecord>,
    overlays: BTreeMap<WindowId, OverlayRecord>,
    log: Vec<HostOp>,
    /// Lowest live session count seen right after any session destroy
    min_live_after_destroy: Option<usize>,
    fail_session_creation: bool,
}

impl Host {
    fn allocate_id(&mut self) -> WindowId {
        self.next_id += 1;
        WindowId(self.next_id)
    }
}

#[derive(Clone)]
pub struct HeadlessPlatform {
    host: Rc<RefCell<Host>>,
    bus: BusSenders,
    hot_zone_px: f64,
    launch_external: bool,
}

impl HeadlessPlatform {
    pub fn new(bus: BusSenders, hot_zone_px: f64) -> Self {
        Self {
            host: Rc::new(RefCell::new(Host::default())),
            bus,
            hot_zone_px,
            launch_external: false,
        }
    }

    /// Also pass external links to the desktop opener instead of only recording them
    pub fn launching_external(mut self, launch: bool) -> Self {
        self.launch_external = launch;
        self
    }

    /// Make every following session window creation fail (or succeed again)
    #[cfg(test)]
    pub fn fail_session_creation(&self, fail: bool) {
        self.host.borrow_mut().fail_session_creation = fail;
    }

    // -- driver: input a window system would deliver --

    /// Pointer moved inside a session window's content
    pub fn pointer_move(&self, id: WindowId, y: f64) {
        let event = self
            .host
            .borrow()
            .sessions
            .get(&id)
            .and_then(|record| record.content.pointer_moved(y));
        if let Some(event) = event {
            self.forward_content_event(id, event);
        }
    }

    /// User pressed the window's close button
    pub fn request_close(&self, id: WindowId) {
        if self.host.borrow().sessions.contains_key(&id) {
            self.bus.window.send(id, WindowEvent::CloseRequested);
        }
    }

    /// User pressed the window's minimize button
    pub fn request_minimize(&self, id: WindowId) {
        if self.host.borrow().sessions.contains_key(&id) {
            self.bus.window.send(id, WindowEvent::MinimizeRequested);
        }
    }

    /// Content asked to open `url` in a new top-level browsing context
    pub fn click_external_link(&self, id: WindowId, url: &str) {
        if self.host.borrow().sessions.contains_key(&id) {
            self.bus
                .window
                .send(id, WindowEvent::ExternalNavigationRequested(url.to_string()));
        }
    }

    /// Fullscreen toggled from the window itself (keyboard shortcut, page request)
    pub fn user_set_fullscreen(&self, id: WindowId, fullscreen: bool) {
        apply_fullscreen(&self.host, &self.bus, id, fullscreen);
    }

    /// User activated the overlay's exit control
    pub fn click_overlay_control(&self, id: WindowId) {
        if self.host.borrow().overlays.contains_key(&id) {
            self.bus.control.send(id, ControlEvent::RequestExitFullscreen);
        }
    }

    // -- inspection --

    pub fn live_sessions(&self) -> Vec<WindowId> {
        self.host.borrow().sessions.keys().copied().collect()
    }

    pub fn session(&self, id: WindowId) -> Option<SessionRecord> {
        self.host.borrow().sessions.get(&id).cloned()
    }

    pub fn overlays(&self) -> Vec<(WindowId, OverlayRecord)> {
        self.host
            .borrow()
            .overlays
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }

    pub fn log(&self) -> Vec<HostOp> {
        self.host.borrow().log.clone()
    }

    #[cfg(test)]
    pub fn opened_urls(&self) -> Vec<String> {
        self.host
            .borrow()
            .log
            .iter()
            .filter_map(|op| match op {
                HostOp::ExternalOpened(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn min_live_after_destroy(&self) -> Option<usize> {
        self.host.borrow().min_live_after_destroy
    }

    /// The content context crosses a JSON boundary; round-trip like a real bridge would
    fn forward_content_event(&self, id: WindowId, event: ContentEvent) {
        match ipc::to_wire(&event).and_then(|json| ipc::from_wire::<ContentEvent>(&json)) {
            Ok(event) => self.bus.content.send(id, event),
            Err(e) => warn!(window = %id, error = ?e, "Dropping malformed content event"),
        }
    }
}

impl Platform for HeadlessPlatform {
    type Session = HeadlessSession;
    type Overlay = HeadlessOverlay;

    fn create_session_window(&mut self, spec: &SessionWindowSpec) -> Result<HeadlessSession> {
        let mut host = self.host.borrow_mut();
        if host.fail_session_creation {
            bail!("Session window creation disabled for partition '{}'", spec.partition);
        }

        let id = host.allocate_id();
        host.sessions.insert(
            id,
            SessionRecord {
                spec: spec.clone(),
                bounds: Rect::new(WINDOW_ORIGIN.0, WINDOW_ORIGIN.1, spec.width, spec.height),
                visible: true,
                fullscreen: false,
                content: HotZoneDetector::new(self.hot_zone_px),
                received: Vec::new(),
            },
        );
        host.log.push(HostOp::SessionCreated {
            id,
            partition: spec.partition.clone(),
        });
        info!(window = %id, partition = %spec.partition, url = %spec.target_url, "Session window created");

        Ok(HeadlessSession {
            id,
            host: Rc::clone(&self.host),
            bus: self.bus.clone(),
        })
    }

    fn create_overlay_window(&mut self, spec: &OverlayWindowSpec) -> Result<HeadlessOverlay> {
        let mut host = self.host.borrow_mut();
        let id = host.allocate_id();
        host.overlays.insert(
            id,
            OverlayRecord {
                spec: spec.clone(),
                visible: spec.initially_visible,
            },
        );
        host.log.push(HostOp::OverlayCreated(id));
        debug!(window = %id, parent = %spec.parent, bounds = ?spec.bounds, "Overlay window created");

        Ok(HeadlessOverlay {
            id,
            host: Rc::clone(&self.host),
        })
    }

    fn open_external(&mut self, url: &str) -> Result<()> {
        if !external::is_openable(url) {
            bail!("Refusing to open non-web URL '{}'", url);
        }
        self.host
            .borrow_mut()
            .log
            .push(HostOp::ExternalOpened(url.to_string()));
        if self.launch_external {
            external::open(url)?;
        }
        Ok(())
    }
}

fn apply_fullscreen(host: &Rc<RefCell<Host>>, bus: &BusSenders, id: WindowId, fullscreen: bool) {
    let changed = match host.borrow_mut().sessions.get_mut(&id) {
        Some(record) if record.fullscreen != fullscreen => {
            record.fullscreen = fullscreen;
            record.bounds = if fullscreen {
                SCREEN
            } else {
                Rect::new(WINDOW_ORIGIN.0, WINDOW_ORIGIN.1, record.spec.width, record.spec.height)
            };
            if fullscreen {
                record.visible = true;
            }
            true
        }
        _ => false,
    };

    if changed {
        let event = if fullscreen {
            WindowEvent::EnteredFullscreen
        } else {
            WindowEvent::LeftFullscreen
        };
        bus.window.send(id, event);
    }
}

pub struct HeadlessSession {
    id: WindowId,
    host: Rc<RefCell<Host>>,
    bus: BusSenders,
}

impl HeadlessSession {
    fn with_record<R>(&self, f: impl FnOnce(&mut SessionRecord) -> R) -> Option<R> {
        self.host.borrow_mut().sessions.get_mut(&self.id).map(f)
    }
}

impl SessionWindow for HeadlessSession {
    fn id(&self) -> WindowId {
        self.id
    }

    fn show(&mut self) {
        self.with_record(|r| r.visible = true);
    }

    fn hide(&mut self) {
        self.with_record(|r| r.visible = false);
    }

    fn is_visible(&self) -> bool {
        self.with_record(|r| r.visible).unwrap_or(false)
    }

    fn is_fullscreen(&self) -> bool {
        self.with_record(|r| r.fullscreen).unwrap_or(false)
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        apply_fullscreen(&self.host, &self.bus, self.id, fullscreen);
    }

    fn bounds(&self) -> Rect {
        self.with_record(|r| r.bounds).unwrap_or_default()
    }

    fn post(&mut self, msg: ContentMessage) {
        let delivered = match ipc::to_wire(&msg).and_then(|json| ipc::from_wire::<ContentMessage>(&json)) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(window = %self.id, error = ?e, "Dropping malformed content message");
                return;
            }
        };
        self.with_record(|r| {
            r.content.handle_message(delivered);
            r.received.push(delivered);
        });
    }

    fn destroy(&mut self) {
        let mut host = self.host.borrow_mut();
        if host.sessions.remove(&self.id).is_none() {
            return;
        }
        host.log.push(HostOp::SessionDestroyed(self.id));
        let live = host.sessions.len();
        host.min_live_after_destroy = Some(host.min_live_after_destroy.map_or(live, |m| m.min(live)));
        info!(window = %self.id, live, "Session window destroyed");
    }
}

pub struct HeadlessOverlay {
    id: WindowId,
    host: Rc<RefCell<Host>>,
}

impl OverlayWindow for HeadlessOverlay {
    fn id(&self) -> WindowId {
        self.id
    }

    fn post(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::OverlayVisibility(visible) => {
                if let Some(record) = self.host.borrow_mut().overlays.get_mut(&self.id) {
                    record.visible = visible;
                }
            }
        }
    }

    fn destroy(&mut self) {
        let mut host = self.host.borrow_mut();
        if host.overlays.remove(&self.id).is_some() {
            host.log.push(HostOp::OverlayDestroyed(self.id));
            debug!(window = %self.id, "Overlay window destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::bus;

    fn spec(partition: &str) -> SessionWindowSpec {
        SessionWindowSpec {
            target_url: "https://example.com".to_string(),
            user_agent: "test".to_string(),
            partition: partition.to_string(),
            title: "test".to_string(),
            width: 800,
            height: 600,
        }
    }

    #[test]
    fn test_fullscreen_change_emits_event_once() {
        let (senders, mut receivers) = bus();
        let mut platform = HeadlessPlatform::new(senders, 20.0);
        let mut window = platform.create_session_window(&spec("persist:a")).unwrap();

        window.set_fullscreen(true);
        window.set_fullscreen(true);

        let event = receivers.window.try_recv().unwrap();
        assert_eq!(event.source, window.id());
        assert_eq!(event.payload, WindowEvent::EnteredFullscreen);
        assert!(receivers.window.try_recv().is_err());
        assert_eq!(window.bounds(), SCREEN);
    }

    #[test]
    fn test_destroyed_window_ignores_calls() {
        let (senders, mut receivers) = bus();
        let mut platform = HeadlessPlatform::new(senders, 20.0);
        let mut window = platform.create_session_window(&spec("persist:a")).unwrap();

        window.destroy();
        window.destroy();
        window.show();
        window.set_fullscreen(true);

        assert!(!window.is_visible());
        assert!(receivers.window.try_recv().is_err());
        assert_eq!(platform.min_live_after_destroy(), Some(0));
        assert_eq!(platform.log().len(), 2);
    }

    #[test]
    fn test_pointer_reaches_bus_only_in_fullscreen() {
        let (senders, mut receivers) = bus();
        let mut platform = HeadlessPlatform::new(senders, 20.0);
        let mut window = platform.create_session_window(&spec("persist:a")).unwrap();

        platform.pointer_move(window.id(), 5.0);
        assert!(receivers.content.try_recv().is_err());

        window.post(ContentMessage::FullscreenStateChanged(true));
        platform.pointer_move(window.id(), 5.0);
        platform.pointer_move(window.id(), 50.0);

        assert_eq!(receivers.content.try_recv().unwrap().payload, ContentEvent::HotZoneEnter);
        assert!(receivers.content.try_recv().is_err());
    }

    #[test]
    fn test_open_external_records_without_launching() {
        let (senders, _receivers) = bus();
        let mut platform = HeadlessPlatform::new(senders, 20.0);

        platform.open_external("https://example.com/x").unwrap();
        assert!(platform.open_external("file:///tmp/x").is_err());
        assert_eq!(platform.opened_urls(), vec!["https://example.com/x".to_string()]);
    }
}
