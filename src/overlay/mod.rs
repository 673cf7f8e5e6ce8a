//! Fullscreen overlay coordinator
//!
//! Owns the control window for exactly one fullscreen cycle: created hidden when
//! the session window enters fullscreen, dropped when it leaves. Dropping the
//! coordinator drops the debouncer, so no hide deadline outlives the window.

mod debounce;

use debounce::{Visibility, VisibilityDebouncer};

use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::settings::OverlaySettings;
use crate::constants::overlay::EXIT_LABEL;
use crate::ipc::{ControlMessage, WindowId};
use crate::platform::{OverlayWindow, OverlayWindowSpec, Platform, Rect};

/// Overlay bounds: horizontally centered on `main`, pinned to its top edge.
/// Half-pixel offsets round toward positive infinity.
pub fn overlay_bounds(main: Rect, width: u32, height: u32) -> Rect {
    let offset = ((main.width as f64 - width as f64) / 2.0 + 0.5).floor() as i32;
    Rect::new(main.x + offset, main.y, width, height)
}

pub struct OverlayCoordinator<W: OverlayWindow> {
    window: W,
    debouncer: VisibilityDebouncer,
}

impl<W: OverlayWindow> OverlayCoordinator<W> {
    pub fn create<P>(platform: &mut P, parent: WindowId, main_bounds: Rect, settings: &OverlaySettings) -> Result<Self>
    where
        P: Platform<Overlay = W>,
    {
        let spec = OverlayWindowSpec {
            bounds: overlay_bounds(main_bounds, settings.width, settings.height),
            parent,
            label: EXIT_LABEL.to_string(),
            frameless: true,
            always_on_top: true,
            focusable: false,
            skip_taskbar: true,
            initially_visible: false,
        };

        let window = platform
            .create_overlay_window(&spec)
            .context("Failed to create fullscreen overlay window")?;
        info!(overlay = %window.id(), parent = %parent, bounds = ?spec.bounds, "Fullscreen overlay created");

        Ok(Self {
            window,
            debouncer: VisibilityDebouncer::new(settings.hide_delay()),
        })
    }

    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    /// Pending hide deadline for the event loop to sleep on
    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn hot_zone_enter(&mut self, now: Instant) {
        match self.debouncer.hot_zone_enter(now) {
            Some(state) => self.publish(state),
            None => debug!(overlay = %self.id(), state = ?self.debouncer.state(), "Hide deadline reset"),
        }
    }

    pub fn on_timer(&mut self, now: Instant) {
        if let Some(state) = self.debouncer.poll(now) {
            self.publish(state);
        }
    }

    fn publish(&mut self, state: Visibility) {
        let visible = state == Visibility::Visible;
        debug!(overlay = %self.id(), visible, "Overlay visibility changed");
        self.window.post(ControlMessage::OverlayVisibility(visible));
    }

    pub fn destroy(mut self) {
        info!(overlay = %self.id(), "Fullscreen overlay destroyed");
        self.window.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::bus;
    use crate::platform::headless::HeadlessPlatform;
    use std::time::Duration;

    #[test]
    fn test_bounds_centered_on_top_edge() {
        let main = Rect::new(100, 40, 1100, 800);
        assert_eq!(overlay_bounds(main, 200, 50), Rect::new(550, 40, 200, 50));
    }

    #[test]
    fn test_bounds_round_odd_widths() {
        let main = Rect::new(0, 0, 1001, 700);
        assert_eq!(overlay_bounds(main, 200, 50).x, 401);
    }

    #[test]
    fn test_bounds_round_half_up_when_overlay_is_wider() {
        // Offset of -0.5 px lands on 0, not -1
        let main = Rect::new(10, 0, 199, 100);
        assert_eq!(overlay_bounds(main, 200, 50).x, 10);

        let main = Rect::new(10, 0, 197, 100);
        assert_eq!(overlay_bounds(main, 200, 50).x, 9);
    }

    #[test]
    fn test_created_hidden_and_shown_on_hot_zone() {
        let (senders, _receivers) = bus();
        let mut platform = HeadlessPlatform::new(senders, 20.0);
        let settings = OverlaySettings::default();

        let mut overlay =
            OverlayCoordinator::create(&mut platform, WindowId(1), Rect::new(0, 0, 1920, 1080), &settings)
                .unwrap();
        let (_, record) = platform.overlays().remove(0);
        assert!(!record.visible);
        assert!(record.spec.always_on_top && !record.spec.focusable && record.spec.frameless);
        assert_eq!(record.spec.bounds, Rect::new(860, 0, 200, 50));

        let t0 = Instant::now();
        overlay.hot_zone_enter(t0);
        assert!(platform.overlays()[0].1.visible);

        overlay.on_timer(t0 + Duration::from_millis(settings.hide_delay_ms));
        assert!(!platform.overlays()[0].1.visible);
        assert_eq!(overlay.deadline(), None);
    }

    #[test]
    fn test_destroy_removes_window() {
        let (senders, _receivers) = bus();
        let mut platform = HeadlessPlatform::new(senders, 20.0);
        let overlay = OverlayCoordinator::create(
            &mut platform,
            WindowId(1),
            Rect::new(0, 0, 800, 600),
            &OverlaySettings::default(),
        )
        .unwrap();

        overlay.destroy();
        assert!(platform.overlays().is_empty());
    }
}
