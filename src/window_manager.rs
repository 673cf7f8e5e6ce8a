//! Window manager: the single active session window and its overlay
//!
//! Owns the session store, the main window handle and the fullscreen overlay.
//! The main window is replaced, never re-bound, when the active profile
//! changes, and the replacement always exists before the old window goes away.
//! Every operation on a missing window is a no-op.

use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::ipc::{ContentEvent, ContentMessage, ControlEvent, Envelope, WindowEvent, WindowId};
use crate::overlay::OverlayCoordinator;
use crate::platform::{Platform, SessionWindow, SessionWindowSpec};
use crate::session::{SessionStore, SwitchOutcome, UserProfile};
use crate::store::KeyValueStore;

/// What the tray/menu needs to render the profile list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuModel {
    pub users: Vec<UserProfile>,
    pub current_partition: String,
}

struct MainSession<W> {
    profile: UserProfile,
    window: W,
}

pub struct WindowManager<P: Platform, S: KeyValueStore> {
    platform: P,
    sessions: SessionStore<S>,
    settings: Settings,
    main: Option<MainSession<P::Session>>,
    overlay: Option<OverlayCoordinator<P::Overlay>>,
    quitting: bool,
}

impl<P: Platform, S: KeyValueStore> WindowManager<P, S> {
    pub fn new(platform: P, sessions: SessionStore<S>, settings: Settings) -> Self {
        Self {
            platform,
            sessions,
            settings,
            main: None,
            overlay: None,
            quitting: false,
        }
    }

    /// Open the window for the persisted active profile
    pub fn start(&mut self) -> Result<()> {
        let profile = self.sessions.current().clone();
        self.replace_window(profile)
            .context("Failed to open the initial session window")
    }

    pub fn main_window_id(&self) -> Option<WindowId> {
        self.main.as_ref().map(|m| m.window.id())
    }

    pub fn overlay_id(&self) -> Option<WindowId> {
        self.overlay.as_ref().map(|o| o.id())
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    pub fn menu_model(&self) -> MenuModel {
        MenuModel {
            users: self.sessions.users().to_vec(),
            current_partition: self.sessions.current().partition.clone(),
        }
    }

    /// Next instant the overlay needs a timer callback
    pub fn overlay_deadline(&self) -> Option<Instant> {
        self.overlay.as_ref().and_then(|o| o.deadline())
    }

    fn session_spec(&self, profile: &UserProfile) -> SessionWindowSpec {
        SessionWindowSpec {
            target_url: self.settings.remote_url.clone(),
            user_agent: self.settings.user_agent.clone(),
            partition: profile.partition.clone(),
            title: crate::constants::window::TITLE.to_string(),
            width: self.settings.window.width,
            height: self.settings.window.height,
        }
    }

    /// Create a window for `profile`, then retire the current one
    fn replace_window(&mut self, profile: UserProfile) -> Result<()> {
        let spec = self.session_spec(&profile);
        let window = self
            .platform
            .create_session_window(&spec)
            .with_context(|| format!("Failed to create session window for '{}'", profile.partition))?;
        info!(window = %window.id(), name = %profile.name, partition = %profile.partition, "Session started");

        let old = self.main.replace(MainSession { profile, window });

        // The overlay belongs to the old window's fullscreen cycle
        self.teardown_overlay();
        if let Some(mut old) = old {
            info!(window = %old.window.id(), partition = %old.profile.partition, "Retiring previous session window");
            old.window.destroy();
        }
        Ok(())
    }

    pub fn switch_user(&mut self, partition: &str) -> Result<()> {
        if self.quitting {
            return Ok(());
        }
        let previous = self.sessions.current().partition.clone();

        match self.sessions.switch_to(partition)? {
            SwitchOutcome::Unchanged => {
                debug!(partition = %partition, "Profile already active");
                Ok(())
            }
            SwitchOutcome::Switched(profile) => {
                let result = self.replace_window(profile);
                if result.is_err() {
                    self.restore_active(&previous);
                }
                result
            }
        }
    }

    /// New profile, or `None` once shutdown has begun
    pub fn add_user(&mut self) -> Result<Option<UserProfile>> {
        if self.quitting {
            debug!("Ignoring add user during shutdown");
            return Ok(None);
        }
        let previous = self.sessions.current().partition.clone();

        let profile = self.sessions.add_user()?;
        if let Err(e) = self.replace_window(profile.clone()) {
            self.restore_active(&previous);
            return Err(e);
        }
        Ok(Some(profile))
    }

    /// Point the store back at the profile whose window is still open
    fn restore_active(&mut self, partition: &str) {
        warn!(partition = %partition, "Window replacement failed, restoring previous profile");
        if let Err(e) = self.sessions.switch_to(partition) {
            error!(error = ?e, "Failed to restore previous profile");
        }
    }

    pub fn show_main_window(&mut self) {
        if self.quitting {
            return;
        }
        match self.main.as_mut() {
            Some(main) => main.window.show(),
            None => {
                info!("No session window open, creating one");
                let profile = self.sessions.current().clone();
                if let Err(e) = self.replace_window(profile) {
                    error!(error = ?e, "Failed to recreate session window");
                }
            }
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        if let Some(main) = self.main.as_mut() {
            let fullscreen = main.window.is_fullscreen();
            main.window.set_fullscreen(!fullscreen);
        }
    }

    /// Leave fullscreen if the window is in it; otherwise nothing happens
    pub fn request_exit_fullscreen(&mut self) {
        match self.main.as_mut() {
            Some(main) if main.window.is_fullscreen() => {
                info!(window = %main.window.id(), "Exit fullscreen requested");
                main.window.set_fullscreen(false);
            }
            _ => debug!("Exit fullscreen requested while not fullscreen"),
        }
    }

    pub fn open_documentation(&mut self) {
        let url = self.settings.documentation_url.clone();
        if let Err(e) = self.platform.open_external(&url) {
            warn!(url = %url, error = ?e, "Failed to open documentation");
        }
    }

    pub fn quit(&mut self) {
        if self.quitting {
            return;
        }
        info!("Quit requested");
        self.quitting = true;
        self.teardown_overlay();
        if let Some(mut main) = self.main.take() {
            main.window.destroy();
        }
    }

    pub fn handle_window_event(&mut self, event: Envelope<WindowEvent>) {
        if self.main_window_id() != Some(event.source) {
            debug!(source = %event.source, event = ?event.payload, "Dropping event from inactive window");
            return;
        }

        match event.payload {
            WindowEvent::ExternalNavigationRequested(url) => {
                if let Err(e) = self.platform.open_external(&url) {
                    warn!(url = %url, error = ?e, "Failed to open external link");
                }
            }
            WindowEvent::MinimizeRequested | WindowEvent::CloseRequested => {
                if let Some(main) = self.main.as_mut() {
                    debug!(window = %event.source, "Hiding session window instead of closing");
                    main.window.hide();
                }
            }
            WindowEvent::EnteredFullscreen => self.enter_fullscreen(),
            WindowEvent::LeftFullscreen => self.leave_fullscreen(),
        }
    }

    pub fn handle_content_event(&mut self, event: Envelope<ContentEvent>, now: Instant) {
        if self.main_window_id() != Some(event.source) {
            debug!(source = %event.source, "Dropping content event from inactive window");
            return;
        }

        match event.payload {
            ContentEvent::HotZoneEnter => match self.overlay.as_mut() {
                Some(overlay) => overlay.hot_zone_enter(now),
                None => debug!("Hot-zone signal without an overlay"),
            },
        }
    }

    pub fn handle_control_event(&mut self, event: Envelope<ControlEvent>) {
        if self.overlay_id() != Some(event.source) {
            debug!(source = %event.source, "Dropping control event from stale overlay");
            return;
        }

        match event.payload {
            ControlEvent::RequestExitFullscreen => self.request_exit_fullscreen(),
        }
    }

    pub fn on_overlay_timer(&mut self, now: Instant) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.on_timer(now);
        }
    }

    fn enter_fullscreen(&mut self) {
        let Some(main) = self.main.as_mut() else {
            return;
        };

        if self.overlay.is_none() {
            let parent = main.window.id();
            let bounds = main.window.bounds();
            match OverlayCoordinator::create(&mut self.platform, parent, bounds, &self.settings.overlay) {
                Ok(overlay) => self.overlay = Some(overlay),
                Err(e) => error!(error = ?e, "Fullscreen entered without an exit overlay"),
            }
        }

        main.window.post(ContentMessage::FullscreenStateChanged(true));
    }

    fn leave_fullscreen(&mut self) {
        self.teardown_overlay();
        if let Some(main) = self.main.as_mut() {
            main.window.post(ContentMessage::FullscreenStateChanged(false));
        }
    }

    fn teardown_overlay(&mut self) {
        if let Some(overlay) = self.overlay.take() {
            overlay.destroy();
        }
    }
}
