//! Single-threaded event loop
//!
//! One task owns the window manager and multiplexes tray/signal commands, the
//! three inbound bus channels and the overlay hide deadline. Nothing else
//! touches window or session state, so no locking is needed.

use anyhow::Result;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info};

use crate::ipc::BusReceivers;
use crate::platform::Platform;
use crate::store::KeyValueStore;
use crate::window_manager::{MenuModel, WindowManager};

/// Command hooks exposed to the tray, menus and signal handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    ShowMainWindow,
    ToggleFullscreen,
    Quit,
    /// Activate the profile with this partition
    SelectUser(String),
    AddUser,
    OpenDocumentation,
}

pub struct App<P: Platform, S: KeyValueStore> {
    manager: WindowManager<P, S>,
    bus: BusReceivers,
    commands: UnboundedReceiver<AppCommand>,
    menu: watch::Sender<MenuModel>,
}

impl<P: Platform, S: KeyValueStore> App<P, S> {
    pub fn new(manager: WindowManager<P, S>, bus: BusReceivers, commands: UnboundedReceiver<AppCommand>) -> Self {
        let (menu, _) = watch::channel(manager.menu_model());
        Self {
            manager,
            bus,
            commands,
            menu,
        }
    }

    /// Profile list + active selection, updated after every command
    pub fn menu(&self) -> watch::Receiver<MenuModel> {
        self.menu.subscribe()
    }

    pub async fn run(mut self) -> Result<()> {
        self.manager.start()?;
        info!("Event loop running");

        while !self.manager.is_quitting() {
            let deadline = self.manager.overlay_deadline();

            tokio::select! {
                Some(command) = self.commands.recv() => self.handle_command(command),
                Some(event) = self.bus.window.recv() => self.manager.handle_window_event(event),
                Some(event) = self.bus.content.recv() => {
                    self.manager.handle_content_event(event, Instant::now())
                }
                Some(event) = self.bus.control.recv() => self.manager.handle_control_event(event),
                _ = wait_for(deadline) => self.manager.on_overlay_timer(Instant::now()),
            }

            self.publish_menu();
        }

        info!("Event loop stopped");
        Ok(())
    }

    fn handle_command(&mut self, command: AppCommand) {
        debug!(command = ?command, "Handling command");
        match command {
            AppCommand::ShowMainWindow => self.manager.show_main_window(),
            AppCommand::ToggleFullscreen => self.manager.toggle_fullscreen(),
            AppCommand::Quit => self.manager.quit(),
            AppCommand::SelectUser(partition) => {
                if let Err(e) = self.manager.switch_user(&partition) {
                    error!(partition = %partition, error = ?e, "Failed to switch user");
                }
            }
            AppCommand::AddUser => match self.manager.add_user() {
                Ok(Some(profile)) => debug!(partition = %profile.partition, "User added from menu"),
                Ok(None) => {}
                Err(e) => error!(error = ?e, "Failed to add user"),
            },
            AppCommand::OpenDocumentation => self.manager.open_documentation(),
        }
    }

    fn publish_menu(&self) {
        let model = self.manager.menu_model();
        self.menu.send_if_modified(|current| {
            if *current == model {
                false
            } else {
                *current = model;
                true
            }
        });
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::ipc::bus;
    use crate::platform::headless::HeadlessPlatform;
    use crate::session::SessionStore;
    use crate::store::MemoryStore;
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedSender};
    use tokio::time::sleep;

    fn build() -> (App<HeadlessPlatform, MemoryStore>, HeadlessPlatform, UnboundedSender<AppCommand>) {
        let (senders, receivers) = bus();
        let host = HeadlessPlatform::new(senders, 20.0);
        let manager = WindowManager::new(host.clone(), SessionStore::load(MemoryStore::new()), Settings::default());
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(manager, receivers, rx), host, tx)
    }

    fn overlay_visible(host: &HeadlessPlatform) -> Option<bool> {
        host.overlays().first().map(|(_, record)| record.visible)
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_stops_loop_and_closes_windows() {
        let (app, host, tx) = build();

        let driver = async {
            sleep(Duration::from_millis(10)).await;
            assert_eq!(host.live_sessions().len(), 1);
            tx.send(AppCommand::Quit).unwrap();
        };

        let (result, _) = tokio::join!(app.run(), driver);
        result.unwrap();
        assert!(host.live_sessions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hot_zone_debounce_through_event_loop() {
        let (app, host, tx) = build();

        let driver = async {
            sleep(Duration::from_millis(10)).await;
            let window = host.live_sessions()[0];

            tx.send(AppCommand::ToggleFullscreen).unwrap();
            sleep(Duration::from_millis(10)).await;
            assert_eq!(overlay_visible(&host), Some(false));

            // t=0
            host.pointer_move(window, 2.0);
            sleep(Duration::from_millis(1500)).await;
            assert_eq!(overlay_visible(&host), Some(true));

            // t=1.5s, timer restarts
            host.pointer_move(window, 2.0);
            sleep(Duration::from_millis(1500)).await;
            // t=3.0s
            assert_eq!(overlay_visible(&host), Some(true));

            sleep(Duration::from_millis(1000)).await;
            // t=4.0s
            assert_eq!(overlay_visible(&host), Some(false));

            tx.send(AppCommand::Quit).unwrap();
        };

        let (result, _) = tokio::join!(app.run(), driver);
        result.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_click_exits_fullscreen() {
        let (app, host, tx) = build();

        let driver = async {
            sleep(Duration::from_millis(10)).await;
            let window = host.live_sessions()[0];
            tx.send(AppCommand::ToggleFullscreen).unwrap();
            sleep(Duration::from_millis(10)).await;
            assert_eq!(host.overlays().len(), 1);

            let overlay = host.overlays()[0].0;
            host.click_overlay_control(overlay);
            sleep(Duration::from_millis(10)).await;

            assert!(host.overlays().is_empty());
            assert!(!host.session(window).unwrap().fullscreen);
            tx.send(AppCommand::Quit).unwrap();
        };

        let (result, _) = tokio::join!(app.run(), driver);
        result.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_menu_follows_profile_changes() {
        let (app, host, tx) = build();
        let mut menu = app.menu();
        assert_eq!(menu.borrow().users.len(), 1);

        let driver = async {
            sleep(Duration::from_millis(10)).await;
            tx.send(AppCommand::AddUser).unwrap();
            menu.changed().await.unwrap();
            let model = menu.borrow_and_update().clone();
            assert_eq!(model.users.len(), 2);
            assert_eq!(model.current_partition, model.users[1].partition);

            let first = model.users[0].partition.clone();
            tx.send(AppCommand::SelectUser(first.clone())).unwrap();
            menu.changed().await.unwrap();
            assert_eq!(menu.borrow().current_partition, first);
            assert_eq!(host.live_sessions().len(), 1);

            tx.send(AppCommand::Quit).unwrap();
        };

        let (result, _) = tokio::join!(app.run(), driver);
        result.unwrap();
    }
}
