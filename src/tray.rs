//! System tray via D-Bus StatusNotifier
//!
//! The tray never touches window state. Menu actions become [`AppCommand`]s on
//! the event loop's queue, and the Users submenu is re-rendered from the
//! [`MenuModel`] the loop publishes after each command.

use anyhow::{Context, Result, anyhow};
use ksni::TrayMethods;
use ksni::menu::{RadioGroup, RadioItem, StandardItem, SubMenu};
use std::io::Cursor;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::app::AppCommand;
use crate::constants::tray;
use crate::window_manager::MenuModel;

pub struct ShellTray {
    model: MenuModel,
    commands: UnboundedSender<AppCommand>,
    icon: Vec<ksni::Icon>,
}

impl ShellTray {
    pub fn new(model: MenuModel, commands: UnboundedSender<AppCommand>) -> Self {
        let icon = match load_tray_icon() {
            Ok(icon) => vec![icon],
            Err(e) => {
                warn!(error = ?e, "Failed to load tray icon, using theme fallback");
                Vec::new()
            }
        };
        Self { model, commands, icon }
    }

    fn send(&self, command: AppCommand) {
        if self.commands.send(command).is_err() {
            warn!("Event loop gone, dropping tray command");
        }
    }

    fn users_menu(&self) -> Vec<ksni::MenuItem<Self>> {
        let selected = self
            .model
            .users
            .iter()
            .position(|user| user.partition == self.model.current_partition)
            .unwrap_or(0);

        let options = self
            .model
            .users
            .iter()
            .map(|user| RadioItem {
                label: user.name.clone(),
                ..Default::default()
            })
            .collect();

        vec![
            RadioGroup {
                selected,
                select: Box::new(|this: &mut Self, index| {
                    if let Some(user) = this.model.users.get(index) {
                        let partition = user.partition.clone();
                        this.send(AppCommand::SelectUser(partition));
                    }
                }),
                options,
            }
            .into(),
            ksni::MenuItem::Separator,
            StandardItem {
                label: "Add User".into(),
                activate: Box::new(|this: &mut Self| this.send(AppCommand::AddUser)),
                ..Default::default()
            }
            .into(),
        ]
    }
}

impl ksni::Tray for ShellTray {
    fn id(&self) -> String {
        tray::ID.into()
    }

    fn title(&self) -> String {
        tray::TOOLTIP.into()
    }

    fn icon_name(&self) -> String {
        // Used by hosts that ignore the pixmap
        "internet-chat".into()
    }

    fn icon_pixmap(&self) -> Vec<ksni::Icon> {
        self.icon.clone()
    }

    fn activate(&mut self, _x: i32, _y: i32) {
        self.send(AppCommand::ShowMainWindow);
    }

    fn menu(&self) -> Vec<ksni::MenuItem<Self>> {
        vec![
            StandardItem {
                label: "Show Window".into(),
                activate: Box::new(|this: &mut Self| this.send(AppCommand::ShowMainWindow)),
                ..Default::default()
            }
            .into(),
            StandardItem {
                label: "Toggle Full Screen".into(),
                activate: Box::new(|this: &mut Self| this.send(AppCommand::ToggleFullscreen)),
                ..Default::default()
            }
            .into(),
            SubMenu {
                label: "Users".into(),
                submenu: self.users_menu(),
                ..Default::default()
            }
            .into(),
            ksni::MenuItem::Separator,
            StandardItem {
                label: "Documentation".into(),
                activate: Box::new(|this: &mut Self| this.send(AppCommand::OpenDocumentation)),
                ..Default::default()
            }
            .into(),
            StandardItem {
                label: "Quit".into(),
                icon_name: "application-exit".into(),
                activate: Box::new(|this: &mut Self| this.send(AppCommand::Quit)),
                ..Default::default()
            }
            .into(),
        ]
    }
}

/// Register the tray and keep its Users submenu in sync with `menu`
pub async fn spawn(commands: UnboundedSender<AppCommand>, mut menu: watch::Receiver<MenuModel>) -> Result<()> {
    let tray = ShellTray::new(menu.borrow_and_update().clone(), commands);
    let handle = tray
        .spawn()
        .await
        .map_err(|e| anyhow!("{e}"))
        .context("Failed to register tray icon (is a StatusNotifier host running?)")?;
    info!("Tray icon created");

    tokio::spawn(async move {
        while menu.changed().await.is_ok() {
            let model = menu.borrow_and_update().clone();
            debug!(users = model.users.len(), current = %model.current_partition, "Refreshing tray menu");
            if handle.update(move |tray: &mut ShellTray| tray.model = model).await.is_none() {
                warn!("Tray service stopped, menu updates disabled");
                break;
            }
        }
    });

    Ok(())
}

fn load_tray_icon() -> Result<ksni::Icon> {
    let icon_bytes = include_bytes!("../assets/tray-icon.png");
    let decoder = png::Decoder::new(Cursor::new(&icon_bytes[..]));
    let mut reader = decoder.read_info().context("Failed to read tray icon header")?;
    let (width, height) = {
        let header = reader.info();
        (header.width, header.height)
    };
    let mut buf = vec![0; width as usize * height as usize * 4];
    let info = reader.next_frame(&mut buf).context("Failed to decode tray icon")?;
    let pixels = &buf[..info.buffer_size()];

    // StatusNotifier wants ARGB32 in network byte order
    let data = match info.color_type {
        png::ColorType::Rgba => pixels
            .chunks_exact(4)
            .flat_map(|p| [p[3], p[0], p[1], p[2]])
            .collect(),
        png::ColorType::Rgb => pixels
            .chunks_exact(3)
            .flat_map(|p| [0xFF, p[0], p[1], p[2]])
            .collect(),
        other => {
            return Err(anyhow!(
                "Unsupported tray icon color type {:?} (expected RGB or RGBA)",
                other
            ));
        }
    };

    Ok(ksni::Icon {
        width: width as i32,
        height: height as i32,
        data,
    })
}
