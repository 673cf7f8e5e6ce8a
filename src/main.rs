#![forbid(unsafe_code)]

mod app;
mod config;
mod console;
mod constants;
mod content;
mod ipc;
mod overlay;
mod platform;
mod session;
mod store;
mod tray;
mod window_manager;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use app::{App, AppCommand};
use config::Settings;
use platform::headless::HeadlessPlatform;
use session::SessionStore;
use store::JsonFileStore;
use window_manager::WindowManager;

#[derive(Parser, Debug)]
#[command(name = "wa-desktop", version, about = "Desktop shell for WhatsApp Web with per-user sessions")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Profile state file (defaults to the user config directory)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Run without registering a system tray icon
    #[arg(long)]
    no_tray: bool,

    /// Read window input (close, pointer, link, ...) from stdin
    #[arg(long)]
    console: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the shell (default)
    Run,
    /// Inspect or edit stored user profiles
    Users {
        #[command(subcommand)]
        action: UsersCommand,
    },
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    /// List profiles, marking the active one
    List,
    /// Create a new profile and make it active
    Add,
    /// Make a profile active by partition or display name
    Switch { user: String },
}

fn main() -> Result<()> {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let state_path = cli.state.clone().unwrap_or_else(config::state_path);

    match cli.command {
        Some(Command::Users { action }) => run_users(action, state_path),
        Some(Command::Run) | None => {
            let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
            run_shell(&settings_path, state_path, !cli.no_tray, cli.console)
        }
    }
}

fn run_users(action: UsersCommand, state_path: PathBuf) -> Result<()> {
    let mut sessions = SessionStore::load(JsonFileStore::open(state_path));

    match action {
        UsersCommand::List => {
            let current = sessions.current().partition.clone();
            for user in sessions.users() {
                let marker = if user.partition == current { '*' } else { ' ' };
                println!("{marker} {:<12} {}", user.name, user.partition);
            }
        }
        UsersCommand::Add => {
            let user = sessions.add_user()?;
            println!("Added {} ({})", user.name, user.partition);
        }
        UsersCommand::Switch { user } => {
            let partition = sessions
                .resolve(&user)
                .map(|profile| profile.partition.clone())
                .with_context(|| format!("No user matches '{}'", user))?;
            sessions.switch_to(&partition)?;
            println!("Active user: {}", sessions.current().name);
        }
    }

    Ok(())
}

fn run_shell(settings_path: &std::path::Path, state_path: PathBuf, with_tray: bool, with_console: bool) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    info!(remote_url = %settings.remote_url, settings = %settings_path.display(), "Settings loaded");

    let store = JsonFileStore::open(state_path);
    info!(state = %store.path().display(), "Profile state opened");
    let sessions = SessionStore::load(store);
    info!(
        users = sessions.users().len(),
        current = %sessions.current().partition,
        "Profiles loaded"
    );

    let (senders, receivers) = ipc::bus();
    let platform = HeadlessPlatform::new(senders, settings.overlay.hot_zone_px).launching_external(true);
    let host = platform.clone();
    let manager = WindowManager::new(platform, sessions, settings);

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    #[cfg(unix)]
    forward_signals(command_tx.clone())?;

    let app = App::new(manager, receivers, command_rx);
    let menu = app.menu();
    let console_inputs = with_console.then(|| {
        println!("{}", console::HELP);
        console::spawn_reader()
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(async move {
        if with_tray {
            if let Err(e) = tray::spawn(command_tx, menu).await {
                warn!(error = ?e, "Continuing without tray; hidden windows cannot be restored");
            }
        } else {
            info!("Tray disabled by --no-tray");
        }
        match console_inputs {
            Some(inputs) => tokio::select! {
                result = app.run() => result,
                _ = console::drive(host, inputs) => Ok(()),
            },
            None => app.run().await,
        }
    })
}

/// SIGINT/SIGTERM become a regular Quit so windows are torn down in order
#[cfg(unix)]
fn forward_signals(commands: UnboundedSender<AppCommand>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    std::thread::spawn(move || {
        for signal in signals.forever() {
            info!(signal, "Termination signal received");
            if commands.send(AppCommand::Quit).is_err() {
                break;
            }
        }
    });
    Ok(())
}
