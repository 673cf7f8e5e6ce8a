//! Line-oriented input for the headless host
//!
//! Stands in for the window system's input: each stdin line becomes one
//! pointer move, button press or click on the current session window or its
//! overlay. A reader thread feeds the event loop's task through a channel.

use anyhow::{Context, Result, bail};
use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::platform::headless::HeadlessPlatform;

pub const HELP: &str = "\
commands:
  close                 press the window's close button
  minimize              press the window's minimize button
  fullscreen on|off     toggle fullscreen from the window itself
  pointer <y>           move the pointer to y px below the top edge
  link <url>            click a link that opens a new browsing context
  exit-overlay          click the overlay's exit control
  status                print window and overlay state
  history               print every host operation so far
  help                  print this text";

#[derive(Debug, Clone, PartialEq)]
pub enum HostInput {
    Close,
    Minimize,
    Fullscreen(bool),
    Pointer(f64),
    Link(String),
    ExitOverlay,
    Status,
    History,
    Help,
}

/// Blank lines and `#` comments parse to `None`
pub fn parse(line: &str) -> Result<Option<HostInput>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or("");
    let args: Vec<&str> = parts.collect();

    let input = match (cmd, args.as_slice()) {
        ("close", []) => HostInput::Close,
        ("minimize", []) => HostInput::Minimize,
        ("fullscreen", ["on"]) => HostInput::Fullscreen(true),
        ("fullscreen", ["off"]) => HostInput::Fullscreen(false),
        ("pointer", [y]) => {
            let y = y
                .parse::<f64>()
                .with_context(|| format!("pointer: '{}' is not a number", y))?;
            HostInput::Pointer(y)
        }
        ("link", [url]) => HostInput::Link(url.to_string()),
        ("exit-overlay", []) => HostInput::ExitOverlay,
        ("status", []) => HostInput::Status,
        ("history", []) => HostInput::History,
        ("help", []) => HostInput::Help,
        _ => bail!("Unrecognized input '{}' (try 'help')", line),
    };
    Ok(Some(input))
}

/// Spawn a background thread reading stdin until EOF
pub fn spawn_reader() -> UnboundedReceiver<HostInput> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        info!("Console reader started");
        if let Err(e) = read_lines(std::io::stdin().lock(), &tx) {
            error!(error = ?e, "Console reader error");
        }
        debug!("Console reader stopped");
    });
    rx
}

fn read_lines(input: impl BufRead, sender: &UnboundedSender<HostInput>) -> Result<()> {
    for line in input.lines() {
        let line = line.context("Failed to read console input")?;
        match parse(&line) {
            Ok(Some(input)) => {
                if sender.send(input).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

/// Apply console input to `host` until the reader goes away, then idle
pub async fn drive(host: HeadlessPlatform, mut inputs: UnboundedReceiver<HostInput>) {
    while let Some(input) = inputs.recv().await {
        apply(&host, input);
    }
    info!("Console input closed");
    std::future::pending::<()>().await
}

pub fn apply(host: &HeadlessPlatform, input: HostInput) {
    // Newest live session is the active one between event loop turns
    let window = host.live_sessions().last().copied();
    let overlay = host.overlays().first().map(|(id, _)| *id);

    match input {
        HostInput::Status => print_status(host),
        HostInput::History => {
            for op in host.log() {
                println!("{op:?}");
            }
        }
        HostInput::Help => println!("{HELP}"),
        HostInput::ExitOverlay => match overlay {
            Some(id) => host.click_overlay_control(id),
            None => warn!("No overlay to click"),
        },
        input => {
            let Some(id) = window else {
                warn!(input = ?input, "No session window for console input");
                return;
            };
            match input {
                HostInput::Close => host.request_close(id),
                HostInput::Minimize => host.request_minimize(id),
                HostInput::Fullscreen(on) => host.user_set_fullscreen(id, on),
                HostInput::Pointer(y) => host.pointer_move(id, y),
                HostInput::Link(url) => host.click_external_link(id, &url),
                _ => {}
            }
        }
    }
}

fn print_status(host: &HeadlessPlatform) {
    for id in host.live_sessions() {
        if let Some(record) = host.session(id) {
            println!(
                "window {id}: partition={} visible={} fullscreen={} hot-zone={} bounds={:?}",
                record.spec.partition,
                record.visible,
                record.fullscreen,
                record.content.is_listening(),
                record.bounds
            );
        }
    }
    for (id, record) in host.overlays() {
        println!("overlay {id}: parent={} visible={}", record.spec.parent, record.visible);
    }
    if let Some(min) = host.min_live_after_destroy() {
        println!("fewest live windows after a teardown: {min}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::{ContentEvent, ContentMessage, WindowEvent, bus};
    use crate::platform::{Platform, SessionWindow, SessionWindowSpec};
    use std::io::Cursor;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("close").unwrap(), Some(HostInput::Close));
        assert_eq!(parse("  fullscreen on ").unwrap(), Some(HostInput::Fullscreen(true)));
        assert_eq!(parse("pointer 12.5").unwrap(), Some(HostInput::Pointer(12.5)));
        assert_eq!(
            parse("link https://example.com").unwrap(),
            Some(HostInput::Link("https://example.com".into()))
        );
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("# note").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse("pointer up").is_err());
        assert!(parse("fullscreen maybe").is_err());
        assert!(parse("close now").is_err());
        assert!(parse("reboot").is_err());
    }

    #[test]
    fn test_reader_skips_bad_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        read_lines(Cursor::new("minimize\nbogus\n\nexit-overlay\n"), &tx).unwrap();

        assert_eq!(rx.try_recv().unwrap(), HostInput::Minimize);
        assert_eq!(rx.try_recv().unwrap(), HostInput::ExitOverlay);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_apply_targets_newest_window() {
        let (senders, mut receivers) = bus();
        let mut host = HeadlessPlatform::new(senders, 20.0);
        let spec = SessionWindowSpec {
            target_url: "https://example.com".into(),
            user_agent: "test".into(),
            partition: "persist:a".into(),
            title: "test".into(),
            width: 800,
            height: 600,
        };
        let _old = host.create_session_window(&spec).unwrap();
        let mut new = host.create_session_window(&spec).unwrap();

        apply(&host, HostInput::Close);
        let event = receivers.window.try_recv().unwrap();
        assert_eq!(event.source, new.id());
        assert_eq!(event.payload, WindowEvent::CloseRequested);

        new.post(ContentMessage::FullscreenStateChanged(true));
        apply(&host, HostInput::Pointer(4.0));
        assert_eq!(receivers.content.try_recv().unwrap().payload, ContentEvent::HotZoneEnter);

        // No overlay yet, nothing to click
        apply(&host, HostInput::ExitOverlay);
        assert!(receivers.control.try_recv().is_err());
    }
}
