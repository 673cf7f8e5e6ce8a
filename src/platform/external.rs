//! Opening links in the user's default browser

use anyhow::{Context, Result, bail};
use std::process::{Child, Command, Stdio};
use std::thread;
use tracing::{debug, info, warn};

/// Only web and mail links leave the shell; anything else is refused
pub fn is_openable(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    ["https://", "http://", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// Opener program and its arguments for `os` (as in `std::env::consts::OS`).
/// The URL is always a single argument handed to a program that does not
/// re-parse it as a shell command line.
fn opener_argv<'a>(os: &str, url: &'a str) -> (&'static str, Vec<&'a str>) {
    match os {
        "macos" => ("open", vec![url]),
        "windows" => ("rundll32", vec!["url.dll,FileProtocolHandler", url]),
        _ => ("xdg-open", vec![url]),
    }
}

/// Wait for `child` on a background thread so it never lingers as a zombie
fn reap(mut child: Child) {
    let pid = child.id();
    let spawned = thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => debug!(pid, status = %status, "External handler exited"),
            Err(e) => warn!(pid, error = %e, "Failed to wait for external handler"),
        });
    if let Err(e) = spawned {
        warn!(pid, error = %e, "Failed to start reaper thread for external handler");
    }
}

/// Spawn `cmd` detached from our stdio and reap it once it exits
fn spawn_detached(mut cmd: Command) -> Result<u32> {
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let pid = child.id();
    reap(child);
    Ok(pid)
}

/// Launch the platform opener for `url` without waiting for it
pub fn open(url: &str) -> Result<()> {
    if !is_openable(url) {
        bail!("Refusing to open non-web URL '{}'", url);
    }

    let (program, args) = opener_argv(std::env::consts::OS, url);
    let mut cmd = Command::new(program);
    cmd.args(args);

    let pid = spawn_detached(cmd)
        .with_context(|| format!("Failed to launch external handler for '{}'", url))?;

    info!(url = %url, program, pid, "Opened external link");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_links_are_openable() {
        assert!(is_openable("https://example.com/a?b=c"));
        assert!(is_openable("HTTP://example.com"));
        assert!(is_openable("mailto:someone@example.com"));
    }

    #[test]
    fn test_other_schemes_refused() {
        assert!(!is_openable("file:///etc/passwd"));
        assert!(!is_openable("javascript:alert(1)"));
        assert!(open("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_windows_opener_keeps_url_as_one_argument() {
        let url = "https://x.com/?a=1&b=2&calc|more^%PATH%";
        let (program, args) = opener_argv("windows", url);

        assert_eq!(program, "rundll32");
        assert_eq!(args, vec!["url.dll,FileProtocolHandler", url]);
    }

    #[test]
    fn test_unix_openers_take_url_verbatim() {
        let url = "https://x.com/?a=1&b=2";
        assert_eq!(opener_argv("linux", url), ("xdg-open", vec![url]));
        assert_eq!(opener_argv("freebsd", url), ("xdg-open", vec![url]));
        assert_eq!(opener_argv("macos", url), ("open", vec![url]));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_exited_handler_is_reaped() {
        use std::time::{Duration, Instant};

        let pid = spawn_detached(Command::new("true")).unwrap();
        let stat = format!("/proc/{pid}/stat");

        // Reaped children vanish from /proc; unreaped ones stay as state 'Z'
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match std::fs::read_to_string(&stat) {
                Err(_) => break,
                Ok(contents) => {
                    let state = contents
                        .rsplit(')')
                        .next()
                        .and_then(|rest| rest.trim_start().chars().next());
                    assert!(
                        Instant::now() < deadline,
                        "handler {pid} not reaped, state {state:?}"
                    );
                }
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
}
