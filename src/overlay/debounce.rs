//! Overlay visibility state machine
//!
//! `Hidden` → `Visible` on hot-zone entry, which arms a hide deadline. Further
//! entries while visible push the deadline out (reset, never stacked). Polling
//! at or after the deadline hides again.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

#[derive(Debug, Clone)]
pub struct VisibilityDebouncer {
    state: Visibility,
    hide_after: Duration,
    deadline: Option<Instant>,
}

impl VisibilityDebouncer {
    pub fn new(hide_after: Duration) -> Self {
        Self {
            state: Visibility::Hidden,
            hide_after,
            deadline: None,
        }
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    /// When the pending hide fires, if one is armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Pointer entered the hot-zone. Returns the new state if it changed.
    pub fn hot_zone_enter(&mut self, now: Instant) -> Option<Visibility> {
        self.deadline = Some(now + self.hide_after);
        match self.state {
            Visibility::Visible => None,
            Visibility::Hidden => {
                self.state = Visibility::Visible;
                Some(Visibility::Visible)
            }
        }
    }

    /// Advance time. Returns the new state if the deadline elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Visibility> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.state = Visibility::Hidden;
                Some(Visibility::Hidden)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_starts_hidden_without_deadline() {
        let debouncer = VisibilityDebouncer::new(secs(2.0));
        assert_eq!(debouncer.state(), Visibility::Hidden);
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_debounce_timeline() {
        let t0 = Instant::now();
        let mut debouncer = VisibilityDebouncer::new(secs(2.0));

        assert_eq!(debouncer.hot_zone_enter(t0), Some(Visibility::Visible));

        // Second signal refreshes instead of stacking
        assert_eq!(debouncer.poll(t0 + secs(1.5)), None);
        assert_eq!(debouncer.hot_zone_enter(t0 + secs(1.5)), None);
        assert_eq!(debouncer.deadline(), Some(t0 + secs(3.5)));

        // 1.5s after the last signal: still visible (first timer would have fired at 2.0s)
        assert_eq!(debouncer.poll(t0 + secs(3.0)), None);
        assert_eq!(debouncer.state(), Visibility::Visible);

        // 2.5s after the last signal: hidden
        assert_eq!(debouncer.poll(t0 + secs(4.0)), Some(Visibility::Hidden));
        assert_eq!(debouncer.state(), Visibility::Hidden);
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_poll_without_deadline_is_noop() {
        let mut debouncer = VisibilityDebouncer::new(secs(2.0));
        assert_eq!(debouncer.poll(Instant::now() + secs(100.0)), None);
        assert_eq!(debouncer.state(), Visibility::Hidden);
    }

    #[test]
    fn test_reenter_after_hide_shows_again() {
        let t0 = Instant::now();
        let mut debouncer = VisibilityDebouncer::new(secs(2.0));
        debouncer.hot_zone_enter(t0);
        debouncer.poll(t0 + secs(2.0));

        assert_eq!(debouncer.hot_zone_enter(t0 + secs(5.0)), Some(Visibility::Visible));
    }
}
