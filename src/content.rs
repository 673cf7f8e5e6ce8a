//! Pointer hot-zone detection inside the session content context
//!
//! The detector only listens while the window manager has told it the window is
//! fullscreen. It reports every pointer position near the top edge; debouncing
//! happens on the coordinator side.

use tracing::trace;

use crate::ipc::{ContentEvent, ContentMessage};

#[derive(Debug, Clone)]
pub struct HotZoneDetector {
    threshold: f64,
    listening: bool,
}

impl HotZoneDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            listening: false,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Apply a message from the window manager
    pub fn handle_message(&mut self, msg: ContentMessage) {
        match msg {
            ContentMessage::FullscreenStateChanged(fullscreen) => {
                trace!(fullscreen, "Hot-zone listener toggled");
                self.listening = fullscreen;
            }
        }
    }

    /// Pointer moved to `y` logical pixels below the window's top edge
    pub fn pointer_moved(&self, y: f64) -> Option<ContentEvent> {
        if self.listening && y < self.threshold {
            Some(ContentEvent::HotZoneEnter)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_until_fullscreen() {
        let detector = HotZoneDetector::new(20.0);
        assert_eq!(detector.pointer_moved(0.0), None);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut detector = HotZoneDetector::new(20.0);
        detector.handle_message(ContentMessage::FullscreenStateChanged(true));

        assert_eq!(detector.pointer_moved(19.5), Some(ContentEvent::HotZoneEnter));
        assert_eq!(detector.pointer_moved(20.0), None);
        assert_eq!(detector.pointer_moved(400.0), None);
    }

    #[test]
    fn test_stops_after_leaving_fullscreen() {
        let mut detector = HotZoneDetector::new(20.0);
        detector.handle_message(ContentMessage::FullscreenStateChanged(true));
        detector.handle_message(ContentMessage::FullscreenStateChanged(false));

        assert!(!detector.is_listening());
        assert_eq!(detector.pointer_moved(1.0), None);
    }
}
