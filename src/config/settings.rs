//! User-editable shell settings
//!
//! Read once at startup from `settings.json`. Every field has a default so a
//! partial (or absent) file is valid; environment variables are applied last.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::constants::{self, overlay, remote, window};

/// Top-level settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_remote_url")]
    pub remote_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_documentation_url")]
    pub documentation_url: String,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub overlay: OverlaySettings,
}

/// Main session window size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    #[serde(default = "default_window_width")]
    pub width: u32,
    #[serde(default = "default_window_height")]
    pub height: u32,
}

/// Fullscreen overlay geometry and hot-zone timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySettings {
    #[serde(default = "default_overlay_width")]
    pub width: u32,
    #[serde(default = "default_overlay_height")]
    pub height: u32,
    #[serde(default = "default_hot_zone_px")]
    pub hot_zone_px: f64,
    #[serde(default = "default_hide_delay_ms")]
    pub hide_delay_ms: u64,
}

fn default_remote_url() -> String {
    remote::DEFAULT_URL.to_string()
}

fn default_user_agent() -> String {
    remote::DEFAULT_USER_AGENT.to_string()
}

fn default_documentation_url() -> String {
    remote::DOCUMENTATION_URL.to_string()
}

fn default_window_width() -> u32 {
    window::WIDTH
}

fn default_window_height() -> u32 {
    window::HEIGHT
}

fn default_overlay_width() -> u32 {
    overlay::WIDTH
}

fn default_overlay_height() -> u32 {
    overlay::HEIGHT
}

fn default_hot_zone_px() -> f64 {
    overlay::HOT_ZONE_PX
}

fn default_hide_delay_ms() -> u64 {
    overlay::HIDE_DELAY_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_url: default_remote_url(),
            user_agent: default_user_agent(),
            documentation_url: default_documentation_url(),
            window: WindowSettings::default(),
            overlay: OverlaySettings::default(),
        }
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            width: default_overlay_width(),
            height: default_overlay_height(),
            hot_zone_px: default_hot_zone_px(),
            hide_delay_ms: default_hide_delay_ms(),
        }
    }
}

impl OverlaySettings {
    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_delay_ms)
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        super::app_dir().join(constants::config::SETTINGS_FILENAME)
    }

    /// Load settings from `path`, falling back to defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {:?}", path))?;
            let settings: Settings = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings JSON from {:?}", path))?;
            info!(path = %path.display(), "Loaded settings");
            settings
        } else {
            info!(path = %path.display(), "No settings file, using defaults");
            Settings::default()
        };

        settings.apply_env_overrides();
        settings.validate_and_clamp();
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(constants::config::ENV_URL) {
            info!(url = %url, "Remote URL overridden from environment");
            self.remote_url = url;
        }
        if let Ok(user_agent) = env::var(constants::config::ENV_USER_AGENT) {
            self.user_agent = user_agent;
        }
    }

    fn validate_and_clamp(&mut self) {
        if self.overlay.hot_zone_px <= 0.0 || !self.overlay.hot_zone_px.is_finite() {
            warn!(hot_zone_px = self.overlay.hot_zone_px, "Invalid hot-zone size, using default");
            self.overlay.hot_zone_px = default_hot_zone_px();
        }
        if self.overlay.hide_delay_ms == 0 {
            warn!("Overlay hide delay of 0ms would never show the control, using default");
            self.overlay.hide_delay_ms = default_hide_delay_ms();
        }
        if self.overlay.width == 0 || self.overlay.height == 0 {
            warn!(width = self.overlay.width, height = self.overlay.height, "Invalid overlay size, using default");
            self.overlay.width = default_overlay_width();
            self.overlay.height = default_overlay_height();
        }
    }
}
