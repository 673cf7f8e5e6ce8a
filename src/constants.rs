//! Shell-wide constants
//!
//! Origins, window geometry, overlay timing, persisted key names and file
//! locations. Settings defaults are taken from here.

/// Hosted web application
pub mod remote {
    /// Fixed origin loaded into every session window
    pub const DEFAULT_URL: &str = "https://web.whatsapp.com";

    /// Desktop Chrome identification sent instead of the shell's own
    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

    /// Project documentation opened from the tray
    pub const DOCUMENTATION_URL: &str = "https://github.com/machfudn/whatsapp-desktop";
}

/// Main session window defaults
pub mod window {
    pub const TITLE: &str = "WhatsApp Desktop";
    pub const WIDTH: u32 = 1100;
    pub const HEIGHT: u32 = 800;
}

/// Fullscreen overlay (exit control) geometry and timing
pub mod overlay {
    pub const WIDTH: u32 = 200;
    pub const HEIGHT: u32 = 50;

    /// Pointer distance from the top edge (logical pixels) that counts as the hot-zone
    pub const HOT_ZONE_PX: f64 = 20.0;

    /// Inactivity delay before the overlay hides again
    pub const HIDE_DELAY_MS: u64 = 2000;

    /// Label of the single actionable control
    pub const EXIT_LABEL: &str = "Exit Full Screen";
}

/// Session/profile persistence
pub mod session {
    /// Persisted key holding the ordered profile list
    pub const USERS_KEY: &str = "users";

    /// Persisted key holding the active profile's partition
    pub const CURRENT_PARTITION_KEY: &str = "currentUserPartition";

    /// Partition of the synthesized first profile
    pub const DEFAULT_PARTITION: &str = "persist:default";

    /// Prefix for generated partition tokens
    pub const PARTITION_PREFIX: &str = "persist:user_";

    /// Display names are "User <n>"
    pub const USER_NAME_PREFIX: &str = "User";

    /// Random candidates tried before falling back to a counter suffix
    pub const MAX_PARTITION_ATTEMPTS: usize = 16;
}

/// Config file locations
pub mod config {
    pub const APP_DIR: &str = "wa-desktop";
    pub const SETTINGS_FILENAME: &str = "settings.json";
    pub const STATE_FILENAME: &str = "state.json";

    /// Environment override for the remote origin
    pub const ENV_URL: &str = "WA_DESKTOP_URL";

    /// Environment override for the user agent string
    pub const ENV_USER_AGENT: &str = "WA_DESKTOP_USER_AGENT";
}

/// System tray
pub mod tray {
    pub const ID: &str = "wa-desktop";
    pub const TOOLTIP: &str = "WhatsApp Desktop";
}
