//! Configuration management for wa-desktop
//!
//! - **settings**: user-editable shell settings (remote origin, window and overlay geometry)
//! - session state (profiles, active partition) lives in [`crate::store`], not here

pub mod settings;

pub use settings::Settings;

use std::path::PathBuf;

use crate::constants;

/// Per-user application directory under the platform config dir
pub fn app_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(constants::config::APP_DIR);
    path
}

/// Default location of the persisted session state
pub fn state_path() -> PathBuf {
    app_dir().join(constants::config::STATE_FILENAME)
}
