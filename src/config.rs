/// Viewer configuration
///
/// Stored as JSON next to the user's other config files:
/// - Linux: ~/.config/tribute-viewer/config.json
/// - macOS: ~/Library/Application Support/tribute-viewer/config.json
/// - Windows: %APPDATA%\tribute-viewer\config.json
///
/// Every field has a default, so a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// User-tunable settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Seconds between fullscreen carousel advances
    pub carousel_interval_secs: u64,

    /// Shown in fullscreen when an image has no dedication yet
    pub default_dedication: String,

    /// Shown in fullscreen when an image has no life span yet
    pub default_lifespan: String,

    /// Header title shown when no motto has been saved
    pub default_motto: String,

    /// Fullscreen footer note shown when none has been saved
    pub default_fullscreen_note: String,

    /// Fixed note in the corner of the main slot
    pub slot_note: String,

    /// Convert newly added photos to black and white
    pub grayscale_on_import: bool,

    /// Base URL that share and shot links are built on
    pub share_base_url: String,

    /// Override for the database location
    pub database_path: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            carousel_interval_secs: 180,
            default_dedication: "Forever remembered".to_string(),
            default_lifespan: "1949-2049".to_string(),
            default_motto: "You think, so I remain".to_string(),
            default_fullscreen_note: "It offers no comfort and makes no meaning. It only admits one thing: a life was here."
                .to_string(),
            slot_note: "I was here.".to_string(),
            grayscale_on_import: false,
            share_base_url: "https://tribute.local/".to_string(),
            database_path: None,
        }
    }
}

impl ViewerConfig {
    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Carousel interval as a `Duration` (never zero)
    pub fn carousel_interval(&self) -> Duration {
        Duration::from_secs(self.carousel_interval_secs.max(1))
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("tribute-viewer");
        path.push("config.json");
        Some(path)
    }

    /// Load the config from the default location.
    ///
    /// A missing file gives the defaults; a malformed one is logged
    /// and also gives the defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::warn!("⚠️  Could not determine config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Load the config from an explicit path (same fallback rules as `load`)
    pub fn load_from(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                log::warn!("⚠️  Could not read {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_json(&json) {
            Ok(config) => {
                log::info!("⚙️  Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("⚠️  Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = ViewerConfig::from_json(r#"{ "carousel_interval_secs": 5 }"#).unwrap();
        assert_eq!(config.carousel_interval_secs, 5);
        assert_eq!(config.default_lifespan, "1949-2049");
        assert!(!config.grayscale_on_import);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = ViewerConfig {
            carousel_interval_secs: 0,
            ..ViewerConfig::default()
        };
        assert_eq!(config.carousel_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("tribute-viewer-no-such-config.json");
        assert_eq!(ViewerConfig::load_from(&path), ViewerConfig::default());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!(
            "tribute-viewer-bad-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(ViewerConfig::load_from(&path), ViewerConfig::default());
        let _ = std::fs::remove_file(&path);
    }
}
