//! Configuration file handling for snapgrab.
//!
//! Loads configuration from `~/.config/snapgrab/config.toml` or a custom
//! path. The core reads this at capture or registration time and never
//! writes it back.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::capture::CaptureMode;

/// Configuration file structure for snapgrab.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub shortcuts: ShortcutConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Textual shortcut spec per capture mode.
#[derive(Debug, Deserialize)]
pub struct ShortcutConfig {
    #[serde(default = "default_full_screen")]
    pub full_screen: String,
    #[serde(default = "default_area")]
    pub area: String,
    #[serde(default = "default_window")]
    pub window: String,
    #[serde(default = "default_custom_region")]
    pub custom_region: String,
}

impl ShortcutConfig {
    /// Spec string for one mode, matched exhaustively.
    pub fn for_mode(&self, mode: CaptureMode) -> &str {
        match mode {
            CaptureMode::FullScreen => &self.full_screen,
            CaptureMode::Area => &self.area,
            CaptureMode::Window => &self.window,
            CaptureMode::CustomRegion => &self.custom_region,
        }
    }
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            full_screen: default_full_screen(),
            area: default_area(),
            window: default_window(),
            custom_region: default_custom_region(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CaptureConfig {
    /// Keep decorative window shadows in window captures.
    #[serde(default)]
    pub include_window_shadow: bool,
    /// Pre-capture displays at shortcut time so hover effects survive the
    /// selection overlay.
    #[serde(default = "default_true")]
    pub preserve_hover_state: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            include_window_shadow: false,
            preserve_hover_state: default_true(),
        }
    }
}

fn default_full_screen() -> String {
    "cmd+shift+1".to_string()
}

fn default_area() -> String {
    "cmd+shift+2".to_string()
}

fn default_window() -> String {
    "cmd+shift+3".to_string()
}

fn default_custom_region() -> String {
    "cmd+shift+4".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("snapgrab/config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/snapgrab/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.shortcuts.full_screen, "cmd+shift+1");
        assert_eq!(config.shortcuts.area, "cmd+shift+2");
        assert_eq!(config.shortcuts.window, "cmd+shift+3");
        assert_eq!(config.shortcuts.custom_region, "cmd+shift+4");
        assert!(!config.capture.include_window_shadow);
        assert!(config.capture.preserve_hover_state);
    }

    #[test]
    fn test_for_mode_covers_all_modes() {
        let shortcuts = ShortcutConfig::default();
        assert_eq!(shortcuts.for_mode(CaptureMode::FullScreen), "cmd+shift+1");
        assert_eq!(shortcuts.for_mode(CaptureMode::Area), "cmd+shift+2");
        assert_eq!(shortcuts.for_mode(CaptureMode::Window), "cmd+shift+3");
        assert_eq!(shortcuts.for_mode(CaptureMode::CustomRegion), "cmd+shift+4");
    }

    #[test]
    fn test_parse_partial_file() {
        let parsed: Config = toml::from_str(
            r#"
            [shortcuts]
            area = "ctrl+alt+a"

            [capture]
            include_window_shadow = true
            "#,
        )
        .unwrap();
        assert_eq!(parsed.shortcuts.area, "ctrl+alt+a");
        // Unspecified fields keep their defaults.
        assert_eq!(parsed.shortcuts.full_screen, "cmd+shift+1");
        assert!(parsed.capture.include_window_shadow);
        assert!(parsed.capture.preserve_hover_state);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.shortcuts.window, "cmd+shift+3");
    }

    #[test]
    fn test_load_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
