//! Configuration for the minitel command-line tool.
//!
//! The configuration file is located at `~/.minitel/config.toml`:
//!
//! ```toml
//! # Serial device the Minitel is plugged on
//! device = "/dev/ttyUSB0"
//!
//! # trace, debug, info, warn, error
//! log_level = "info"
//!
//! [link]
//! detect_speed = true
//! target_speed = 4800
//!
//! [keyboard]
//! extended = false
//! cursor_keys = false
//! lowercase = true
//!
//! [display]
//! echo = false
//! ```
//!
//! Missing keys take their default value. A missing or unreadable file gives
//! the default configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::protocol::KeyboardMode;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device path
    pub device: String,
    /// Log level for ~/.minitel/minitel.log
    pub log_level: String,
    pub link: LinkConfig,
    pub keyboard: KeyboardConfig,
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: default_device().to_string(),
            log_level: "info".to_string(),
            link: LinkConfig::default(),
            keyboard: KeyboardConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Link negotiation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Probe the terminal speed on startup
    pub detect_speed: bool,
    /// Speed to switch to after detection (300, 1200, 4800 or 9600)
    pub target_speed: Option<u32>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            detect_speed: true,
            target_speed: None,
        }
    }
}

/// Keyboard settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    pub extended: bool,
    pub cursor_keys: bool,
    pub lowercase: bool,
}

/// Display settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Local echo of typed keys; `None` leaves the terminal as it is
    pub echo: Option<bool>,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    return Self::parse(&content);
                }
            }
        }
        Self::default()
    }

    /// Parse configuration text, falling back to defaults when malformed
    pub fn parse(content: &str) -> Self {
        match toml::from_str(content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring malformed config: {}", e);
                Self::default()
            }
        }
    }

    /// TOML text of this configuration, as written by [`save`](Self::save)
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Write to ~/.minitel/config.toml, returning the path written
    pub fn save(&self) -> io::Result<PathBuf> {
        let path = Self::get_config_path().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no home directory for ~/.minitel")
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write to `path`, replacing any previous file
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        let content = self
            .to_toml()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        let dir = data_dir()?;
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir.join("config.toml"))
    }

    /// Keyboard toggles as negotiation flags
    pub fn keyboard_mode(&self) -> KeyboardMode {
        let mut mode = KeyboardMode::empty();
        mode.set(KeyboardMode::EXTENDED, self.keyboard.extended);
        mode.set(KeyboardMode::CURSOR_KEYS, self.keyboard.cursor_keys);
        mode.set(KeyboardMode::LOWERCASE, self.keyboard.lowercase);
        mode
    }
}

/// `~/.minitel`, where the config and log files live
pub fn data_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".minitel"))
}

fn default_device() -> &'static str {
    if cfg!(windows) {
        "COM1"
    } else {
        "/dev/ttyUSB0"
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::parse("");
        assert_eq!(config, Config::default());
        assert!(config.link.detect_speed);
        assert_eq!(config.display.echo, None);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            device = "/dev/ttyAMA0"

            [link]
            target_speed = 4800

            [keyboard]
            lowercase = true
            "#,
        );

        assert_eq!(config.device, "/dev/ttyAMA0");
        assert_eq!(config.log_level, "info");
        assert!(config.link.detect_speed);
        assert_eq!(config.link.target_speed, Some(4800));
        assert!(config.keyboard.lowercase);
        assert!(!config.keyboard.extended);
    }

    #[test]
    fn test_malformed_falls_back() {
        let config = Config::parse("device = [");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_keyboard_mode() {
        let mut config = Config::default();
        assert!(config.keyboard_mode().is_empty());

        config.keyboard.extended = true;
        config.keyboard.lowercase = true;
        assert_eq!(
            config.keyboard_mode(),
            KeyboardMode::EXTENDED | KeyboardMode::LOWERCASE
        );
    }

    #[test]
    fn test_saved_file_loads_back() {
        let mut config = Config::default();
        config.device = "/dev/ttyS1".to_string();
        config.link.target_speed = Some(9600);
        config.keyboard.cursor_keys = true;
        config.display.echo = Some(false);

        let path = std::env::temp_dir()
            .join(format!("minitel-config-{}.toml", std::process::id()));
        config.save_to(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert!(text.contains("[keyboard]"));
        assert_eq!(Config::parse(&text), config);
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let path = std::env::temp_dir()
            .join("minitel-no-such-dir")
            .join("config.toml");
        assert!(Config::default().save_to(&path).is_err());
    }
}
