//! Configuration file support for xia.
//!
//! Settings are stored as JSON in the platform config directory. Every field
//! has a default, so partial or older files load cleanly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EDIT_HIT_RADIUS, DEFAULT_MARKER_HALF_SIZE, DEFAULT_MAX_DRAG_DISTANCE,
    DEFAULT_PLAYBACK_HIT_RADIUS,
};
use crate::model::DragLimits;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XiaConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,

    /// Region editing thresholds
    #[serde(default)]
    pub editing: EditingConfig,

    /// Slideshow settings
    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory holding the photo/annotation pairs
    #[serde(default)]
    pub documents_dir: Option<PathBuf>,
}

/// Thresholds used while editing regions (view units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditingConfig {
    /// Distance within which a touch grabs a point
    #[serde(default = "default_edit_hit_radius")]
    pub hit_radius: f32,

    /// A single drag update moving a point this far or more is ignored
    #[serde(default = "default_max_drag_distance")]
    pub max_drag_distance: f32,

    /// Half the size of a point marker
    #[serde(default = "default_marker_half_size")]
    pub marker_half_size: f32,
}

fn default_edit_hit_radius() -> f32 {
    DEFAULT_EDIT_HIT_RADIUS
}

fn default_max_drag_distance() -> f32 {
    DEFAULT_MAX_DRAG_DISTANCE
}

fn default_marker_half_size() -> f32 {
    DEFAULT_MARKER_HALF_SIZE
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            hit_radius: default_edit_hit_radius(),
            max_drag_distance: default_max_drag_distance(),
            marker_half_size: default_marker_half_size(),
        }
    }
}

impl EditingConfig {
    /// Drag limits for region point moves.
    pub fn drag_limits(&self) -> DragLimits {
        DragLimits {
            max_drag_distance: self.max_drag_distance,
        }
    }
}

/// Playback section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Distance within which a touch selects a region during playback
    #[serde(default = "default_playback_hit_radius")]
    pub hit_radius: f32,
}

fn default_playback_hit_radius() -> f32 {
    DEFAULT_PLAYBACK_HIT_RADIUS
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            hit_radius: default_playback_hit_radius(),
        }
    }
}

impl XiaConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: Preferences::default(),
            editing: EditingConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default config filename.
    pub fn default_filename() -> &'static str {
        "xia-config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("xia").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("xia")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save configuration to a file, creating parent directories if needed.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;

        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }
}

impl Default for XiaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error("Config version {file_version} is newer than supported version {supported_version}")]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
