//! Configuration file loading
//!
//! Loads user configuration from `~/.config/framecast/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{CaptureConfig, DEFAULT_EVENT_NAME, DEFAULT_JPEG_QUALITY, DEFAULT_SAMPLE_INTERVAL_MS};
use crate::error::{FramecastError, Result};
use crate::types::SourceKind;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Capture and sampling settings
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Outbound transport settings
    #[serde(default)]
    pub transport: TransportSettings,

    /// Peer-side receiver settings
    #[serde(default)]
    pub receiver: ReceiverSettings,
}

/// Capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Default source (camera, screen)
    #[serde(default = "default_source")]
    pub source: String,

    /// Sampling period in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// JPEG quality (0-1)
    #[serde(default = "default_quality")]
    pub quality: f32,
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Peer address (host:port)
    #[serde(default = "default_peer")]
    pub peer: String,

    /// Event name frames are emitted under
    #[serde(default = "default_event_name")]
    pub event: String,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Receiver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverSettings {
    /// Listen address (host:port)
    #[serde(default = "default_peer")]
    pub listen: String,

    /// Directory the latest frame is written to (unset = don't write)
    #[serde(default)]
    pub save_dir: Option<PathBuf>,
}

fn default_source() -> String {
    "camera".to_string()
}

fn default_interval_ms() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_MS
}

fn default_quality() -> f32 {
    DEFAULT_JPEG_QUALITY
}

fn default_peer() -> String {
    "127.0.0.1:7878".to_string()
}

fn default_event_name() -> String {
    DEFAULT_EVENT_NAME.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            source: default_source(),
            interval_ms: default_interval_ms(),
            quality: default_quality(),
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            peer: default_peer(),
            event: default_event_name(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            listen: default_peer(),
            save_dir: None,
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("framecast").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("framecast")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/framecast/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| FramecastError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| FramecastError::Config(format!("Failed to parse config file: {}", e)))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    FramecastError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| FramecastError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| FramecastError::Config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Create a default config file if it doesn't exist
    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_path();
        if path.exists() {
            return Ok(false);
        }

        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Build the runtime capture configuration from the file settings
    pub fn capture_config(&self) -> Result<CaptureConfig> {
        let source_kind: SourceKind = self
            .capture
            .source
            .parse()
            .map_err(FramecastError::Config)?;

        let config = CaptureConfig {
            source_kind,
            sample_interval_ms: self.capture.interval_ms,
            jpeg_quality: self.capture.quality,
            event_name: self.transport.event.clone(),
        };
        config.validate_strict()?;
        Ok(config)
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# framecast configuration

[capture]
# Source selected at startup: camera, screen
source = "camera"

# Milliseconds between snapshots
interval_ms = 1000

# JPEG quality on a 0-1 scale
quality = 0.7

[transport]
# Peer that receives the frames
peer = "127.0.0.1:7878"

# Event name frames are sent under
event = "send_video_frame"

# Connection timeout in milliseconds
connect_timeout_ms = 5000

[receiver]
# Address the receiver listens on
listen = "127.0.0.1:7878"

# Write the most recent frame to <save_dir>/latest.jpg
# save_dir = "/tmp/framecast"
"#
    .to_string()
}
