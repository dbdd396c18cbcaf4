//! Configuration types for framecast
//!
//! Provides the runtime capture configuration and the on-disk config file.

mod file;

pub use file::{sample_config, CaptureSettings, ConfigFile, ReceiverSettings, TransportSettings};

use crate::error::{FramecastError, Result};
use crate::types::SourceKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default sampling period in milliseconds (one frame per second)
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;

/// Default JPEG quality on a 0-1 scale
pub const DEFAULT_JPEG_QUALITY: f32 = 0.7;

/// Event name frames are emitted under
pub const DEFAULT_EVENT_NAME: &str = "send_video_frame";

/// Runtime configuration for a capture pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Source selected when the pipeline starts
    #[serde(default)]
    pub source_kind: SourceKind,

    /// Period between sampling ticks in milliseconds
    #[serde(default = "default_interval")]
    pub sample_interval_ms: u64,

    /// JPEG quality factor in (0, 1]
    #[serde(default = "default_quality")]
    pub jpeg_quality: f32,

    /// Event name used when emitting frames
    #[serde(default = "default_event_name")]
    pub event_name: String,
}

fn default_interval() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_MS
}

fn default_quality() -> f32 {
    DEFAULT_JPEG_QUALITY
}

fn default_event_name() -> String {
    DEFAULT_EVENT_NAME.to_string()
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source_kind: SourceKind::default(),
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            event_name: default_event_name(),
        }
    }
}

impl CaptureConfig {
    /// Create a config for the given source with default settings
    pub fn new(source_kind: SourceKind) -> Self {
        Self {
            source_kind,
            ..Default::default()
        }
    }

    /// Set the initial source
    pub fn with_source(mut self, source_kind: SourceKind) -> Self {
        self.source_kind = source_kind;
        self
    }

    /// Set the sampling period
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sample_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the JPEG quality (0-1 scale)
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Set the event name frames are emitted under
    pub fn with_event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = name.into();
        self
    }

    /// Sampling period as a Duration
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// JPEG quality mapped onto the encoder's 1-100 scale
    pub fn jpeg_quality_percent(&self) -> u8 {
        (self.jpeg_quality * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Validate configuration and return warnings
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.sample_interval_ms < 100 {
            warnings.push(format!(
                "Sampling every {}ms sends more than 10 frames per second; peers may fall behind",
                self.sample_interval_ms
            ));
        }

        if self.sample_interval_ms > 10_000 {
            warnings.push(format!(
                "Sampling every {}ms leaves the peer with very stale frames",
                self.sample_interval_ms
            ));
        }

        if self.jpeg_quality > 0.95 {
            warnings.push("JPEG quality above 0.95 produces large frames for little gain".to_string());
        }

        if self.jpeg_quality < 0.2 && self.jpeg_quality > 0.0 {
            warnings.push("JPEG quality below 0.2 makes frames hard to read".to_string());
        }

        warnings
    }

    /// Validate configuration and return an error for invalid settings
    pub fn validate_strict(&self) -> Result<()> {
        if self.sample_interval_ms == 0 {
            return Err(FramecastError::config("Sample interval must be greater than zero"));
        }

        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            return Err(FramecastError::config(format!(
                "JPEG quality must be in (0, 1], got {}",
                self.jpeg_quality
            )));
        }

        if self.event_name.trim().is_empty() {
            return Err(FramecastError::config("Event name must not be empty"));
        }

        Ok(())
    }
}
