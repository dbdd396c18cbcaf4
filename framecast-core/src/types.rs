//! Core types for framecast
//!
//! These types represent the fundamental data structures shared by the
//! capture, sampling and transport stages.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for session generations
static GENERATION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity token for one capture session
///
/// Every deferred completion (acquisition, playback start, sampling tick)
/// carries the generation of the session that spawned it. Completions whose
/// generation no longer matches the live session are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Allocate a new, never-before-used generation
    pub fn next() -> Self {
        Self(GENERATION_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw generation value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

/// Kind of visual source to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// User-facing camera
    #[default]
    #[serde(alias = "webcam")]
    Camera,
    /// User-selected display, window or tab
    Screen,
}

impl SourceKind {
    /// Lowercase name used in messages and config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Screen => "screen",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "camera" | "webcam" | "cam" => Ok(Self::Camera),
            "screen" | "display" | "desktop" => Ok(Self::Screen),
            _ => Err(format!("Unknown source: {}", s)),
        }
    }
}

/// Lifecycle status of the capture pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    /// No session; every resource released
    #[default]
    Idle,
    /// Waiting for the environment to hand over a stream
    Acquiring,
    /// Stream attached, waiting for the surface to become ready
    Binding,
    /// Surface ready, sampling loop running
    Active,
}

impl std::fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Acquiring => write!(f, "acquiring"),
            Self::Binding => write!(f, "binding"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Snapshot of pipeline state published to the UI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Current lifecycle status
    pub status: CaptureStatus,
    /// Currently selected source
    pub source_kind: SourceKind,
    /// Whether capture is requested by the UI
    pub visible: bool,
    /// Whether the last session ended in an error
    pub has_error: bool,
    /// Human-readable error message (empty when `has_error` is false)
    pub message: String,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.status, self.source_kind)?;
        if self.has_error {
            write!(f, " - {}", self.message)?;
        }
        Ok(())
    }
}

/// A decoded video frame as presented by a media stream
///
/// Pixels are tightly packed RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA pixel data, `width * height * 4` bytes
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Create a frame filled with a single RGBA color
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self {
            width,
            height,
            data: color.repeat(width as usize * height as usize),
        }
    }

    /// Bytes of RGBA data a `width` x `height` frame holds
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    /// Whether the pixel data covers exactly the stated dimensions
    pub fn is_complete(&self) -> bool {
        !self.data.is_empty() && self.data.len() == Self::byte_len(self.width, self.height)
    }

    /// Size of the frame as (width, height)
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
